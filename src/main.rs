use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use compare_brief::{
    brief::BriefRequest,
    codec::{self, ShareLink},
    config::Config,
    http,
    service::BriefService,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "compare-brief")]
#[command(about = "Comparison brief generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Generate one brief and print it as JSON
    Generate {
        query: String,
        #[arg(long, default_value = "")]
        constraints: String,
        /// Comma-separated explicit criteria
        #[arg(long, value_delimiter = ',')]
        criteria: Vec<String>,
        /// Skip the provider and print demo content
        #[arg(long)]
        demo: bool,
        /// Fail instead of falling back to demo content
        #[arg(long)]
        strict: bool,
    },
    /// Decode a portable share link or payload
    Decode { link: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(config.runtime.log_level.as_str())
        .with_ansi(!config.runtime.log_no_ansi)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve => {
            info!("Starting compare-brief");
            http::start_http_server(Arc::new(config)).await
        }
        Commands::Generate {
            query,
            constraints,
            criteria,
            demo,
            strict,
        } => {
            let mut request = BriefRequest::new(query).with_constraints(constraints);
            if !criteria.is_empty() {
                request = request.with_criteria(criteria);
            }
            let brief = if demo {
                compare_brief::service::demo_for(&request)
            } else {
                let service = BriefService::from_config(&config)?;
                service.generate_or_demo(request, strict).await?
            };
            println!("{}", serde_json::to_string_pretty(&brief)?);
            println!(
                "\n{}",
                codec::portable_url(&config.server.public_origin, &brief)?
            );
            Ok(())
        }
        Commands::Decode { link } => match codec::parse_share_link(&link) {
            Some(ShareLink::Portable(data)) => {
                let brief = codec::decode(&data)?;
                println!("{}", serde_json::to_string_pretty(&brief)?);
                Ok(())
            }
            Some(ShareLink::Local(id)) => {
                let store = http::open_store(&config);
                match store.get(&id) {
                    Some(brief) => {
                        println!("{}", serde_json::to_string_pretty(&brief)?);
                        Ok(())
                    }
                    None => anyhow::bail!(
                        "brief {} is not available on this device, use a portable link instead",
                        id
                    ),
                }
            }
            None => anyhow::bail!("not a share link or payload: {}", link),
        },
    }
}
