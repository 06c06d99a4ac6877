use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure loaded from compare_brief.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub behavior: BehaviorConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Bounded wait for a single provider call
    pub request_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            request_timeout_ms: 45_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: std::net::SocketAddr,
    /// Origin used when building share links
    pub public_origin: String,
    pub cors_open: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787"
                .parse()
                .expect("default bind address should parse"),
            public_origin: "http://127.0.0.1:8787".to_string(),
            cors_open: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// History file; `None` keeps history in memory only
    pub path: Option<PathBuf>,
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir().map(|d| d.join("compare-brief").join("history.json")),
            history_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Serve a demo brief instead of an error when live generation fails
    pub demo_on_failure: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            demo_on_failure: true,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Clone, Default)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    pub log_level: String,
    pub log_no_ansi: bool,
}

// Keep the key out of logs.
impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("log_level", &self.log_level)
            .field("log_no_ansi", &self.log_no_ansi)
            .finish()
    }
}

pub const DEFAULT_LOG_LEVEL: &str = "compare_brief=info,tower_http=info";

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            log_no_ansi: std::env::var("BRIEF_LOG_NO_ANSI")
                .ok()
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    if v == "1" || v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v == "0" || v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        tracing::warn!("{} has unrecognized value '{}', ignoring", name, v);
        None
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses COMPARE_BRIEF_CONFIG environment variable or defaults to "compare_brief.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("BRIEF_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let config_path = std::env::var("COMPARE_BRIEF_CONFIG")
            .unwrap_or_else(|_| "compare_brief.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate();

        Ok(config)
    }

    /// Apply env-first overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("BRIEF_PROVIDER_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Ok(model) = std::env::var("BRIEF_MODEL") {
            self.provider.model = model;
        }
        if let Some(t) = env_parse::<f32>("BRIEF_TEMPERATURE") {
            self.provider.temperature = t;
        }
        if let Some(ms) = env_parse::<u64>("BRIEF_TIMEOUT_MS") {
            self.provider.request_timeout_ms = ms;
        }
        if let Ok(v) = std::env::var("BRIEF_HTTP_BIND") {
            match v.parse::<std::net::SocketAddr>() {
                Ok(bind) => self.server.bind = bind,
                Err(_) => tracing::warn!("BRIEF_HTTP_BIND '{}' is not a socket address", v),
            }
        }
        if let Ok(origin) = std::env::var("BRIEF_PUBLIC_ORIGIN") {
            self.server.public_origin = origin;
        }
        if let Some(open) = env_flag("BRIEF_CORS_OPEN") {
            self.server.cors_open = open;
        }
        if let Ok(path) = std::env::var("BRIEF_STORE_PATH") {
            self.store.path = if path.trim().is_empty() || path == "memory" {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(demo) = env_flag("BRIEF_DEMO_ON_FAILURE") {
            self.behavior.demo_on_failure = demo;
        }
    }

    /// Clamp numeric settings into range and warn about suspicious values
    pub fn validate(&mut self) {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            tracing::warn!(
                "temperature {} out of range, clamping to [0, 2]",
                self.provider.temperature
            );
            self.provider.temperature = self.provider.temperature.clamp(0.0, 2.0);
        }
        let ms = self.provider.request_timeout_ms.clamp(1_000, 300_000);
        if ms != self.provider.request_timeout_ms {
            tracing::warn!(
                "request_timeout_ms {} out of range, clamping to {}",
                self.provider.request_timeout_ms,
                ms
            );
            self.provider.request_timeout_ms = ms;
        }
        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            tracing::warn!(
                "Provider base URL '{}' doesn't start with http:// or https://",
                self.provider.base_url
            );
        }
        if self.store.history_limit == 0 {
            self.store.history_limit = 1;
        }
    }

    pub fn has_credential(&self) -> bool {
        self.runtime.api_key.is_some()
    }
}
