//! Brief Request Service
//!
//! [`BriefService::generate`] performs one provider call and reports every
//! failure as a typed [`BriefError`]. [`BriefService::generate_or_demo`] is the
//! outer policy that decides when a demo brief stands in for an error.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::brief::{
    Brief, BriefMode, BriefRequest, CandidateFallbacks, DEFAULT_COLUMNS, DEFAULT_QUERY,
    NO_CONSTRAINTS, RawCandidate, criteria_help, make_demo_brief, validate_candidate,
};
use crate::clients::{ChatProvider, ChatRequest, OpenAiChatClient};
use crate::config::Config;
use crate::error::{BriefError, Result};
use crate::prompts;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub timeout: Duration,
    pub demo_on_failure: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(45_000),
            demo_on_failure: true,
        }
    }
}

#[derive(Clone)]
pub struct BriefService {
    provider: Option<Arc<dyn ChatProvider>>,
    settings: ServiceSettings,
}

impl BriefService {
    pub fn new(provider: Option<Arc<dyn ChatProvider>>, settings: ServiceSettings) -> Self {
        Self { provider, settings }
    }

    /// Build from configuration. No API key means no provider, not an error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider: Option<Arc<dyn ChatProvider>> = match &config.runtime.api_key {
            Some(key) => {
                let client = OpenAiChatClient::new(&config.provider, key.clone())?;
                info!("Live generation enabled (model={})", client.model());
                Some(Arc::new(client) as Arc<dyn ChatProvider>)
            }
            None => {
                warn!("OPENAI_API_KEY not set; briefs will be demo content");
                None
            }
        };
        Ok(Self::new(
            provider,
            ServiceSettings {
                timeout: Duration::from_millis(config.provider.request_timeout_ms),
                demo_on_failure: config.behavior.demo_on_failure,
            },
        ))
    }

    pub fn is_live(&self) -> bool {
        self.provider.is_some()
    }

    /// One live generation. No retries, no demo fallback.
    pub async fn generate(&self, request: &BriefRequest) -> Result<Brief> {
        let Some(provider) = &self.provider else {
            return Err(BriefError::Config {
                message: "no AI provider credential is configured".to_string(),
            });
        };
        let query = request.query.trim();
        if query.is_empty() {
            return Err(BriefError::InvalidInput {
                message: "query is empty".to_string(),
            });
        }

        let criteria = request.explicit_criteria();
        let chat = ChatRequest {
            system: prompts::system_prompt(),
            user: prompts::user_prompt(
                query,
                &request.constraints,
                criteria.as_deref(),
                request.columns.as_deref(),
                &prompts::request_nonce(),
            ),
        };

        let timeout_ms = self.settings.timeout.as_millis() as u64;
        let raw = tokio::time::timeout(self.settings.timeout, provider.complete(&chat))
            .await
            .map_err(|_| BriefError::Timeout {
                operation: format!("{} completion", provider.name()),
                timeout_ms,
            })??;

        let candidate = RawCandidate::parse(&raw).map_err(|e| BriefError::InvalidAiResponse {
            message: e.to_string(),
            raw: raw.clone(),
        })?;
        if !candidate.has_usable_structure() {
            return Err(BriefError::InvalidAiResponse {
                message: "expected an object with a rows array".to_string(),
                raw,
            });
        }
        debug!("Provider returned {} chars of JSON", raw.len());

        Ok(validate_candidate(
            &candidate,
            &CandidateFallbacks {
                query,
                constraints: request.constraints.trim(),
                criteria: criteria.as_deref(),
            },
        ))
    }

    /// Live generation with the demo fallback policy applied.
    ///
    /// A blank query never reaches the provider: it is an error when `strict`
    /// is set or demos are disabled, otherwise a demo for the example query.
    /// Cancellation always propagates.
    pub async fn generate_or_demo(&self, mut request: BriefRequest, strict: bool) -> Result<Brief> {
        if request.query.trim().is_empty() {
            if strict || !self.settings.demo_on_failure {
                return Err(BriefError::InvalidInput {
                    message: "query is empty".to_string(),
                });
            }
            debug!("Blank query, serving demo for the example question");
            request.query = DEFAULT_QUERY.to_string();
            return Ok(demo_for(&request).with_mode(BriefMode::DemoForced));
        }

        match self.generate(&request).await {
            Ok(brief) => Ok(brief),
            Err(BriefError::Cancelled) => Err(BriefError::Cancelled),
            Err(err) if self.settings.demo_on_failure => {
                let mode = if self.is_live() {
                    warn!("Live generation failed, serving demo brief: {}", err);
                    BriefMode::DemoFallback
                } else {
                    BriefMode::DemoForced
                };
                Ok(demo_for(&request).with_mode(mode))
            }
            Err(err) => Err(err),
        }
    }
}

/// Demo brief for a request. Explicit criteria get help text for their own labels.
pub fn demo_for(request: &BriefRequest) -> Brief {
    let mut brief = make_demo_brief(&request.query, &request.constraints, &request.demo_columns());
    if let Some(criteria) = request.explicit_criteria() {
        brief.column_help = criteria_help(&criteria);
    }
    brief
}

/// Served when a request could not even be read.
pub fn catch_all_brief() -> Brief {
    let columns: Vec<String> = DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect();
    make_demo_brief(DEFAULT_QUERY, NO_CONSTRAINTS, &columns).with_mode(BriefMode::DemoCatchAll)
}

/// Last-request-wins slot for one brief view.
///
/// Starting a request cancels the one before it; a result that completes
/// after being superseded is discarded as [`BriefError::Cancelled`].
#[derive(Debug, Default)]
pub struct LatestRequest {
    current: Mutex<(u64, CancellationToken)>,
}

#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    token: CancellationToken,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestTicket {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        current.1.cancel();
        current.0 += 1;
        current.1 = CancellationToken::new();
        RequestTicket {
            generation: current.0,
            token: current.1.clone(),
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        let current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        current.0 == ticket.generation && !ticket.token.is_cancelled()
    }

    /// Run `fut` as the newest request for this slot.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let ticket = self.begin();
        let outcome = tokio::select! {
            _ = ticket.token.cancelled() => Err(BriefError::Cancelled),
            out = fut => out,
        };
        if self.is_current(&ticket) {
            outcome
        } else {
            debug!("Discarding stale result (generation {})", ticket.generation);
            Err(BriefError::Cancelled)
        }
    }
}
