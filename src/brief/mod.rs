//! Brief records and the untrusted candidate boundary
//!
//! A [`Brief`] is only ever produced by [`validate::validate_candidate`], by the
//! demo generator, or by decoding a portable link. Everything that arrives from
//! the provider or from a request body starts life as a [`RawCandidate`].

pub mod columns;
pub mod demo;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use columns::{COLUMN_COUNT, UNKNOWN, pad_with_unknown, sanitize_columns};
pub use demo::{DemoCategory, classify_query, make_demo_brief};
pub use validate::{CandidateFallbacks, criteria_help, validate_candidate};

/// Query substituted whenever a request or candidate has no usable question.
pub const DEFAULT_QUERY: &str = "example: best noise cancelling headphones for calls";

/// Constraints sentinel used when the caller gave none.
pub const NO_CONSTRAINTS: &str = "None";

/// Columns used when a request carries neither columns nor criteria.
pub const DEFAULT_COLUMNS: [&str; COLUMN_COUNT] =
    ["Price", "Key feature", "Best for", "Downside", "Notes"];

/// The canonical comparison result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    pub query: String,
    pub constraints: String,
    pub top_pick: TopPick,
    pub columns: Vec<String>,
    pub column_help: Vec<String>,
    pub rows: Vec<Row>,
    pub sources: Vec<Source>,
    #[serde(rename = "_mode", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPick {
    pub name: String,
    pub why: String,
    pub tradeoff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub name: String,
    pub values: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

impl Brief {
    /// True when the brief was synthesized locally rather than by the provider.
    pub fn is_degraded(&self) -> bool {
        self.mode.is_some()
    }

    pub fn with_mode(mut self, mode: BriefMode) -> Self {
        self.mode = Some(mode.as_str().to_string());
        self
    }

    /// First structural guarantee this brief breaks, if any.
    pub fn shape_violation(&self) -> Option<String> {
        if self.query.trim().is_empty() {
            return Some("query is empty".to_string());
        }
        if self.columns.len() != COLUMN_COUNT {
            return Some(format!("{} columns, expected {COLUMN_COUNT}", self.columns.len()));
        }
        if self.column_help.len() != COLUMN_COUNT {
            return Some(format!(
                "{} columnHelp entries, expected {COLUMN_COUNT}",
                self.column_help.len()
            ));
        }
        if let Some((i, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.values.len() != COLUMN_COUNT)
        {
            return Some(format!("row {i} has {} values", row.values.len()));
        }
        if self.sources.len() > validate::MAX_SOURCES {
            return Some(format!("{} sources", self.sources.len()));
        }
        None
    }
}

/// Diagnostic tags carried in `_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BriefMode {
    /// Live generation was never attempted (no credential configured).
    DemoForced,
    /// Live generation was attempted and failed.
    DemoFallback,
    /// The request itself could not be processed.
    DemoCatchAll,
}

impl BriefMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BriefMode::DemoForced => "demo_forced",
            BriefMode::DemoFallback => "demo_fallback",
            BriefMode::DemoCatchAll => "demo_catch_all",
        }
    }
}

/// Untrusted JSON from the provider or a client. Only the validator reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCandidate(Value);

impl RawCandidate {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse provider text. Fenced blocks (```json ... ```) are unwrapped first.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(strip_code_fence(text)).map(Self)
    }

    pub(crate) fn field(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|obj| obj.get(key))
    }

    /// A JSON object carrying a `rows` array. Anything else is not a brief.
    pub fn has_usable_structure(&self) -> bool {
        self.field("rows").is_some_and(Value::is_array)
    }
}

impl From<Value> for RawCandidate {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn strip_code_fence(text: &str) -> &str {
    static FENCE: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$")
            .expect("fence pattern is valid")
    });
    match FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Text form of a JSON scalar. Structures and `null` have no text form.
pub(crate) fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A generation request as received from the UI or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub constraints: String,
    /// Suggested column labels. Used verbatim by the demo generator.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Explicit criteria. When present they override provider columns.
    #[serde(default)]
    pub criteria: Option<Vec<String>>,
}

impl BriefRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = constraints.into();
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_criteria(mut self, criteria: Vec<String>) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Build a request from any JSON body. Wrongly-typed fields degrade to
    /// defaults instead of rejecting the request.
    pub fn from_json(body: &Value) -> Self {
        let text = |key: &str| {
            body.get(key)
                .and_then(text_of)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let list = |key: &str| match body.get(key) {
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| text_of(v).unwrap_or_default())
                    .collect::<Vec<_>>(),
            ),
            Some(Value::Null) | None => None,
            Some(_) => Some(Vec::new()),
        };
        Self {
            query: text("query"),
            constraints: text("constraints"),
            columns: list("columns"),
            criteria: list("criteria"),
        }
    }

    /// Explicit criteria with at least one non-blank label, normalized to
    /// exactly five entries.
    pub fn explicit_criteria(&self) -> Option<Vec<String>> {
        normalize_criteria(self.criteria.as_deref())
    }

    /// Columns the demo generator should use for this request.
    pub fn demo_columns(&self) -> Vec<String> {
        if let Some(criteria) = self.explicit_criteria() {
            return criteria;
        }
        match &self.columns {
            Some(cols) => sanitize_columns(&Value::from(cols.clone())),
            None => DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Trim criteria, substitute `Unknown` for blanks, pad/truncate to five.
/// Returns `None` when no label carries text.
pub fn normalize_criteria(criteria: Option<&[String]>) -> Option<Vec<String>> {
    let criteria = criteria?;
    if criteria.iter().all(|c| c.trim().is_empty()) {
        return None;
    }
    let trimmed = criteria
        .iter()
        .map(|c| {
            let t = c.trim();
            if t.is_empty() { UNKNOWN.to_string() } else { t.to_string() }
        })
        .collect();
    Some(pad_with_unknown(trimmed))
}
