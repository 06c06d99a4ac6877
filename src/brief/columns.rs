//! Column label normalization

use serde_json::Value;

use super::text_of;

/// Every brief compares exactly this many criteria.
pub const COLUMN_COUNT: usize = 5;

/// Sentinel for any field the provider left out.
pub const UNKNOWN: &str = "Unknown";

/// Force an arbitrary value into exactly five non-empty column labels.
///
/// Non-arrays count as empty. Blank or non-scalar entries become the
/// positional placeholder `Column {n}` (1-indexed).
pub fn sanitize_columns(candidate: &Value) -> Vec<String> {
    let items: &[Value] = match candidate {
        Value::Array(items) => items,
        _ => &[],
    };
    let mut clean: Vec<String> = items
        .iter()
        .take(COLUMN_COUNT)
        .enumerate()
        .map(|(i, item)| {
            let label = text_of(item).unwrap_or_default();
            let label = label.trim();
            if label.is_empty() {
                placeholder(i)
            } else {
                label.to_string()
            }
        })
        .collect();
    while clean.len() < COLUMN_COUNT {
        clean.push(placeholder(clean.len()));
    }
    clean
}

fn placeholder(index: usize) -> String {
    format!("Column {}", index + 1)
}

/// Truncate to five entries, padding with `Unknown`.
pub fn pad_with_unknown(values: Vec<String>) -> Vec<String> {
    pad_with(values, UNKNOWN)
}

pub(crate) fn pad_with(mut values: Vec<String>, filler: &str) -> Vec<String> {
    values.truncate(COLUMN_COUNT);
    values.resize(COLUMN_COUNT, filler.to_string());
    values
}
