//! Prompt construction for the comparison provider

use crate::brief::COLUMN_COUNT;

/// Placeholder domain the provider should use for sources it is unsure about.
pub const PLACEHOLDER_SOURCE_DOMAIN: &str = "example.com";

pub fn system_prompt() -> String {
    format!(
        r#"You write short, practical comparison briefs for shoppers.
Reply with ONE JSON object and nothing else. All strings must be in English.

Shape:
{{
  "query": string,
  "constraints": string,
  "topPick": {{ "name": string, "why": string, "tradeoff": string }},
  "columns": [string x {n}],
  "columnHelp": [string x {n}],
  "rows": [{{ "name": string, "values": [string x {n}], "notes": string }} x 3],
  "sources": [{{ "title": string, "url": string }}]
}}

Rules:
- Exactly {n} columns and exactly {n} columnHelp entries, in the same order.
- Exactly 3 rows. Every row.values has exactly {n} entries aligned with columns.
- Keep values short (a few words).
- Give 3 to 5 sources. If unsure of a real URL use https://{domain}.
- Prefer "Unknown" over inventing facts."#,
        n = COLUMN_COUNT,
        domain = PLACEHOLDER_SOURCE_DOMAIN,
    )
}

/// User turn. `nonce` varies per call so identical questions are not served
/// a cached answer.
pub fn user_prompt(
    query: &str,
    constraints: &str,
    criteria: Option<&[String]>,
    suggested_columns: Option<&[String]>,
    nonce: &str,
) -> String {
    let mut prompt = format!("Question: {}\n", query.trim());
    let constraints = constraints.trim();
    prompt.push_str(&format!(
        "Constraints: {}\n",
        if constraints.is_empty() { "None" } else { constraints }
    ));
    match (criteria, suggested_columns) {
        (Some(criteria), _) => {
            prompt.push_str(&format!(
                "Use exactly these columns, in this order: {}\n",
                quoted_list(criteria)
            ));
        }
        (None, Some(cols)) if !cols.is_empty() => {
            prompt.push_str(&format!(
                "Suggested columns (adjust if the question needs others): {}\n",
                quoted_list(cols)
            ));
        }
        _ => {}
    }
    prompt.push_str(&format!("Request id: {}\n", nonce));
    prompt
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "'")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-call uniqueness token.
pub fn request_nonce() -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &uuid::Uuid::new_v4().simple().to_string()[..6]
    )
}
