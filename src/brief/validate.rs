//! Turn an untrusted candidate into a well-formed [`Brief`]
//!
//! [`validate_candidate`] is total: each malformed field degrades to a
//! default and the rest of the candidate is still used.

use serde_json::Value;

use super::columns::{COLUMN_COUNT, UNKNOWN, pad_with, pad_with_unknown};
use super::{
    Brief, DEFAULT_QUERY, NO_CONSTRAINTS, RawCandidate, Row, Source, TopPick, normalize_criteria,
    text_of,
};

/// Sentinel for a column whose explanation is missing.
pub const UNKNOWN_HELP: &str = "Why it matters: Unknown";

/// At most this many sources are kept.
pub const MAX_SOURCES: usize = 5;

/// Caller-supplied values that win over, or stand in for, the candidate.
#[derive(Debug, Clone, Default)]
pub struct CandidateFallbacks<'a> {
    pub query: &'a str,
    pub constraints: &'a str,
    pub criteria: Option<&'a [String]>,
}

pub fn validate_candidate(candidate: &RawCandidate, fallbacks: &CandidateFallbacks<'_>) -> Brief {
    let query = non_blank(candidate.field("query").and_then(Value::as_str))
        .or_else(|| non_blank(Some(fallbacks.query)))
        .unwrap_or(DEFAULT_QUERY)
        .to_string();

    let constraints = match candidate.field("constraints").and_then(Value::as_str) {
        Some(c) => c.to_string(),
        None => non_blank(Some(fallbacks.constraints))
            .unwrap_or(NO_CONSTRAINTS)
            .to_string(),
    };

    let candidate_columns = pad_with_unknown(
        string_list(candidate.field("columns"), UNKNOWN)
            .into_iter()
            .map(|c| if c.trim().is_empty() { UNKNOWN.to_string() } else { c })
            .collect(),
    );
    let candidate_help = pad_with(
        string_list(candidate.field("columnHelp"), UNKNOWN_HELP),
        UNKNOWN_HELP,
    );

    let (columns, column_help) = match normalize_criteria(fallbacks.criteria) {
        Some(criteria) => {
            let help = if same_labels(&criteria, &candidate_columns) {
                candidate_help
            } else {
                criteria_help(&criteria)
            };
            (criteria, help)
        }
        None => (candidate_columns, candidate_help),
    };

    let rows = match candidate.field("rows") {
        Some(Value::Array(items)) => items.iter().map(row_from).collect(),
        _ => Vec::new(),
    };

    Brief {
        query,
        constraints,
        top_pick: top_pick_from(candidate.field("topPick"), &rows),
        columns,
        column_help,
        rows,
        sources: sources_from(candidate.field("sources")),
        mode: None,
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Coerce to a list of strings. Entries without a text form take `filler`.
fn string_list(value: Option<&Value>, filler: &str) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| text_of(v).unwrap_or_else(|| filler.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn same_labels(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.trim().eq_ignore_ascii_case(y.trim()))
}

/// Help text describing each label of an explicit criteria list.
pub fn criteria_help(labels: &[String]) -> Vec<String> {
    labels.iter().map(|label| help_for(label)).collect()
}

fn help_for(label: &str) -> String {
    if label == UNKNOWN {
        UNKNOWN_HELP.to_string()
    } else {
        format!("Why it matters: {label}")
    }
}

fn string_field(obj: Option<&serde_json::Map<String, Value>>, key: &str) -> Option<String> {
    obj.and_then(|o| o.get(key)).and_then(text_of)
}

fn row_from(entry: &Value) -> Row {
    let obj = entry.as_object();
    let values = obj
        .and_then(|o| o.get("values"))
        .map(|v| string_list(Some(v), UNKNOWN))
        .unwrap_or_default();
    Row {
        name: string_field(obj, "name")
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        values: pad_with_unknown(values),
        notes: string_field(obj, "notes").unwrap_or_default(),
    }
}

fn top_pick_from(value: Option<&Value>, rows: &[Row]) -> TopPick {
    let obj = value.and_then(Value::as_object);
    let name = string_field(obj, "name")
        .filter(|n| !n.trim().is_empty())
        .or_else(|| rows.first().map(|r| r.name.clone()))
        .unwrap_or_else(|| UNKNOWN.to_string());
    TopPick {
        name,
        why: string_field(obj, "why").unwrap_or_default(),
        tradeoff: string_field(obj, "tradeoff").unwrap_or_default(),
    }
}

fn sources_from(value: Option<&Value>) -> Vec<Source> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object();
            let title = string_field(obj, "title").filter(|t| !t.trim().is_empty());
            let url = string_field(obj, "url").filter(|u| !u.trim().is_empty());
            match (title, url) {
                (None, None) => None,
                (title, url) => {
                    let url = url.unwrap_or_default();
                    Some(Source {
                        title: title.unwrap_or_else(|| url.clone()),
                        url,
                    })
                }
            }
        })
        .take(MAX_SOURCES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(value: Value) -> Brief {
        validate_candidate(
            &RawCandidate::new(value),
            &CandidateFallbacks {
                query: "fallback q",
                constraints: "",
                criteria: None,
            },
        )
    }

    fn assert_shape(brief: &Brief) {
        assert_eq!(brief.columns.len(), COLUMN_COUNT);
        assert_eq!(brief.column_help.len(), COLUMN_COUNT);
        assert!(!brief.query.is_empty());
        for row in &brief.rows {
            assert_eq!(row.values.len(), COLUMN_COUNT);
        }
        assert!(brief.sources.len() <= MAX_SOURCES);
    }

    #[test]
    fn test_garbage_inputs_yield_valid_briefs() {
        let inputs = [
            json!(null),
            json!({}),
            json!([1, 2, 3]),
            json!("a string"),
            json!({"rows": [null, 3, {"values": {"a": 1}}], "topPick": [], "sources": "x"}),
            json!({"columns": [[], {}, null], "columnHelp": 9, "query": 12}),
        ];
        for input in inputs {
            let brief = validate(input);
            assert_shape(&brief);
            assert!(brief.mode.is_none());
        }
    }

    #[test]
    fn test_query_and_constraints_fallbacks() {
        let brief = validate(json!({"query": "  ", "constraints": 5}));
        assert_eq!(brief.query, "fallback q");
        assert_eq!(brief.constraints, NO_CONSTRAINTS);

        let no_fallback = validate_candidate(&RawCandidate::default(), &CandidateFallbacks::default());
        assert_eq!(no_fallback.query, DEFAULT_QUERY);

        let brief = validate(json!({"query": "from ai", "constraints": ""}));
        assert_eq!(brief.query, "from ai");
        assert_eq!(brief.constraints, "");
    }

    #[test]
    fn test_partial_columns_padded_with_unknown() {
        let brief = validate(json!({"columns": ["Price", "Battery"]}));
        assert_eq!(
            brief.columns,
            vec!["Price", "Battery", "Unknown", "Unknown", "Unknown"]
        );
        assert_eq!(brief.column_help, vec![UNKNOWN_HELP; COLUMN_COUNT]);
    }

    #[test]
    fn test_criteria_override_regenerates_help() {
        let criteria = vec!["Price".to_string(), "Weight".to_string(), "Comfort".to_string()];
        let brief = validate_candidate(
            &RawCandidate::new(json!({
                "columns": ["A", "B", "C", "D", "E"],
                "columnHelp": ["a", "b", "c", "d", "e"]
            })),
            &CandidateFallbacks {
                query: "q",
                constraints: "",
                criteria: Some(&criteria),
            },
        );
        assert_eq!(
            brief.columns,
            vec!["Price", "Weight", "Comfort", "Unknown", "Unknown"]
        );
        assert_eq!(
            brief.column_help,
            vec![
                "Why it matters: Price",
                "Why it matters: Weight",
                "Why it matters: Comfort",
                UNKNOWN_HELP,
                UNKNOWN_HELP,
            ]
        );
    }

    #[test]
    fn test_criteria_matching_ai_columns_keeps_ai_help() {
        let criteria = vec!["price".to_string(), "Weight".to_string()];
        let brief = validate_candidate(
            &RawCandidate::new(json!({
                "columns": ["Price", "weight ", "Unknown", "Unknown", "Unknown"],
                "columnHelp": ["cost", "heft"]
            })),
            &CandidateFallbacks {
                query: "q",
                constraints: "",
                criteria: Some(&criteria),
            },
        );
        assert_eq!(brief.columns[0], "price");
        assert_eq!(brief.column_help[0], "cost");
        assert_eq!(brief.column_help[1], "heft");
        assert_eq!(brief.column_help[2], UNKNOWN_HELP);
    }

    #[test]
    fn test_rows_are_aligned() {
        let brief = validate(json!({
            "rows": [
                {"name": "A", "values": ["1", 2, true], "notes": "n"},
                {"name": "", "values": ["1", "2", "3", "4", "5", "6"]},
            ]
        }));
        assert_eq!(brief.rows.len(), 2);
        assert_eq!(brief.rows[0].values, vec!["1", "2", "true", "Unknown", "Unknown"]);
        assert_eq!(brief.rows[1].name, UNKNOWN);
        assert_eq!(brief.rows[1].values.len(), COLUMN_COUNT);
        assert_eq!(brief.rows[1].notes, "");
    }

    #[test]
    fn test_top_pick_defaults_to_first_row() {
        let brief = validate(json!({"rows": [{"name": "Alpha"}], "topPick": {"why": "cheap"}}));
        assert_eq!(brief.top_pick.name, "Alpha");
        assert_eq!(brief.top_pick.why, "cheap");
        assert_eq!(brief.top_pick.tradeoff, "");
    }

    #[test]
    fn test_sources_are_capped_and_filtered() {
        let sources: Vec<Value> = (0..8)
            .map(|i| json!({"title": format!("S{i}"), "url": format!("https://example.com/{i}")}))
            .chain([json!({}), json!("nope")])
            .collect();
        let mut all = vec![json!({"url": "https://only-url.example"}), json!({})];
        all.extend(sources);
        let brief = validate(json!({ "sources": all }));
        assert_eq!(brief.sources.len(), MAX_SOURCES);
        assert_eq!(brief.sources[0].title, "https://only-url.example");
        assert_eq!(brief.sources[1].title, "S0");
    }
}
