//! Offline demo briefs synthesized from the query text alone

use super::columns::UNKNOWN;
use super::validate::UNKNOWN_HELP;
use super::{Brief, BriefMode, DEFAULT_QUERY, NO_CONSTRAINTS, Row, TopPick};

/// Canned item sets the demo generator can draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoCategory {
    PhonePlan,
    Headphones,
    Generic,
}

struct DemoItem {
    name: &'static str,
    values: [&'static str; 5],
    notes: &'static str,
}

/// A category is selected when the lowercased query contains any keyword.
struct Rule {
    keywords: &'static [&'static str],
    category: DemoCategory,
}

/// Evaluated top to bottom; the first match wins.
const RULES: &[Rule] = &[
    Rule {
        keywords: &["phone plan", "carrier", "sim"],
        category: DemoCategory::PhonePlan,
    },
    Rule {
        keywords: &["headphone", "earbuds", "anc"],
        category: DemoCategory::Headphones,
    },
];

const PHONE_PLAN_ITEMS: [DemoItem; 3] = [
    DemoItem {
        name: "Mint Mobile (Demo)",
        values: ["$15–$30/mo", "5–20GB", "Limited", "Yes", "Best value prepaid"],
        notes: "Budget-friendly if coverage fits your area.",
    },
    DemoItem {
        name: "Visible (Demo)",
        values: ["$25–$45/mo", "Unlimited", "Limited", "Yes", "Verizon network"],
        notes: "Simple unlimited pricing, good coverage in many areas.",
    },
    DemoItem {
        name: "T-Mobile Prepaid (Demo)",
        values: ["$40–$60/mo", "Unlimited", "Add-on", "Yes", "Intl add-ons"],
        notes: "Good for international students; check promos.",
    },
];

const HEADPHONE_ITEMS: [DemoItem; 3] = [
    DemoItem {
        name: "Sony WH-1000XM (Demo)",
        values: ["$250–$400", "Strong ANC", "Great", "Long", "Comfortable"],
        notes: "Balanced pick for calls + noise cancelling.",
    },
    DemoItem {
        name: "Bose QC (Demo)",
        values: ["$250–$380", "Strong ANC", "Good", "Long", "Very comfy"],
        notes: "Comfort-first pick; call quality varies by model.",
    },
    DemoItem {
        name: "Anker Soundcore (Demo)",
        values: ["$60–$150", "Good ANC", "Okay", "Long", "Budget"],
        notes: "Great value, fewer premium features.",
    },
];

const GENERIC_ITEMS: [DemoItem; 3] = [
    DemoItem {
        name: "Option A (Demo)",
        values: ["Mid", "High", "Good", "Yes", "Simple choice"],
        notes: "Solid baseline option.",
    },
    DemoItem {
        name: "Option B (Demo)",
        values: ["Low", "Medium", "Okay", "Yes", "Budget"],
        notes: "Cheapest, fewer premium features.",
    },
    DemoItem {
        name: "Option C (Demo)",
        values: ["High", "High", "Great", "Yes", "Premium"],
        notes: "Best performance, costs more.",
    },
];

const DEMO_COLUMN_HELP: [&str; 5] = [
    "Quick comparison metric",
    "Core features & quality",
    "Best target audience",
    "Compatibility & limits",
    "Additional notes",
];

const DEMO_WHY: &str = "Demo result to showcase how a comparison grid is structured.";
const DEMO_TRADEOFF: &str = "Live sources and real links appear when API mode is enabled.";

impl DemoCategory {
    fn items(self) -> &'static [DemoItem; 3] {
        match self {
            DemoCategory::PhonePlan => &PHONE_PLAN_ITEMS,
            DemoCategory::Headphones => &HEADPHONE_ITEMS,
            DemoCategory::Generic => &GENERIC_ITEMS,
        }
    }
}

pub fn classify_query(query: &str) -> DemoCategory {
    let lower = query.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw)))
        .map(|rule| rule.category)
        .unwrap_or(DemoCategory::Generic)
}

/// Build a demo brief. Row values and column help follow `columns.len()`.
pub fn make_demo_brief(query: &str, constraints: &str, columns: &[String]) -> Brief {
    let query = match query.trim() {
        "" => DEFAULT_QUERY,
        q => q,
    };
    let items = classify_query(query).items();
    let width = columns.len();

    let rows = items
        .iter()
        .map(|item| Row {
            name: item.name.to_string(),
            values: fit(&item.values, width, UNKNOWN),
            notes: item.notes.to_string(),
        })
        .collect();

    Brief {
        query: query.to_string(),
        constraints: match constraints.trim() {
            "" => NO_CONSTRAINTS.to_string(),
            c => c.to_string(),
        },
        top_pick: TopPick {
            name: items[0].name.to_string(),
            why: DEMO_WHY.to_string(),
            tradeoff: DEMO_TRADEOFF.to_string(),
        },
        columns: columns.to_vec(),
        column_help: fit(&DEMO_COLUMN_HELP, width, UNKNOWN_HELP),
        rows,
        sources: Vec::new(),
        mode: None,
    }
    .with_mode(BriefMode::DemoForced)
}

fn fit(values: &[&str], width: usize, filler: &str) -> Vec<String> {
    let mut out: Vec<String> = values.iter().take(width).map(|v| v.to_string()).collect();
    out.resize(width, filler.to_string());
    out
}
