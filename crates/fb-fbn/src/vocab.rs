//! Built-in vocabularies.
//!
//! Vocabularies are ordinary `observe.vocabulary` blocks mapping human
//! phrases to canonical field names. Fourteen ship with the engine; servers
//! and SDKs can add their own as blocks.

use fb_types::{Block, HashedBlock};
use serde_json::{json, Map, Value};

/// The built-in vocabulary domains.
pub const DOMAINS: &[&str] = &[
    "bakery",
    "restaurant",
    "farm",
    "retail",
    "distributor",
    "processor",
    "market",
    "catering",
    "fishery",
    "dairy",
    "butcher",
    "lot",
    "units",
    "workflow",
];

fn aliases_for(domain: &str) -> Value {
    match domain {
        "bakery" => json!({
            "costs": "price", "sells for": "price", "best before": "expiry",
            "baked on": "produced_at", "batch": "lot", "loaf": "unit"
        }),
        "restaurant" => json!({
            "dish": "name", "serves": "portions", "menu price": "price",
            "covers": "capacity", "allergens": "allergens"
        }),
        "farm" => json!({
            "harvested": "harvested_at", "field": "plot", "grown at": "origin",
            "yield": "quantity", "planted": "planted_at"
        }),
        "retail" => json!({
            "rrp": "price", "sku": "sku", "shelf life": "shelf_life",
            "in stock": "stock", "barcode": "gtin"
        }),
        "distributor" => json!({
            "pallet": "unit", "delivery window": "window", "drop": "delivery",
            "consignment": "lot", "carrier": "carrier"
        }),
        "processor" => json!({
            "input": "inputs", "output": "outputs", "run": "batch",
            "line": "line", "processed on": "processed_at"
        }),
        "market" => json!({
            "stall": "venue", "pitch": "venue", "market day": "day",
            "asking": "price"
        }),
        "catering" => json!({
            "headcount": "portions", "event date": "event_at", "menu": "items",
            "per head": "price"
        }),
        "fishery" => json!({
            "landed": "landed_at", "catch": "quantity", "vessel": "vessel",
            "catch area": "origin", "fao area": "origin"
        }),
        "dairy" => json!({
            "milked": "produced_at", "herd": "herd", "fat content": "fat",
            "pasteurised": "pasteurized", "pasteurized": "pasteurized"
        }),
        "butcher" => json!({
            "cut": "cut", "hung for": "aging", "carcass": "lot",
            "slaughtered": "slaughtered_at"
        }),
        "lot" => json!({
            "lot number": "lot", "batch number": "lot", "batch code": "lot",
            "traceability code": "lot"
        }),
        "units" => json!({
            "kilo": "kg", "kilos": "kg", "grams": "g", "litre": "l",
            "liter": "l", "dozen": "dozen", "each": "unit"
        }),
        "workflow" => json!({
            "step": "step", "then": "next", "after": "previous",
            "done": "completed"
        }),
        _ => json!({}),
    }
}

/// Build the fourteen built-in `observe.vocabulary` blocks.
pub fn builtin_vocabularies() -> Vec<HashedBlock> {
    DOMAINS
        .iter()
        .map(|domain| {
            let mut state = Map::new();
            state.insert("domain".to_string(), json!(domain));
            state.insert("aliases".to_string(), aliases_for(domain));
            state.insert("merge".to_string(), json!("last_writer"));
            Block::create("observe.vocabulary", state, Map::new())
                .expect("static vocabulary blocks are valid")
        })
        .collect()
}

/// A flattened phrase -> canonical-field table across every built-in
/// vocabulary, longest phrases first so multi-word aliases win.
pub fn alias_table() -> Vec<(String, String)> {
    let mut table: Vec<(String, String)> = DOMAINS
        .iter()
        .flat_map(|domain| {
            aliases_for(domain)
                .as_object()
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| {
                            v.as_str().map(|field| (k.to_lowercase(), field.to_string()))
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })
        .collect();
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    table.dedup_by(|a, b| a.0 == b.0);
    table
}

/// Unit words recognized by quantity extraction.
pub const UNIT_WORDS: &[&str] = &[
    "kg", "g", "mg", "t", "l", "ml", "cl", "dozen", "loaf", "loaves", "crate", "crates", "box",
    "boxes", "pallet", "pallets", "case", "cases", "unit", "units", "kilo", "kilos",
];
