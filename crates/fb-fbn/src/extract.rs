//! Tokenization and value/relation extraction.

use serde_json::{json, Map, Value};

/// Unicode-aware tokenizer: collapse whitespace, keep currency glyphs and
/// decimal points attached to their numbers, strip sentence punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| {
                matches!(c, ',' | ';' | ':' | '!' | '?' | '(' | ')' | '"')
                    || (c == '.' && !raw.chars().any(|d| d.is_ascii_digit()))
            })
            .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Currency glyph -> ISO code.
fn currency_of(token: &str) -> Option<&'static str> {
    if token.starts_with('£') {
        Some("GBP")
    } else if token.starts_with('$') {
        Some("USD")
    } else if token.starts_with('€') {
        Some("EUR")
    } else {
        None
    }
}

/// Whether any token carries a currency marker.
pub fn has_currency(tokens: &[String]) -> bool {
    tokens.iter().any(|t| currency_of(t).is_some())
}

/// Whether any number is immediately followed by a unit word.
pub fn has_unit_quantity(tokens: &[String]) -> bool {
    tokens.windows(2).any(|pair| {
        pair[0].parse::<f64>().is_ok()
            && crate::vocab::UNIT_WORDS.contains(&pair[1].to_lowercase().as_str())
    })
}

/// A proper-noun run starting at the first token, e.g. `Joe's Bakery` in
/// "Joe's Bakery sells …". Stops at the first lowercase token.
pub fn leading_proper_noun(tokens: &[String]) -> Option<String> {
    proper_noun_at(tokens, 0)
}

/// A proper-noun run starting at an arbitrary index.
pub fn proper_noun_at(tokens: &[String], start: usize) -> Option<String> {
    let mut words = Vec::new();
    for token in tokens.iter().skip(start) {
        let is_capitalized = token
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        if !is_capitalized {
            break;
        }
        words.push(token.clone());
    }
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Boolean adjectives lifted into state flags.
const FLAG_ADJECTIVES: &[(&str, &str)] = &[
    ("organic", "organic"),
    ("vegan", "vegan"),
    ("vegetarian", "vegetarian"),
    ("gluten-free", "gluten_free"),
    ("halal", "halal"),
    ("kosher", "kosher"),
    ("local", "local"),
    ("fresh", "fresh"),
];

/// Scan tokens for prices, quantities, flags, and vocabulary aliases; write
/// the canonical fields into `state`.
pub fn extract_values(tokens: &[String], lowered: &str, state: &mut Map<String, Value>) {
    // Currency-marked numbers become price + currency.
    for token in tokens {
        if let Some(code) = currency_of(token) {
            let digits: String = token
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(price) = digits.parse::<f64>() {
                state.insert("price".to_string(), json!(price));
                state.insert("currency".to_string(), json!(code));
                break;
            }
        }
    }

    // Unit-bearing numbers become {value, unit}.
    for pair in tokens.windows(2) {
        let unit = pair[1].to_lowercase();
        if crate::vocab::UNIT_WORDS.contains(&unit.as_str()) {
            if let Ok(value) = pair[0].parse::<f64>() {
                state.insert(
                    "quantity".to_string(),
                    json!({"value": value, "unit": unit}),
                );
                break;
            }
        }
    }

    // Adjectives become booleans.
    for (adjective, field) in FLAG_ADJECTIVES {
        if tokens.iter().any(|t| t.to_lowercase() == *adjective) {
            state.insert((*field).to_string(), json!(true));
        }
    }

    // Vocabulary aliases: "<alias> <number>" lifts the number into the
    // canonical field. Longest aliases are tried first.
    for (alias, field) in crate::vocab::alias_table() {
        if state.contains_key(&field) {
            continue;
        }
        if let Some(at) = lowered.find(&alias) {
            let rest = &lowered[at + alias.len()..];
            if let Some(number) = rest
                .split_whitespace()
                .next()
                .and_then(|t| t.trim_matches(|c: char| !c.is_ascii_digit() && c != '.').parse::<f64>().ok())
            {
                state.insert(field, json!(number));
            }
        }
    }
}

/// A relation between the primary block and a named secondary actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Ref role on the primary block, e.g. `seller`.
    pub role: &'static str,
    /// Block type of the secondary block.
    pub actor_type: &'static str,
    /// Display name of the secondary block.
    pub name: String,
}

/// Verbs that link a named actor to the thing the sentence is about.
const SELLER_VERBS: &[&str] = &["sells", "offers", "stocks", "serves"];
const PRODUCER_VERBS: &[&str] = &["grows", "makes", "produces", "bakes"];

/// Extract `<Name> sells <Product>`-shaped relations and the subject name.
///
/// Returns the relation (if any) and the name of the sentence subject after
/// the verb, e.g. `Sourdough`.
pub fn extract_relations(tokens: &[String]) -> (Option<Relation>, Option<String>) {
    for (index, token) in tokens.iter().enumerate() {
        let verb = token.to_lowercase();
        let (role, actor_type) = if SELLER_VERBS.contains(&verb.as_str()) {
            ("seller", "actor.venue")
        } else if PRODUCER_VERBS.contains(&verb.as_str()) {
            ("producer", "actor.producer")
        } else {
            continue;
        };

        let actor_name = proper_noun_at(tokens, 0).filter(|_| index > 0);
        let subject = proper_noun_at(tokens, index + 1);
        if let Some(name) = actor_name {
            return (
                Some(Relation {
                    role,
                    actor_type,
                    name,
                }),
                subject,
            );
        }
        return (None, subject);
    }
    (None, None)
}
