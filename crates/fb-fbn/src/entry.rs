//! The `fb` entry point: one sentence in, a dependency-ordered block batch
//! out.

use crate::errors::FbnError;
use crate::extract::{extract_relations, extract_values, leading_proper_noun, tokenize};
use crate::intent::{detect, Intent};
use fb_types::{Block, Hash, HashedBlock};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// The result of `fb(text)`. `blocks` are in dependency order, ready for a
/// batch insert; `primary` is the semantically central block, with its
/// triple copied out for convenience.
#[derive(Debug, Clone, Serialize)]
pub struct FbResult {
    pub blocks: Vec<HashedBlock>,
    pub primary: Hash,
    #[serde(rename = "type")]
    pub block_type: String,
    pub state: Map<String, Value>,
    pub refs: Map<String, Value>,
    pub text: String,
    pub confidence: f64,
}

/// Turn a sentence into linked blocks.
///
/// Pure: no I/O and no clock. Low confidence is reported, never rejected —
/// the caller decides what to do with a 0.4.
pub fn fb(text: &str) -> Result<FbResult, FbnError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FbnError::EmptyInput);
    }

    let tokens = tokenize(trimmed);
    let lowered = trimmed.to_lowercase();
    let score = detect(&tokens, &lowered);

    let mut state = Map::new();
    extract_values(&tokens, &lowered, &mut state);

    let (relation, subject) = extract_relations(&tokens);

    // Name the primary block: the post-verb subject when a relation was
    // found, else the leading proper noun, else the raw text for events.
    let name = subject.or_else(|| leading_proper_noun(&tokens));
    match score.intent {
        Intent::SensorReading | Intent::Review | Intent::Transform => {
            state
                .entry("note".to_string())
                .or_insert_with(|| json!(trimmed));
        }
        _ => {
            if let Some(name) = &name {
                state.insert("name".to_string(), json!(name));
            }
        }
    }

    let mut blocks = Vec::new();
    let mut refs = Map::new();

    // Secondary blocks first: dependency order for the batch inserter.
    if let Some(relation) = relation {
        let mut actor_state = Map::new();
        actor_state.insert("name".to_string(), json!(relation.name));
        let actor = Block::create(relation.actor_type, actor_state, Map::new())?;
        refs.insert(
            relation.role.to_string(),
            Value::String(actor.hash.as_str().to_string()),
        );
        blocks.push(actor);
    }

    let primary = Block::create(score.intent.block_type(), state, refs)?;
    let result = FbResult {
        primary: primary.hash.clone(),
        block_type: primary.block.block_type.clone(),
        state: primary.block.state.clone(),
        refs: primary.block.refs.clone(),
        text: trimmed.to_string(),
        confidence: score.confidence,
        blocks: {
            blocks.push(primary);
            blocks
        },
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bakery_sentence_emits_two_linked_blocks() {
        let result = fb("Joe's Bakery sells Sourdough for £4.50 organic").unwrap();

        assert_eq!(result.blocks.len(), 2);
        assert!(result.confidence >= 0.6);

        let venue = &result.blocks[0];
        assert_eq!(venue.block.block_type, "actor.venue");
        assert_eq!(venue.block.state["name"], json!("Joe's Bakery"));

        let product = &result.blocks[1];
        assert_eq!(product.hash, result.primary);
        assert_eq!(product.block.block_type, "substance.product");
        assert_eq!(product.block.state["name"], json!("Sourdough"));
        assert_eq!(product.block.state["price"], json!(4.5));
        assert_eq!(product.block.state["currency"], json!("GBP"));
        assert_eq!(product.block.state["organic"], json!(true));
        assert_eq!(
            product.block.refs["seller"],
            json!(venue.hash.as_str())
        );
    }

    #[test]
    fn test_dependency_order_secondary_first() {
        let result = fb("Hillside Farm grows Heritage Wheat").unwrap();
        assert_eq!(result.blocks.len(), 2);
        assert_eq!(result.blocks[0].block.block_type, "actor.producer");
        // The primary is last, so a batch insert resolves its refs.
        assert_eq!(result.blocks[1].hash, result.primary);
    }

    #[test]
    fn test_sensor_reading_keeps_raw_text() {
        let result = fb("fridge sensor temperature 4.2 celsius").unwrap();
        assert_eq!(result.block_type, "observe.reading");
        assert!(result.state.contains_key("note"));
        assert!(result.state.contains_key("instance_id"));
    }

    #[test]
    fn test_unknown_text_defaults_to_product() {
        let result = fb("greeble florp").unwrap();
        assert_eq!(result.block_type, "substance.product");
        assert_eq!(result.confidence, 0.4);
        assert_eq!(result.blocks.len(), 1);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(fb("   "), Err(FbnError::EmptyInput)));
    }

    #[test]
    fn test_result_is_deterministic_modulo_instance_ids() {
        // Entities carry no instance_id, so the same sentence gives the
        // same hashes.
        let a = fb("Joe's Bakery sells Sourdough for £4.50").unwrap();
        let b = fb("Joe's Bakery sells Sourdough for £4.50").unwrap();
        assert_eq!(a.primary, b.primary);
    }
}
