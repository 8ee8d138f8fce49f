//! Intent detection over a closed set.
//!
//! Each intent carries a signal table: keywords, currency markers, numeric
//! patterns, unit words, proper-noun shape. Confidence is
//! `min(1.0, 0.4 + 0.2 * matched_signals)`; with no trigger the default is
//! `substance.product` at 0.4.

use crate::extract::{has_currency, has_unit_quantity, leading_proper_noun};

/// The closed intent set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Product,
    Venue,
    Producer,
    Review,
    Order,
    Surplus,
    Certification,
    SensorReading,
    Transform,
    Agent,
}

impl Intent {
    /// The block type this intent emits as its primary.
    pub fn block_type(self) -> &'static str {
        match self {
            Self::Product => "substance.product",
            Self::Venue => "actor.venue",
            Self::Producer => "actor.producer",
            Self::Review => "observe.review",
            Self::Order => "transfer.order",
            Self::Surplus => "observe.offer",
            Self::Certification => "observe.certification",
            Self::SensorReading => "observe.reading",
            Self::Transform => "transform",
            Self::Agent => "actor.agent",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Product => &["sells", "sell", "product", "price", "costs"],
            Self::Venue => &[
                "bakery", "restaurant", "cafe", "shop", "store", "venue", "deli", "bar",
            ],
            Self::Producer => &["farm", "producer", "grows", "grown", "harvest", "orchard"],
            Self::Review => &["review", "rated", "rating", "stars", "star"],
            Self::Order => &["order", "ordered", "buy", "bought", "purchase"],
            Self::Surplus => &["surplus", "leftover", "excess", "spare", "unsold"],
            Self::Certification => &["certified", "certificate", "certification", "accredited"],
            Self::SensorReading => &[
                "temperature", "reading", "sensor", "humidity", "°c", "celsius",
            ],
            Self::Transform => &["baked", "made", "processed", "transformed", "turned", "into"],
            Self::Agent => &["agent", "bot", "assistant"],
        }
    }

    const ALL: [Intent; 10] = [
        Intent::Product,
        Intent::Venue,
        Intent::Producer,
        Intent::Review,
        Intent::Order,
        Intent::Surplus,
        Intent::Certification,
        Intent::SensorReading,
        Intent::Transform,
        Intent::Agent,
    ];
}

/// A scored intent.
#[derive(Clone, Copy, Debug)]
pub struct IntentScore {
    pub intent: Intent,
    pub signals: usize,
    pub confidence: f64,
}

// Tunable policy constants, not protocol.
const BASE_CONFIDENCE: f64 = 0.4;
const SIGNAL_WEIGHT: f64 = 0.2;

fn confidence(signals: usize) -> f64 {
    (BASE_CONFIDENCE + SIGNAL_WEIGHT * signals as f64).min(1.0)
}

/// Score every intent against the token list and pick the winner.
///
/// Falls back to `substance.product` at base confidence when nothing
/// triggers.
pub fn detect(tokens: &[String], lowered: &str) -> IntentScore {
    let mut best: Option<IntentScore> = None;

    for intent in Intent::ALL {
        let mut signals = intent
            .keywords()
            .iter()
            .filter(|kw| lowered.contains(*kw))
            .count();

        // Shape signals on top of keywords.
        match intent {
            Intent::Product | Intent::Order | Intent::Surplus => {
                if has_currency(tokens) {
                    signals += 1;
                }
            }
            Intent::SensorReading | Intent::Transform => {
                if has_unit_quantity(tokens) {
                    signals += 1;
                }
            }
            Intent::Venue | Intent::Producer => {
                if leading_proper_noun(tokens).is_some() {
                    signals += 1;
                }
            }
            _ => {}
        }

        if signals == 0 {
            continue;
        }
        let candidate = IntentScore {
            intent,
            signals,
            confidence: confidence(signals),
        };
        let better = match best {
            None => true,
            Some(current) => candidate.signals > current.signals,
        };
        if better {
            best = Some(candidate);
        }
    }

    best.unwrap_or(IntentScore {
        intent: Intent::Product,
        signals: 0,
        confidence: BASE_CONFIDENCE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tokenize;

    fn detect_text(text: &str) -> IntentScore {
        let tokens = tokenize(text);
        detect(&tokens, &text.to_lowercase())
    }

    #[test]
    fn test_product_sentence() {
        let score = detect_text("Joe's Bakery sells Sourdough for £4.50 organic");
        assert_eq!(score.intent, Intent::Product);
        assert!(score.confidence >= 0.6);
    }

    #[test]
    fn test_sensor_reading() {
        let score = detect_text("fridge sensor temperature 4.2 celsius");
        assert_eq!(score.intent, Intent::SensorReading);
        assert!(score.confidence > 0.4);
    }

    #[test]
    fn test_review_sentence() {
        let score = detect_text("rated The Green Fork 5 stars, excellent bread");
        assert_eq!(score.intent, Intent::Review);
    }

    #[test]
    fn test_default_is_product_at_base() {
        let score = detect_text("mysterious untyped words");
        assert_eq!(score.intent, Intent::Product);
        assert_eq!(score.confidence, 0.4);
        assert_eq!(score.signals, 0);
    }

    #[test]
    fn test_confidence_caps_at_one() {
        assert_eq!(confidence(10), 1.0);
        assert!((confidence(2) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_surplus_sentence() {
        let score = detect_text("20 unsold loaves surplus at closing");
        assert_eq!(score.intent, Intent::Surplus);
    }
}
