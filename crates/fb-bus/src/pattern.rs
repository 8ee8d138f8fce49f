//! Type patterns and subscription filters.
//!
//! Dispatch matches dot-separated type segments against three pattern
//! shapes: exact (`transfer.order`), prefix (`transfer.*`), and the bare
//! wildcard (`*`). Matching is a comparison over segments; no regexes are
//! compiled per event.

use crate::event::BlockEvent;
use fb_types::Hash;
use serde::{Deserialize, Serialize};

/// A single type pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePattern(String);

impl TypePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// The raw pattern string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a block type matches this pattern.
    ///
    /// `prefix.*` matches the prefix itself and anything nested under it;
    /// `prefix*` (no dot) is accepted as the same thing for SSE query
    /// convenience.
    pub fn matches(&self, block_type: &str) -> bool {
        if self.0 == "*" {
            return true;
        }
        if let Some(stripped) = self.0.strip_suffix('*') {
            let prefix = stripped.trim_end_matches('.');
            return block_type == prefix
                || block_type
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('.'));
        }
        self.0 == block_type
    }
}

impl From<&str> for TypePattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Per-subscription filter: type patterns, author, and referenced hash.
/// Empty filter matches everything.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Match if any pattern matches; empty means all types.
    pub types: Vec<TypePattern>,
    /// Match on `author_hash`.
    pub author: Option<Hash>,
    /// Match if any ref role points at this hash.
    pub ref_value: Option<Hash>,
}

impl EventFilter {
    /// Match every event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match one type pattern.
    pub fn for_type(pattern: impl Into<TypePattern>) -> Self {
        Self {
            types: vec![pattern.into()],
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: Hash) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_ref(mut self, target: Hash) -> Self {
        self.ref_value = Some(target);
        self
    }

    /// Whether an event passes this filter.
    pub fn matches(&self, event: &BlockEvent) -> bool {
        if !self.types.is_empty()
            && !self.types.iter().any(|p| p.matches(event.block_type()))
        {
            return false;
        }
        if let Some(author) = &self.author {
            if event.block.author_hash.as_ref() != Some(author) {
                return false;
            }
        }
        if let Some(target) = &self.ref_value {
            let referenced = event
                .block
                .block
                .all_refs()
                .iter()
                .any(|(_, hash)| hash == target);
            if !referenced {
                return false;
            }
        }
        true
    }
}

impl From<TypePattern> for EventFilter {
    fn from(pattern: TypePattern) -> Self {
        Self::for_type(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let p = TypePattern::new("transfer.order");
        assert!(p.matches("transfer.order"));
        assert!(!p.matches("transfer.order.retail"));
        assert!(!p.matches("transfer"));
    }

    #[test]
    fn test_prefix_pattern() {
        let p = TypePattern::new("transfer.*");
        assert!(p.matches("transfer"));
        assert!(p.matches("transfer.order"));
        assert!(p.matches("transfer.order.retail"));
        assert!(!p.matches("transform.bake"));
        assert!(!p.matches("transferred"));
    }

    #[test]
    fn test_bare_star_pattern() {
        let p = TypePattern::new("*");
        assert!(p.matches("anything"));
        assert!(p.matches("observe.reading"));
    }

    #[test]
    fn test_star_without_dot() {
        let p = TypePattern::new("observe*");
        assert!(p.matches("observe"));
        assert!(p.matches("observe.reading"));
        assert!(!p.matches("observed"));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = EventFilter::all();
        assert!(filter.types.is_empty());
        assert!(filter.author.is_none());
        assert!(filter.ref_value.is_none());
    }
}
