//! Block types the engine recognizes for mechanism.
//!
//! These are ordinary blocks; the constants here are the ones the insert
//! pipeline, agent runtime, and projections branch on. The type space is
//! open — everything else is stored without structural interpretation.

/// Erases target content while preserving identity and refs.
pub const TOMBSTONE: &str = "observe.tombstone";

/// Grants cross-author chain-update rights.
pub const APPROVAL: &str = "observe.approval";

/// Explicit fork resolution.
pub const MERGE: &str = "observe.merge";

/// Field aliasing / merge strategies.
pub const VOCABULARY: &str = "observe.vocabulary";

/// Multi-block recipes.
pub const TEMPLATE: &str = "observe.template";

/// Advisory validation.
pub const SCHEMA: &str = "observe.schema";

/// Weights and minima for the trust projection.
pub const TRUST_POLICY: &str = "observe.trust_policy";

/// View-based access control on `private` chains.
pub const ACCESS_GRANT: &str = "observe.access_grant";
pub const ACCESS_REVOKE: &str = "observe.access_revoke";

/// Agent identity blocks.
pub const AGENT: &str = "actor.agent";

/// Certifications and reviews feed the trust projection.
pub const CERTIFICATION: &str = "observe.certification";
pub const REVIEW: &str = "observe.review";

/// Whether a type is an event for `instance_id` injection purposes.
///
/// Events are `transfer.*`, `transform.*`, and `observe.*`, except the
/// observe subtypes that describe shared artifacts rather than occurrences
/// (vocabularies, templates, schemas, trust policies, protocol metadata).
pub fn is_event_type(block_type: &str) -> bool {
    if block_type == "transfer"
        || block_type.starts_with("transfer.")
        || block_type == "transform"
        || block_type.starts_with("transform.")
    {
        return true;
    }
    if block_type == "observe" {
        return true;
    }
    if let Some(subtype) = block_type.strip_prefix("observe.") {
        let first = subtype.split('.').next().unwrap_or(subtype);
        return !matches!(
            first,
            "vocabulary" | "template" | "schema" | "trust_policy" | "protocol"
        );
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_get_instance_ids() {
        assert!(is_event_type("transfer.order"));
        assert!(is_event_type("transform.bake"));
        assert!(is_event_type("observe.reading"));
        assert!(is_event_type("observe.tombstone"));
        assert!(is_event_type("observe.schema_registry"));
        assert!(is_event_type("observe"));
        assert!(is_event_type("transfer"));
    }

    #[test]
    fn test_entities_do_not() {
        assert!(!is_event_type("actor"));
        assert!(!is_event_type("actor.agent"));
        assert!(!is_event_type("place.warehouse"));
        assert!(!is_event_type("substance.product"));
    }

    #[test]
    fn test_artifact_observes_excluded() {
        assert!(!is_event_type("observe.vocabulary"));
        assert!(!is_event_type("observe.template"));
        assert!(!is_event_type("observe.schema"));
        assert!(!is_event_type("observe.trust_policy"));
        assert!(!is_event_type("observe.protocol"));
    }
}
