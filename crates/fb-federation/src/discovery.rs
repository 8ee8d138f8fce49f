//! The signed discovery document served at `/.well-known/foodblock`.

use crate::errors::FederationError;
use crate::identity::{verify_value, ServerIdentity};
use fb_store::BlockStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Advertised hashing/signature/encryption algorithms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Algorithms {
    pub hash: String,
    pub signature: String,
    pub encryption: String,
}

impl Default for Algorithms {
    fn default() -> Self {
        Self {
            hash: "sha-256".to_string(),
            signature: "ed25519".to_string(),
            encryption: "x25519-aes-256-gcm".to_string(),
        }
    }
}

/// One advertised type with its stored count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub block_type: String,
    pub count: usize,
}

/// The discovery document. `signature` covers the canonical form of the
/// document with the signature field removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub protocol: String,
    pub version: String,
    pub name: String,
    pub public_key: String,
    pub types: Vec<TypeCount>,
    pub count: usize,
    pub peers: Vec<String>,
    pub algorithms: Algorithms,
    pub capabilities: Vec<String>,
    pub endpoints: Vec<String>,
    pub signature: String,
}

/// Endpoints every node advertises.
fn endpoint_catalog() -> Vec<String> {
    [
        "/.well-known/foodblock",
        "/.well-known/foodblock/handshake",
        "/.well-known/foodblock/push",
        "/.well-known/foodblock/pull",
        "/blocks",
        "/blocks/batch",
        "/find",
        "/stream",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Build and sign the discovery document.
pub fn build_discovery(
    identity: &ServerIdentity,
    store: &dyn BlockStore,
    peer_urls: Vec<String>,
) -> Result<DiscoveryDocument, FederationError> {
    let mut document = DiscoveryDocument {
        protocol: "foodblock".to_string(),
        version: fb_types::PROTOCOL_VERSION.to_string(),
        name: identity.name.clone(),
        public_key: identity.public_key_hex(),
        types: store
            .type_counts()
            .into_iter()
            .map(|(block_type, count)| TypeCount { block_type, count })
            .collect(),
        count: store.count(),
        peers: peer_urls,
        algorithms: Algorithms::default(),
        capabilities: vec![
            "push".to_string(),
            "pull".to_string(),
            "sync".to_string(),
            "stream".to_string(),
        ],
        endpoints: endpoint_catalog(),
        signature: String::new(),
    };

    document.signature = identity.sign_value(&unsigned_view(&document)?)?;
    Ok(document)
}

/// Verify a received discovery document against its embedded key.
pub fn verify_discovery(document: &DiscoveryDocument) -> Result<(), FederationError> {
    verify_value(
        &unsigned_view(document)?,
        &document.signature,
        &document.public_key,
    )
}

fn unsigned_view(document: &DiscoveryDocument) -> Result<Value, FederationError> {
    let mut value = serde_json::to_value(document)
        .map_err(|e| FederationError::BadPayload(e.to_string()))?;
    if let Some(map) = value.as_object_mut() {
        map.remove("signature");
    }
    Ok(value)
}

/// A convenience summary for the `/` endpoint catalog.
pub fn server_summary(identity: &ServerIdentity, store: &dyn BlockStore) -> Value {
    json!({
        "protocol": "foodblock",
        "version": fb_types::PROTOCOL_VERSION,
        "name": identity.name,
        "blocks": store.count(),
        "endpoints": endpoint_catalog(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_store::MemoryStore;

    #[test]
    fn test_discovery_roundtrip_verifies() {
        let identity = ServerIdentity::from_config("node-a", "https://a.example", None).unwrap();
        let store = MemoryStore::new();

        let document =
            build_discovery(&identity, &store, vec!["https://b.example".to_string()]).unwrap();
        assert_eq!(document.protocol, "foodblock");
        assert_eq!(document.version, "0.5");
        assert_eq!(document.algorithms, Algorithms::default());
        assert!(verify_discovery(&document).is_ok());
    }

    #[test]
    fn test_tampered_discovery_fails() {
        let identity = ServerIdentity::from_config("node-a", "https://a.example", None).unwrap();
        let store = MemoryStore::new();

        let mut document = build_discovery(&identity, &store, Vec::new()).unwrap();
        document.name = "impostor".to_string();
        assert!(verify_discovery(&document).is_err());
    }

    #[test]
    fn test_serialized_wire_shape() {
        let identity = ServerIdentity::from_config("node-a", "https://a.example", None).unwrap();
        let store = MemoryStore::new();
        let document = build_discovery(&identity, &store, Vec::new()).unwrap();

        let wire = serde_json::to_value(&document).unwrap();
        for key in [
            "protocol",
            "version",
            "name",
            "public_key",
            "types",
            "count",
            "peers",
            "algorithms",
            "capabilities",
            "endpoints",
            "signature",
        ] {
            assert!(wire.get(key).is_some(), "missing {key}");
        }
    }
}
