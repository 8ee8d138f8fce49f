//! The server's federation identity.

use crate::errors::FederationError;
use fb_canonical::canonical_value;
use fb_crypto::{Ed25519PublicKey, Ed25519Signature, SigningKeyPair};
use serde_json::Value;
use tracing::warn;

/// The Ed25519 identity a server signs discovery documents, handshakes, and
/// push payloads with.
pub struct ServerIdentity {
    pub name: String,
    pub url: String,
    keypair: SigningKeyPair,
    /// True when no persistent key was configured; peers will see a new
    /// identity after every restart.
    pub ephemeral: bool,
}

impl ServerIdentity {
    /// Build from configuration. A missing private key falls back to an
    /// ephemeral identity with a WARN, matching the reference behavior.
    pub fn from_config(
        name: impl Into<String>,
        url: impl Into<String>,
        private_key_hex: Option<&str>,
    ) -> Result<Self, FederationError> {
        let (keypair, ephemeral) = match private_key_hex {
            Some(hex_seed) => (SigningKeyPair::from_hex(hex_seed)?, false),
            None => {
                warn!(
                    "No FEDERATION_PRIVATE_KEY configured; using an ephemeral identity. \
                     Peers will not recognize this server across restarts."
                );
                (SigningKeyPair::generate(), true)
            }
        };
        Ok(Self {
            name: name.into(),
            url: url.into(),
            keypair,
            ephemeral,
        })
    }

    /// The published verification key, hex.
    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key().to_hex()
    }

    /// Sign the canonical form of a JSON payload, returning hex.
    pub fn sign_value(&self, payload: &Value) -> Result<String, FederationError> {
        let canonical = canonical_value(payload)?;
        Ok(self.keypair.sign(canonical.as_bytes()).to_hex())
    }
}

/// Verify a hex signature over the canonical form of a payload.
pub fn verify_value(
    payload: &Value,
    signature_hex: &str,
    public_key_hex: &str,
) -> Result<(), FederationError> {
    let canonical = canonical_value(payload)?;
    let key = Ed25519PublicKey::from_hex(public_key_hex)
        .map_err(|_| FederationError::InvalidSignature)?;
    let signature = Ed25519Signature::from_hex(signature_hex)
        .map_err(|_| FederationError::InvalidSignature)?;
    key.verify(canonical.as_bytes(), &signature)
        .map_err(|_| FederationError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_and_verify_payload() {
        let identity =
            ServerIdentity::from_config("node-a", "https://a.example", None).unwrap();
        let payload = json!({"peer_url": "https://a.example", "block_count": 2});

        let signature = identity.sign_value(&payload).unwrap();
        assert!(verify_value(&payload, &signature, &identity.public_key_hex()).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let identity =
            ServerIdentity::from_config("node-a", "https://a.example", None).unwrap();
        let payload = json!({"block_count": 2});
        let signature = identity.sign_value(&payload).unwrap();

        let tampered = json!({"block_count": 3});
        assert!(verify_value(&tampered, &signature, &identity.public_key_hex()).is_err());
    }

    #[test]
    fn test_persistent_identity_from_seed() {
        let seed = "7".repeat(64);
        let a = ServerIdentity::from_config("n", "u", Some(&seed)).unwrap();
        let b = ServerIdentity::from_config("n", "u", Some(&seed)).unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());
        assert!(!a.ephemeral);
    }

    #[test]
    fn test_missing_key_is_ephemeral() {
        let identity = ServerIdentity::from_config("n", "u", None).unwrap();
        assert!(identity.ephemeral);
    }
}
