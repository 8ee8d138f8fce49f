//! Two-key encryption for `private` chains.
//!
//! One stable content key encrypts every version of a private chain; each
//! viewer holds a Master Key that wraps the content key. Revoking a viewer
//! rotates that viewer's Master Key block, making prior and subsequent chain
//! versions undecryptable for them in O(1), without re-encrypting any block
//! content.

use crate::envelope::{decrypt_value, encrypt_value, Envelope};
use crate::keys::{EncryptionKeyPair, X25519PublicKey};
use crate::CryptoError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use serde_json::{json, Value};
use zeroize::{Zeroize, ZeroizeOnDrop};

const NONCE_LEN: usize = 12;

/// The stable per-chain content key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChainKey([u8; 32]);

/// A per-viewer wrapping key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; 32]);

impl ChainKey {
    /// Generate a fresh chain key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Restore from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl MasterKey {
    /// Generate a fresh master key. Rotation is just generating another.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Wrap the chain key under a viewer's master key.
///
/// Returns hex `nonce || AES-256-GCM(master, nonce, chain_key)`.
pub fn wrap_chain_key(master: &MasterKey, chain: &ChainKey) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(&master.0)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let wrapped = cipher
        .encrypt(Nonce::from_slice(&nonce), chain.0.as_slice())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + wrapped.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&wrapped);
    Ok(hex::encode(out))
}

/// Recover the chain key from a wrapped form.
pub fn unwrap_chain_key(master: &MasterKey, wrapped: &str) -> Result<ChainKey, CryptoError> {
    let raw = hex::decode(wrapped)?;
    if raw.len() <= NONCE_LEN {
        return Err(CryptoError::InvalidEnvelope("truncated chain key".to_string()));
    }
    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(&master.0)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    let plain = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    let bytes: [u8; 32] = plain
        .try_into()
        .map_err(|_| CryptoError::InvalidEnvelope("chain key length".to_string()))?;
    Ok(ChainKey(bytes))
}

/// Deliver a viewer's master key: an ordinary envelope addressed to the
/// viewer's X25519 key, suitable for a grant block's state.
pub fn grant_for_viewer(
    master: &MasterKey,
    viewer: &X25519PublicKey,
) -> Result<Envelope, CryptoError> {
    encrypt_value(&json!(hex::encode(master.0)), std::slice::from_ref(viewer))
}

/// Open a grant envelope and recover the master key.
pub fn master_key_from_grant(
    grant: &Envelope,
    viewer: &EncryptionKeyPair,
) -> Result<MasterKey, CryptoError> {
    let value = decrypt_value(grant, viewer)?;
    let hex_str = value
        .as_str()
        .ok_or_else(|| CryptoError::InvalidEnvelope("grant is not a key string".to_string()))?;
    let bytes: [u8; 32] = hex::decode(hex_str)?
        .try_into()
        .map_err(|_| CryptoError::InvalidEnvelope("master key length".to_string()))?;
    Ok(MasterKey(bytes))
}

/// Encrypt a chain value directly under the stable content key.
pub fn encrypt_chain_value(chain: &ChainKey, value: &Value) -> Result<(String, String), CryptoError> {
    let plaintext = fb_canonical::canonical_value(value)?;
    let cipher = Aes256Gcm::new_from_slice(&chain.0)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    Ok((hex::encode(nonce), hex::encode(ciphertext)))
}

/// Decrypt a chain value under the stable content key.
pub fn decrypt_chain_value(
    chain: &ChainKey,
    nonce_hex: &str,
    ciphertext_hex: &str,
) -> Result<Value, CryptoError> {
    let nonce = hex::decode(nonce_hex)?;
    let ciphertext = hex::decode(ciphertext_hex)?;
    let cipher = Aes256Gcm::new_from_slice(&chain.0)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    let plain = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    serde_json::from_slice(&plain)
        .map_err(|e| CryptoError::DecryptionFailed(format!("plaintext is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_chain_key() {
        let chain = ChainKey::generate();
        let master = MasterKey::generate();

        let wrapped = wrap_chain_key(&master, &chain).unwrap();
        let recovered = unwrap_chain_key(&master, &wrapped).unwrap();
        assert_eq!(chain.as_bytes(), recovered.as_bytes());
    }

    #[test]
    fn test_rotated_master_cannot_unwrap_old_wrap() {
        let chain = ChainKey::generate();
        let master = MasterKey::generate();
        let wrapped = wrap_chain_key(&master, &chain).unwrap();

        let rotated = MasterKey::generate();
        assert!(unwrap_chain_key(&rotated, &wrapped).is_err());
    }

    #[test]
    fn test_grant_delivery_roundtrip() {
        let viewer = EncryptionKeyPair::generate();
        let master = MasterKey::generate();

        let grant = grant_for_viewer(&master, &viewer.public_key()).unwrap();
        let recovered = master_key_from_grant(&grant, &viewer).unwrap();

        let chain = ChainKey::generate();
        let wrapped = wrap_chain_key(&master, &chain).unwrap();
        assert!(unwrap_chain_key(&recovered, &wrapped).is_ok());
    }

    #[test]
    fn test_chain_value_roundtrip() {
        let chain = ChainKey::generate();
        let value = serde_json::json!({"recipe": "do not share"});

        let (nonce, ciphertext) = encrypt_chain_value(&chain, &value).unwrap();
        let decrypted = decrypt_chain_value(&chain, &nonce, &ciphertext).unwrap();
        assert_eq!(decrypted, value);
    }

    #[test]
    fn test_revocation_is_key_rotation() {
        // Same chain key across versions; the revoked viewer's master key
        // no longer unwraps after rotation.
        let chain = ChainKey::generate();
        let viewer_a = EncryptionKeyPair::generate();
        let viewer_b = EncryptionKeyPair::generate();

        let master_a = MasterKey::generate();
        let master_b = MasterKey::generate();
        let wrap_a = wrap_chain_key(&master_a, &chain).unwrap();
        let _grant_a = grant_for_viewer(&master_a, &viewer_a.public_key()).unwrap();
        let _grant_b = grant_for_viewer(&master_b, &viewer_b.public_key()).unwrap();

        // Revoke A: rotate A's master key; B's wrap is untouched.
        let rotated_a = MasterKey::generate();
        assert!(unwrap_chain_key(&rotated_a, &wrap_a).is_err());

        let wrap_b = wrap_chain_key(&master_b, &chain).unwrap();
        let recovered = unwrap_chain_key(&master_b, &wrap_b).unwrap();
        assert_eq!(chain.as_bytes(), recovered.as_bytes());
    }
}
