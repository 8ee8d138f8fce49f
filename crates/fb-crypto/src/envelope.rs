//! Multi-recipient envelope encryption for `_`-prefixed state fields.
//!
//! Per field: a random 32-byte content key encrypts the canonical form of
//! the value under AES-256-GCM; the content key is then wrapped once per
//! recipient under a key derived from X25519 between a fresh sender key and
//! the recipient's public key. The envelope replaces the field value, so it
//! is covered by the block hash and the recipient set is immutable per
//! block.

use crate::keys::{EncryptionKeyPair, X25519PublicKey};
use crate::CryptoError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use fb_canonical::canonical_value;
use rand::RngCore;
use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::Zeroize;

/// Algorithm label carried on every envelope.
pub const ENVELOPE_ALG: &str = "x25519-aes-256-gcm";

const NONCE_LEN: usize = 12;

/// One wrapped content key per recipient.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipientEntry {
    /// SHA-256 of the recipient's X25519 public key.
    pub key_hash: String,
    /// Hex `nonce || AES-256-GCM(kek, nonce, content_key)`.
    pub encrypted_key: String,
}

/// The field-level envelope stored in place of the plaintext value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub alg: String,
    pub recipients: Vec<RecipientEntry>,
    /// Sender's ephemeral X25519 public key, hex. Required for recipients to
    /// derive the unwrap key.
    pub ephemeral_public: String,
    /// Hex, 12 bytes.
    pub nonce: String,
    /// Hex AES-256-GCM output over the canonical plaintext.
    pub ciphertext: String,
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn aead_encrypt(key: &[u8; 32], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

fn aead_decrypt(key: &[u8; 32], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Derive the key-wrap key from a raw X25519 shared secret.
fn kek_from_shared(shared: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(shared);
    hasher.finalize().into()
}

/// Encrypt a value for a recipient set.
pub fn encrypt_value(
    value: &Value,
    recipients: &[X25519PublicKey],
) -> Result<Envelope, CryptoError> {
    if recipients.is_empty() {
        return Err(CryptoError::EncryptionFailed(
            "empty recipient set".to_string(),
        ));
    }

    let plaintext = canonical_value(value)?;
    let mut content_key = random_bytes::<32>();
    let nonce = random_bytes::<NONCE_LEN>();
    let ciphertext = aead_encrypt(&content_key, &nonce, plaintext.as_bytes())?;

    // A static secret so one ephemeral key can run DH per recipient.
    let ephemeral = EncryptionKeyPair::generate();

    let mut entries = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let mut shared = ephemeral.diffie_hellman(recipient);
        let mut kek = kek_from_shared(&shared);
        let key_nonce = random_bytes::<NONCE_LEN>();
        let wrapped = aead_encrypt(&kek, &key_nonce, &content_key)?;
        shared.zeroize();
        kek.zeroize();

        let mut encrypted_key = Vec::with_capacity(NONCE_LEN + wrapped.len());
        encrypted_key.extend_from_slice(&key_nonce);
        encrypted_key.extend_from_slice(&wrapped);
        entries.push(RecipientEntry {
            key_hash: recipient.key_hash(),
            encrypted_key: hex::encode(encrypted_key),
        });
    }
    content_key.zeroize();

    Ok(Envelope {
        alg: ENVELOPE_ALG.to_string(),
        recipients: entries,
        ephemeral_public: ephemeral.public_key().to_hex(),
        nonce: hex::encode(nonce),
        ciphertext: hex::encode(ciphertext),
    })
}

/// Decrypt an envelope with the holder's X25519 keypair.
pub fn decrypt_value(envelope: &Envelope, keypair: &EncryptionKeyPair) -> Result<Value, CryptoError> {
    if envelope.alg != ENVELOPE_ALG {
        return Err(CryptoError::InvalidEnvelope(format!(
            "unknown algorithm {}",
            envelope.alg
        )));
    }

    let my_hash = keypair.public_key().key_hash();
    let entry = envelope
        .recipients
        .iter()
        .find(|r| r.key_hash == my_hash)
        .ok_or(CryptoError::NotARecipient)?;

    let ephemeral = X25519PublicKey::from_hex(&envelope.ephemeral_public)?;
    let mut shared = keypair.diffie_hellman(&ephemeral);
    let mut kek = kek_from_shared(&shared);
    shared.zeroize();

    let encrypted_key = hex::decode(&entry.encrypted_key)?;
    if encrypted_key.len() <= NONCE_LEN {
        return Err(CryptoError::InvalidEnvelope("truncated key wrap".to_string()));
    }
    let (key_nonce, wrapped) = encrypted_key.split_at(NONCE_LEN);
    let key_nonce: [u8; NONCE_LEN] = key_nonce.try_into().expect("split length");
    let content_key_vec = aead_decrypt(&kek, &key_nonce, wrapped)?;
    kek.zeroize();

    let mut content_key: [u8; 32] = content_key_vec
        .try_into()
        .map_err(|_| CryptoError::InvalidEnvelope("content key length".to_string()))?;

    let nonce_vec = hex::decode(&envelope.nonce)?;
    let nonce: [u8; NONCE_LEN] = nonce_vec
        .try_into()
        .map_err(|_| CryptoError::InvalidEnvelope("nonce length".to_string()))?;
    let ciphertext = hex::decode(&envelope.ciphertext)?;

    let plaintext = aead_decrypt(&content_key, &nonce, &ciphertext)?;
    content_key.zeroize();

    serde_json::from_slice(&plaintext)
        .map_err(|e| CryptoError::DecryptionFailed(format!("plaintext is not JSON: {e}")))
}

fn is_envelope(value: &Value) -> bool {
    value
        .get("alg")
        .and_then(Value::as_str)
        .is_some_and(|alg| alg == ENVELOPE_ALG)
}

/// Encrypt every `_`-prefixed field of a state object in place. Fields that
/// already carry an envelope are left untouched.
pub fn encrypt_state_fields(
    state: &mut Map<String, Value>,
    recipients: &[X25519PublicKey],
) -> Result<(), CryptoError> {
    let targets: Vec<String> = state
        .iter()
        .filter(|(k, v)| k.starts_with('_') && !is_envelope(v))
        .map(|(k, _)| k.clone())
        .collect();

    for key in targets {
        let plain = state.get(&key).cloned().expect("key listed above");
        let envelope = encrypt_value(&plain, recipients)?;
        let encoded = serde_json::to_value(&envelope)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        state.insert(key, encoded);
    }
    Ok(())
}

/// Decrypt every `_`-prefixed envelope field the holder can open. Fields for
/// other recipients are left encrypted.
pub fn decrypt_state_fields(
    state: &mut Map<String, Value>,
    keypair: &EncryptionKeyPair,
) -> Result<(), CryptoError> {
    let targets: Vec<String> = state
        .iter()
        .filter(|(k, v)| k.starts_with('_') && is_envelope(v))
        .map(|(k, _)| k.clone())
        .collect();

    for key in targets {
        let raw = state.get(&key).cloned().expect("key listed above");
        let envelope: Envelope = serde_json::from_value(raw)
            .map_err(|e| CryptoError::InvalidEnvelope(e.to_string()))?;
        match decrypt_value(&envelope, keypair) {
            Ok(plain) => {
                state.insert(key, plain);
            }
            Err(CryptoError::NotARecipient) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
