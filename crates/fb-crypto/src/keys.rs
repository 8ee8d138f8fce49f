//! Key material: Ed25519 for signing, X25519 for encryption.
//!
//! The two families are independent; an actor publishes one public key of
//! each on its actor block.

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};
use zeroize::Zeroize;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes, validating the curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from a 64-char hex string, as published on actor blocks.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = hex::decode(hex_str)
            .map_err(|_| CryptoError::InvalidPublicKey)?
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex rendering for publication in `state`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse the hex form carried on wrappers.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes: [u8; 64] = hex::decode(hex_str)
            .map_err(|_| CryptoError::InvalidSignatureFormat)?
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Hex rendering for wrappers.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Ed25519 keypair for signing blocks.
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Create from a hex-encoded seed, as carried in configuration.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let seed: [u8; 32] = hex::decode(hex_str)
            .map_err(|_| CryptoError::InvalidPrivateKey)?
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_seed(seed))
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic, no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Drop for SigningKeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// X25519 public key (32 bytes). Recipients are addressed by
/// `SHA-256(public_key)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct X25519PublicKey([u8; 32]);

impl X25519PublicKey {
    /// Create from bytes. Any 32 bytes are a valid Montgomery point.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a 64-char hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = hex::decode(hex_str)
            .map_err(|_| CryptoError::InvalidPublicKey)?
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex rendering for publication in `state`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The recipient locator: SHA-256 of the public key, lowercase hex.
    pub fn key_hash(&self) -> String {
        fb_canonical::sha256_hex(&self.0)
    }
}

/// X25519 keypair for envelope encryption.
///
/// Backed by a static secret so one secret can run Diffie-Hellman against
/// every recipient in a multi-recipient envelope.
pub struct EncryptionKeyPair {
    secret: StaticSecret,
}

impl EncryptionKeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(rand::thread_rng()),
        }
    }

    /// Create from secret bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(bytes),
        }
    }

    /// Get public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(XPublicKey::from(&self.secret).to_bytes())
    }

    /// Run X25519 against a peer public key; returns the raw shared secret.
    pub fn diffie_hellman(&self, their_public: &X25519PublicKey) -> [u8; 32] {
        let peer = XPublicKey::from(*their_public.as_bytes());
        self.secret.diffie_hellman(&peer).to_bytes()
    }

    /// Get secret bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = SigningKeyPair::generate();
        let message = b"canonical block bytes";

        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = SigningKeyPair::generate();
        let signature = keypair.sign(b"message1");
        assert!(keypair.public_key().verify(b"message2", &signature).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = SigningKeyPair::generate();
        let keypair2 = SigningKeyPair::generate();
        let signature = keypair1.sign(b"test");
        assert!(keypair2.public_key().verify(b"test", &signature).is_err());
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let keypair = SigningKeyPair::generate();
        let signature = keypair.sign(b"payload");
        let restored = Ed25519Signature::from_hex(&signature.to_hex()).unwrap();
        assert_eq!(signature, restored);
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let keypair = SigningKeyPair::generate();
        let pk = keypair.public_key();
        let restored = Ed25519PublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, restored);
    }

    #[test]
    fn test_seed_roundtrip() {
        let original = SigningKeyPair::generate();
        let restored = SigningKeyPair::from_seed(original.to_seed());
        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_x25519_agreement() {
        let alice = EncryptionKeyPair::generate();
        let bob = EncryptionKeyPair::generate();

        let ab = alice.diffie_hellman(&bob.public_key());
        let ba = bob.diffie_hellman(&alice.public_key());
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_key_hash_is_64_hex() {
        let pair = EncryptionKeyPair::generate();
        let kh = pair.public_key().key_hash();
        assert_eq!(kh.len(), 64);
    }

    #[test]
    fn test_signing_and_encryption_keys_independent() {
        let signing = SigningKeyPair::generate();
        let encryption = EncryptionKeyPair::generate();
        assert_ne!(
            signing.public_key().as_bytes(),
            encryption.public_key().as_bytes()
        );
    }
}
