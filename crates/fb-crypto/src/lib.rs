//! # FoodBlock Crypto
//!
//! Signing and envelope encryption for the protocol.
//!
//! Two independent key families:
//!
//! - **Ed25519** signs the canonical form of a block; the signature travels
//!   in the wrapper, outside the hash.
//! - **X25519 + AES-256-GCM** encrypts `_`-prefixed state fields for a fixed
//!   recipient set; the envelope lives inside `state`, so the recipient set
//!   is part of the block identity.
//!
//! Private keys never appear in blocks. Secret material is zeroized on drop.

pub mod envelope;
pub mod errors;
pub mod keys;
pub mod master_key;
pub mod signatures;

pub use envelope::{
    decrypt_state_fields, decrypt_value, encrypt_state_fields, encrypt_value, Envelope,
    RecipientEntry, ENVELOPE_ALG,
};
pub use errors::CryptoError;
pub use keys::{
    Ed25519PublicKey, Ed25519Signature, EncryptionKeyPair, SigningKeyPair, X25519PublicKey,
};
pub use signatures::{sign_block, verify_wrapper};
