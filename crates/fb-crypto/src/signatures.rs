//! Wrapper-level signing and verification.
//!
//! The signature covers the canonical form of the inner block, so any
//! mutation of `type`, `state`, or `refs` invalidates it, and two wrappers
//! around the same logical block verify identically regardless of the JSON
//! the client happened to send.

use crate::keys::{Ed25519PublicKey, Ed25519Signature, SigningKeyPair};
use crate::CryptoError;
use fb_types::{Block, Hash, SignedWrapper, PROTOCOL_VERSION};

/// Wrap and sign a block on behalf of the actor identified by `author_hash`.
pub fn sign_block(
    block: &Block,
    author_hash: Hash,
    keypair: &SigningKeyPair,
) -> Result<SignedWrapper, CryptoError> {
    let payload = block.canonical()?;
    let signature = keypair.sign(payload.as_bytes());
    Ok(SignedWrapper {
        foodblock: block.clone(),
        author_hash,
        signature: signature.to_hex(),
        protocol_version: PROTOCOL_VERSION.to_string(),
    })
}

/// Verify a wrapper against the author's published signing key.
pub fn verify_wrapper(
    wrapper: &SignedWrapper,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let payload = wrapper.foodblock.canonical()?;
    let signature = Ed25519Signature::from_hex(&wrapper.signature)?;
    public_key.verify(payload.as_bytes(), &signature)
}
