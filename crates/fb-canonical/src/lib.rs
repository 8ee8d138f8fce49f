//! # Canonical Encoding
//!
//! Deterministic JSON serialization and content hashing for FoodBlock.
//!
//! The identity of every block is `SHA-256(canonical(type, state, refs))`.
//! Two implementations in any language that follow the rules here produce
//! bit-identical bytes for the same logical block, which is what makes the
//! graph content-addressable across servers and SDKs.
//!
//! ## Rules (aligned with RFC 8785 where applicable)
//!
//! 1. Object keys sorted by code-point order at every nesting depth.
//! 2. No insignificant whitespace.
//! 3. Numbers per ECMAScript `Number::toString` (integers without `.0`,
//!    `-0` as `0`, exponent only outside the positional range).
//! 4. Strings normalized to Unicode NFC; short escapes plus `\uXXXX` for
//!    control characters.
//! 5. `null` values omitted from objects and arrays.
//! 6. Arrays inside `refs` are sorted (set semantics); arrays inside `state`
//!    preserve order (sequence semantics).
//! 7. Booleans as `true`/`false`.
//! 8. Top level renders as `{"refs":…,"state":…,"type":…}`.
//!
//! Correctness is pinned by the cross-language vector fixture in
//! `fixtures/vectors.json`; every implementation must reproduce every vector
//! hash exactly.

pub mod encoder;
pub mod errors;
pub mod hashing;
pub mod number;

pub use encoder::{canonical, canonical_value};
pub use errors::CanonicalError;
pub use hashing::{hash_block, sha256_hex};

#[cfg(test)]
mod fixture_tests;
