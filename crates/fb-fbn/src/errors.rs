//! FBN error types.

use thiserror::Error;

/// Errors from FBN parsing and URI handling.
#[derive(Debug, Error)]
pub enum FbnError {
    /// Input text was empty after trimming.
    #[error("Empty input")]
    EmptyInput,

    /// FBN text did not match the `type state [-> refs]` shape.
    #[error("Malformed FBN: {0}")]
    MalformedFbn(String),

    /// URI is not `fb://<64-hex>`.
    #[error("Malformed URI: {0}")]
    MalformedUri(String),

    /// Block construction failed.
    #[error(transparent)]
    Block(#[from] fb_types::BlockError),
}
