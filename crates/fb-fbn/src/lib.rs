//! # FoodBlock Natural-Language Entry
//!
//! `fb(text)` turns one sentence into a small linked batch of blocks: intent
//! detection over a closed set, value and alias extraction via vocabularies,
//! relation extraction into separate blocks with wired refs, and
//! dependency-ordered emission.
//!
//! The whole module is pure — no I/O, no clock — so every SDK port can run
//! the same inputs through the same tables and compare outputs. Confidence
//! constants are tunable policy, not protocol.
//!
//! Also hosts the FBN text form (`format`/`parse`) and `fb://` URIs backing
//! the human-interface endpoints.

pub mod entry;
pub mod errors;
pub mod extract;
pub mod fbn;
pub mod intent;
pub mod vocab;

pub use entry::{fb, FbResult};
pub use errors::FbnError;
pub use fbn::{explain, format_block, from_uri, parse_fbn, to_uri};
pub use intent::{Intent, IntentScore};
pub use vocab::builtin_vocabularies;
