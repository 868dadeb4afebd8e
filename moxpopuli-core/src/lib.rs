//! Heuristic JSON schema inference: observe payloads, infer a schema.
//!
//! `derive` builds a one-sample schema from a single value,
//! `merge`/`merge_many` fold observations into an accumulator, and
//! `datagen` runs the process in reverse to synthesize fixtures from
//! an inferred schema.

pub mod datagen;
pub mod derive;
pub mod error;
pub mod format;
pub mod jsontype;
pub mod merge;
pub mod postprocess;
pub mod redact;
pub mod schema;
pub mod timestring;

pub use derive::derive;
pub use error::{MoxError, Result};
pub use merge::{merge, merge_many, merge_one, MergeOutput};
pub use schema::Schema;

use std::sync::OnceLock;

static SALT: OnceLock<Vec<u8>> = OnceLock::new();

/// Process-wide salt used by the sensitivity classifier's
/// `unsafe_variable_hash` surrogate. Read once from `MOXPOPULI_SALT`
/// (taken as raw bytes of the env value) on first use, or generated
/// from 32 bytes of OS randomness if unset. Callers that need
/// reproducible redaction across runs should set `MOXPOPULI_SALT`
/// explicitly.
pub fn sensitivity_salt() -> &'static [u8] {
    SALT.get_or_init(|| match std::env::var("MOXPOPULI_SALT") {
        Ok(v) => v.into_bytes(),
        Err(_) => {
            let mut bytes = vec![0u8; 32];
            rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
            bytes
        }
    })
    .as_slice()
}
