//! Error types (spec §7).
//!
//! Grounded on the `thiserror` enum pattern used throughout
//! `ynishi-apifuzz` (e.g. `apifuzz-core/src/lib.rs`'s `ConfigError`).

/// Everything this crate can fail with.
#[derive(Debug, thiserror::Error)]
pub enum MoxError {
    /// A payload could not be decoded as JSON, or decoded to a value
    /// `derive` cannot build a schema from (e.g. a bare top-level
    /// `null`).
    #[error("invalid payload at input #{index}: {source}")]
    InvalidPayload {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// An iterator feeding `merge_many` yielded an error mid-stream.
    #[error("payload iterator failed: {0}")]
    IteratorFailed(String),

    /// An internal invariant was violated. Reaching this means a bug
    /// in this crate, not bad input.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, MoxError>;

/// Panics in debug builds, returns `Err(MoxError::Invariant(..))`
/// in release — mirrors the Go reference's liberal use of `panic`
/// for "this should never happen" conditions, without taking down
/// a long-running merge over an assertion that release builds trust.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            let msg = format!($($arg)*);
            if cfg!(debug_assertions) {
                panic!("invariant violated: {msg}");
            }
            return Err($crate::error::MoxError::Invariant(msg));
        }
    };
}
