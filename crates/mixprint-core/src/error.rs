//! Core error taxonomy
//!
//! Per-unit failures (one track, one segment) are recoverable: batch
//! callers log them and continue. Run-level invariant violations
//! (dimension or version mismatch, store corruption) are fatal and abort
//! before any undefined numeric behavior.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("decoding {path} exceeded {seconds}s")]
    DecodeTimeout { path: String, seconds: u64 },

    #[error("insufficient audio data: need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("too few beat events for tempo estimation: got {got}, need 2")]
    TooFewBeats { got: usize },

    #[error("descriptor dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("descriptor version mismatch: expected {expected:?}, found {found:?}")]
    VersionMismatch { expected: String, found: String },

    #[error("no reference descriptors available")]
    EmptyCorpus,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] mixprint_store::StoreError),
}

impl CoreError {
    /// Whether this failure is local to one unit of work (skip and
    /// continue) rather than fatal for the whole run.
    pub fn is_per_unit(&self) -> bool {
        matches!(
            self,
            CoreError::Decode { .. }
                | CoreError::DecodeTimeout { .. }
                | CoreError::InsufficientData { .. }
                | CoreError::TooFewBeats { .. }
        )
    }
}
