//! Store error taxonomy

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a descriptor store: bad magic bytes")]
    BadMagic,

    #[error("unsupported store format version {0}")]
    UnsupportedVersion(u16),

    #[error("store corrupt at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    #[error("descriptor not found: {category}/{track_id}")]
    NotFound { category: String, track_id: String },

    #[error("descriptor dimension mismatch: store holds {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("descriptor version mismatch: store holds {expected:?}, got {found:?}")]
    VersionMismatch { expected: String, found: String },
}
