//! mixprint-store - Persistent descriptor cache
//!
//! An on-disk keyed container mapping `(category, track_id)` to a fixed
//! dimension descriptor vector. The file pins a single descriptor version,
//! supports single-key reads without loading the corpus, and appends are
//! checksummed so a crash mid-write never damages committed keys.

pub mod error;
pub mod format;
pub mod store;

pub use error::StoreError;
pub use format::{StoreHeader, FORMAT_VERSION, MAGIC};
pub use store::{FeatureStore, PutOutcome, StoredDescriptor};
