//! Mixprint Core - Track Identification Library
//!
//! This crate identifies known reference tracks inside long recordings
//! (DJ mixes, broadcast logs) by comparing fixed-length numeric audio
//! descriptors with cosine similarity.

pub mod audio;
pub mod config;
pub mod corpus;
pub mod descriptor;
pub mod dsp;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod segment;

pub use config::{DescriptorProfile, FeatureConfig};
pub use corpus::{populate, FailedTrack, PopulationReport, TrackSource};
pub use descriptor::{Descriptor, FeatureExtractor};
pub use error::CoreError;
pub use matcher::{cosine_similarity, MatchResult, Matcher, Prediction, Reference};
pub use normalize::Scaling;
pub use pipeline::{identify, IdentifyConfig};
pub use segment::{slice_segments, SegmentPlan, Window};

/// Extract one descriptor from an audio file.
pub fn describe_file(
    path: &std::path::Path,
    extractor: &FeatureExtractor,
) -> Result<Descriptor, CoreError> {
    let audio = audio::decode_audio(path, extractor.config().sample_rate)?;
    extractor.extract(&audio.samples, audio.sample_rate)
}
