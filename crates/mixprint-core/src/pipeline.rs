//! End-to-end identification of a long recording
//!
//! Decode, segment, extract per-segment descriptors in parallel, fit the
//! scaling on the stored reference corpus, then match every segment
//! against the normalized references. The reference snapshot is taken
//! once at the start of the run; tracks stored afterwards are picked up
//! by the next run.

use std::path::Path;

use rayon::prelude::*;

use crate::audio::decode_audio;
use crate::corpus::check_store_compat;
use crate::descriptor::FeatureExtractor;
use crate::error::CoreError;
use crate::matcher::{Matcher, Prediction, Reference};
use crate::normalize::Scaling;
use crate::segment::{slice_segments, SegmentPlan};
use mixprint_store::FeatureStore;

/// Segmentation parameters for one identification run.
#[derive(Debug, Clone)]
pub struct IdentifyConfig {
    /// Segment length in seconds
    pub window_s: f64,
    /// Fraction of each segment shared with its successor, in [0, 1)
    pub overlap_fraction: f64,
    /// Index assigned to the first segment
    pub base_index: usize,
    /// Ranked candidates per segment; 1 keeps predictions winner-only
    pub top_k: usize,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            window_s: 90.0,
            overlap_fraction: 20.0 / 90.0,
            base_index: 1,
            top_k: 1,
        }
    }
}

/// Identify the tracks playing in `recording`, one prediction per
/// planned segment, in segment order.
///
/// An empty store is not an error: every segment comes back without a
/// match. Per-segment extraction failures (too short, undefined tempo)
/// are logged and produce no-match predictions; version or dimension
/// disagreement with the store aborts the run.
pub fn identify(
    store: &FeatureStore,
    extractor: &FeatureExtractor,
    recording: &Path,
    config: &IdentifyConfig,
) -> Result<Vec<Prediction>, CoreError> {
    check_store_compat(store, extractor)?;

    let audio = decode_audio(recording, extractor.config().sample_rate)?;
    log::info!(
        "decoded {}: {:.1}s at {} Hz",
        recording.display(),
        audio.duration_s(),
        audio.sample_rate
    );

    let plan = SegmentPlan::plan(
        audio.duration_s(),
        config.window_s,
        config.overlap_fraction,
        config.base_index,
    )?;
    log::info!(
        "planned {} segments of {:.0}s, overlap {:.2}",
        plan.len(),
        config.window_s,
        config.overlap_fraction
    );
    if plan.is_empty() {
        return Ok(Vec::new());
    }

    let segments = slice_segments(&audio, &plan);
    let sample_rate = audio.sample_rate;
    let raw_queries: Vec<Option<Vec<f64>>> = segments
        .par_iter()
        .zip(plan.windows.par_iter())
        .map(|(samples, window)| {
            match extractor.extract(samples, sample_rate) {
                Ok(d) => Some(d.values),
                Err(e) if e.is_per_unit() => {
                    log::warn!("segment {}: {e}", window.index);
                    None
                }
                Err(e) => {
                    log::error!("segment {}: {e}", window.index);
                    None
                }
            }
        })
        .collect();

    let stored = store.iter_all()?;
    if stored.is_empty() {
        log::warn!("reference store is empty, nothing can match");
        let matcher = Matcher::new(Vec::new())?;
        return matcher.match_segments(&plan.windows, &raw_queries, config.top_k);
    }

    let reference_values: Vec<&[f64]> = stored.iter().map(|d| d.values.as_slice()).collect();
    let scaling = Scaling::fit(&reference_values)?;

    let references = stored
        .iter()
        .map(|d| {
            Ok(Reference {
                category: d.category.clone(),
                track_id: d.track_id.clone(),
                values: scaling.apply(&d.values)?,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;
    let matcher = Matcher::new(references)?;

    let queries = raw_queries
        .into_iter()
        .map(|q| q.map(|values| scaling.apply(&values)).transpose())
        .collect::<Result<Vec<_>, CoreError>>()?;

    matcher.match_segments(&plan.windows, &queries, config.top_k)
}
