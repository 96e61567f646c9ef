//! Reference corpus population
//!
//! Walks a list of reference tracks, extracts one descriptor per track
//! and commits it to the feature store. Tracks already present are
//! skipped without decoding, so re-running over a grown collection only
//! pays for the new material. Per-track failures are collected, logged
//! and never abort the batch.

use std::path::PathBuf;
use std::time::Duration;

use rayon::prelude::*;

use crate::audio::decode_audio_with_timeout;
use crate::descriptor::FeatureExtractor;
use crate::error::CoreError;
use mixprint_store::{FeatureStore, PutOutcome};

/// One reference track to ingest.
#[derive(Debug, Clone)]
pub struct TrackSource {
    pub category: String,
    pub track_id: String,
    pub path: PathBuf,
}

/// A track the batch could not ingest, with the reason.
#[derive(Debug, Clone)]
pub struct FailedTrack {
    pub category: String,
    pub track_id: String,
    pub reason: String,
}

/// Outcome of one population run.
#[derive(Debug, Default)]
pub struct PopulationReport {
    pub stored: usize,
    pub already_present: usize,
    pub failed: Vec<FailedTrack>,
}

/// Populate `store` with descriptors for `sources`.
///
/// The store must have been created for the extractor's descriptor
/// version and dimension; anything else is fatal before any work runs.
/// Decoding and extraction fan out across tracks; commits happen in
/// input order so the store's enumeration order is reproducible.
pub fn populate(
    store: &FeatureStore,
    extractor: &FeatureExtractor,
    sources: &[TrackSource],
    decode_timeout: Duration,
) -> Result<PopulationReport, CoreError> {
    check_store_compat(store, extractor)?;

    let mut report = PopulationReport::default();

    let mut pending: Vec<&TrackSource> = Vec::new();
    for src in sources {
        if store.has(&src.category, &src.track_id) {
            log::debug!("skipping {}/{}: already stored", src.category, src.track_id);
            report.already_present += 1;
        } else {
            pending.push(src);
        }
    }
    log::info!(
        "populating corpus: {} new, {} already present",
        pending.len(),
        report.already_present
    );

    let sample_rate = extractor.config().sample_rate;
    let extracted: Vec<(usize, Result<Vec<f64>, CoreError>)> = pending
        .par_iter()
        .enumerate()
        .map(|(i, src)| {
            let result = decode_audio_with_timeout(&src.path, sample_rate, decode_timeout)
                .and_then(|audio| extractor.extract(&audio.samples, audio.sample_rate))
                .map(|d| d.values);
            (i, result)
        })
        .collect();

    let mut by_input: Vec<Option<Result<Vec<f64>, CoreError>>> =
        pending.iter().map(|_| None).collect();
    for (i, result) in extracted {
        by_input[i] = Some(result);
    }

    for (src, slot) in pending.iter().zip(by_input.into_iter()) {
        match slot {
            Some(Ok(values)) => match store.put(&src.category, &src.track_id, &values)? {
                PutOutcome::Stored => report.stored += 1,
                PutOutcome::AlreadyExists => report.already_present += 1,
            },
            Some(Err(e)) if e.is_per_unit() => {
                log::warn!("skipping {}/{}: {e}", src.category, src.track_id);
                report.failed.push(FailedTrack {
                    category: src.category.clone(),
                    track_id: src.track_id.clone(),
                    reason: e.to_string(),
                });
            }
            Some(Err(e)) => return Err(e),
            None => unreachable!("every pending track is extracted"),
        }
    }

    Ok(report)
}

/// Refuse to mix descriptor generations in one store.
pub fn check_store_compat(
    store: &FeatureStore,
    extractor: &FeatureExtractor,
) -> Result<(), CoreError> {
    if store.descriptor_version() != extractor.descriptor_version() {
        return Err(CoreError::VersionMismatch {
            expected: extractor.descriptor_version().to_string(),
            found: store.descriptor_version().to_string(),
        });
    }
    let dim = extractor.config().descriptor_len();
    if store.dim() != dim {
        return Err(CoreError::DimensionMismatch {
            expected: dim,
            got: store.dim(),
        });
    }
    Ok(())
}
