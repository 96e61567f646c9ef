//! Recording segmentation
//!
//! A long recording is analyzed as a series of fixed-length, overlapping
//! windows. The plan is pure arithmetic over the recording duration so it
//! can be computed, logged and tested without touching the audio.

use serde::{Deserialize, Serialize};

use crate::audio::AudioData;
use crate::error::CoreError;

/// One planned analysis window, in seconds relative to the recording
/// start. `index` counts from the configured base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub index: usize,
    pub start_s: f64,
    pub end_s: f64,
}

impl Window {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Ordered set of analysis windows covering a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub windows: Vec<Window>,
    pub window_s: f64,
    pub overlap_fraction: f64,
}

impl SegmentPlan {
    /// Plan windows of length `window_s` over a recording of
    /// `duration_s`, with consecutive windows overlapping by
    /// `overlap_fraction` of their length.
    ///
    /// Window starts advance by `window_s * (1 - overlap_fraction)`.
    /// The final window is clamped to the recording end, so every window
    /// satisfies `start < end <= duration`. A zero-length recording
    /// yields an empty plan.
    pub fn plan(
        duration_s: f64,
        window_s: f64,
        overlap_fraction: f64,
        base_index: usize,
    ) -> Result<SegmentPlan, CoreError> {
        if window_s <= 0.0 || !window_s.is_finite() {
            return Err(CoreError::InvalidConfig(format!(
                "segment window must be positive, got {window_s}"
            )));
        }
        if !(0.0..1.0).contains(&overlap_fraction) {
            return Err(CoreError::InvalidConfig(format!(
                "overlap fraction must be in [0, 1), got {overlap_fraction}"
            )));
        }
        if duration_s < 0.0 || !duration_s.is_finite() {
            return Err(CoreError::InvalidConfig(format!(
                "recording duration must be non-negative, got {duration_s}"
            )));
        }

        let stride = window_s * (1.0 - overlap_fraction);
        let mut windows = Vec::new();
        let mut start = 0.0f64;
        let mut index = base_index;
        while start < duration_s {
            windows.push(Window {
                index,
                start_s: start,
                end_s: (start + window_s).min(duration_s),
            });
            index += 1;
            start = (index - base_index) as f64 * stride;
        }

        Ok(SegmentPlan {
            windows,
            window_s,
            overlap_fraction,
        })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Materialize per-window mono sample buffers from decoded audio.
pub fn slice_segments(audio: &AudioData, plan: &SegmentPlan) -> Vec<Vec<f32>> {
    let mono = audio.to_mono();
    let rate = audio.sample_rate as f64;
    plan.windows
        .iter()
        .map(|w| {
            let start = ((w.start_s * rate) as usize).min(mono.len());
            let end = ((w.end_s * rate) as usize).min(mono.len());
            mono[start..end].to_vec()
        })
        .collect()
}
