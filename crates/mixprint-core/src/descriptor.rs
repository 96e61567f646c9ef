//! Descriptor extraction
//!
//! A descriptor is one fixed-length numeric vector summarizing a stretch
//! of audio. The input is cut into whole `analysis_window_s` sub-windows
//! (the remainder is discarded, never padded), each sub-window yields the
//! concatenated feature blocks of the configured profile, and the final
//! descriptor is the element-wise mean across sub-windows. The whole path
//! is deterministic: the same buffer and config always produce the same
//! vector.

use crate::audio::resample_to_target;
use crate::config::{DescriptorProfile, FeatureConfig};
use crate::dsp;
use crate::error::CoreError;

/// A fixed-length feature vector plus the version tag of the
/// configuration that produced it. Vectors with different tags are
/// never comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub values: Vec<f64>,
    pub version: String,
}

impl Descriptor {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct FeatureExtractor {
    config: FeatureConfig,
    filterbank: Vec<Vec<f32>>,
    version: String,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self, CoreError> {
        config
            .validate()
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        let filterbank = dsp::mel_filterbank(config.sample_rate, config.n_fft, config.n_mels);
        let version = config.descriptor_version();
        Ok(Self {
            config,
            filterbank,
            version,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn descriptor_version(&self) -> &str {
        &self.version
    }

    /// Extract a descriptor from a mono buffer at `sample_rate`.
    ///
    /// Fails with `InsufficientData` when the buffer does not cover one
    /// whole analysis sub-window at the analysis rate.
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<Descriptor, CoreError> {
        let resampled;
        let samples = if sample_rate == self.config.sample_rate {
            samples
        } else {
            resampled = resample_to_target(samples, sample_rate, self.config.sample_rate)
                .map_err(|e| CoreError::InvalidConfig(format!("resampler: {e}")))?;
            &resampled
        };

        let window = self.config.window_samples();
        let num_windows = samples.len() / window;
        if num_windows == 0 {
            return Err(CoreError::InsufficientData {
                needed: window,
                got: samples.len(),
            });
        }

        let dim = self.config.descriptor_len();
        let mut acc = vec![0.0f64; dim];
        for w in 0..num_windows {
            let chunk = &samples[w * window..(w + 1) * window];
            let vector = self.window_vector(chunk)?;
            debug_assert_eq!(vector.len(), dim);
            for (a, v) in acc.iter_mut().zip(vector.iter()) {
                *a += v;
            }
        }
        for a in acc.iter_mut() {
            *a /= num_windows as f64;
        }

        Ok(Descriptor {
            values: acc,
            version: self.version.clone(),
        })
    }

    /// Feature vector for one analysis sub-window.
    fn window_vector(&self, samples: &[f32]) -> Result<Vec<f64>, CoreError> {
        let cfg = &self.config;
        let stft = dsp::compute_stft(samples, cfg.n_fft, cfg.hop_size)?;
        let magnitudes = stft.magnitudes();

        let mut out: Vec<f64> = Vec::with_capacity(cfg.descriptor_len());
        match cfg.profile {
            DescriptorProfile::Timbral => {
                self.push_mfcc_block(&magnitudes, &mut out);
            }
            DescriptorProfile::Harmonic => {
                self.push_harmonic_block(&magnitudes, &mut out);
            }
            DescriptorProfile::Combined => {
                let mel_power = dsp::mel_spectrogram(&magnitudes, &self.filterbank);
                self.push_mfcc_block(&magnitudes, &mut out);
                push_means(
                    &dsp::chroma(&magnitudes, cfg.sample_rate, cfg.n_fft, cfg.n_chroma),
                    &mut out,
                );
                push_means(&mel_power, &mut out);
                push_means(
                    &dsp::spectral_contrast(
                        &magnitudes,
                        cfg.sample_rate,
                        cfg.n_fft,
                        cfg.contrast_fmin,
                        cfg.contrast_bands,
                    ),
                    &mut out,
                );
                self.push_tonnetz_block(&magnitudes, &mut out);
                let bpm = dsp::estimate_tempo(&mel_power, cfg.sample_rate, cfg.hop_size)?;
                out.push(bpm as f64);
                if cfg.include_spectral_stats {
                    push_mean_var(&magnitudes, &mut out);
                    push_mean_var(&stft.phases(), &mut out);
                }
            }
        }
        Ok(out)
    }

    fn push_mfcc_block(&self, magnitudes: &[Vec<f32>], out: &mut Vec<f64>) {
        let mel_power = dsp::mel_spectrogram(magnitudes, &self.filterbank);
        let coeffs = dsp::mfcc(&mel_power, self.config.n_mfcc);
        push_means(&coeffs, out);
        if self.config.include_deltas {
            let d1 = dsp::deltas(&coeffs);
            let d2 = dsp::deltas(&d1);
            push_means(&d1, out);
            push_means(&d2, out);
        }
    }

    fn push_harmonic_block(&self, magnitudes: &[Vec<f32>], out: &mut Vec<f64>) {
        let cfg = &self.config;
        let chroma = dsp::chroma(magnitudes, cfg.sample_rate, cfg.n_fft, cfg.n_chroma);
        push_means(&chroma, out);
        self.push_tonnetz_block(magnitudes, out);
    }

    /// Tonal centroids over the harmonic component only, so percussive
    /// transients do not smear the pitch-class distribution.
    fn push_tonnetz_block(&self, magnitudes: &[Vec<f32>], out: &mut Vec<f64>) {
        let cfg = &self.config;
        let harmonic = dsp::harmonic_magnitudes(magnitudes);
        let chroma = dsp::chroma(&harmonic, cfg.sample_rate, cfg.n_fft, cfg.n_chroma);
        push_means(&dsp::tonnetz(&chroma), out);
    }
}

/// Append the per-column time mean of a frame matrix.
fn push_means(frames: &[Vec<f32>], out: &mut Vec<f64>) {
    if frames.is_empty() {
        return;
    }
    let n = frames.len() as f64;
    for col in 0..frames[0].len() {
        let sum: f64 = frames.iter().map(|f| f[col] as f64).sum();
        out.push(sum / n);
    }
}

/// Append per-column mean followed by per-column variance.
fn push_mean_var(frames: &[Vec<f32>], out: &mut Vec<f64>) {
    if frames.is_empty() {
        return;
    }
    let n = frames.len() as f64;
    let width = frames[0].len();
    let start = out.len();
    for col in 0..width {
        let sum: f64 = frames.iter().map(|f| f[col] as f64).sum();
        out.push(sum / n);
    }
    for col in 0..width {
        let mean = out[start + col];
        let var: f64 = frames
            .iter()
            .map(|f| {
                let d = f[col] as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        out.push(var);
    }
}
