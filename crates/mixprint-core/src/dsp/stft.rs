//! Short-time Fourier transform

use crate::error::CoreError;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Complex short-time spectrum, one row per frame
#[derive(Debug, Clone)]
pub struct Stft {
    /// [time_frame][frequency_bin], `n_fft / 2 + 1` bins per frame
    pub frames: Vec<Vec<Complex<f32>>>,
    pub n_bins: usize,
}

impl Stft {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Per-frame magnitude spectrum
    pub fn magnitudes(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Per-frame phase spectrum in radians
    pub fn phases(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.arg()).collect())
            .collect()
    }
}

/// Compute the STFT with a Hann window.
///
/// Only whole frames are analyzed; the trailing remainder shorter than one
/// frame is discarded. A buffer shorter than one frame is an
/// `InsufficientData` error, never an empty spectrogram.
pub fn compute_stft(samples: &[f32], n_fft: usize, hop_size: usize) -> Result<Stft, CoreError> {
    if samples.len() < n_fft {
        return Err(CoreError::InsufficientData {
            needed: n_fft,
            got: samples.len(),
        });
    }

    let num_frames = 1 + (samples.len() - n_fft) / hop_size;
    let n_bins = n_fft / 2 + 1;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann_window(n_fft);

    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); n_fft];
    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(samples[start + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..n_bins].to_vec());
    }

    Ok(Stft { frames, n_bins })
}

/// Hann window of the given size
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

/// Center frequency in Hz of an STFT bin
pub fn bin_frequency(bin: usize, n_fft: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / n_fft as f32
}
