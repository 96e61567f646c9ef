//! Spectral contrast across octave sub-bands

use super::stft::bin_frequency;

/// Per-frame spectral contrast, `[frame][n_bands + 1]`.
///
/// The spectrum is split into a sub-`fmin` region followed by `n_bands`
/// octave-wide bands; each value is the log ratio of the band's peak
/// energy to its valley energy (mean of the top and bottom quantile).
pub fn spectral_contrast(
    magnitudes: &[Vec<f32>],
    sample_rate: u32,
    n_fft: usize,
    fmin: f32,
    n_bands: usize,
) -> Vec<Vec<f32>> {
    const QUANTILE: f32 = 0.02;

    // Band edges: [0, fmin, 2*fmin, 4*fmin, ...]
    let mut edges = Vec::with_capacity(n_bands + 2);
    edges.push(0.0f32);
    for b in 0..=n_bands {
        edges.push(fmin * (1 << b) as f32);
    }

    magnitudes
        .iter()
        .map(|frame| {
            (0..n_bands + 1)
                .map(|band| {
                    let lo = edges[band];
                    let hi = edges[band + 1];
                    let mut band_mags: Vec<f32> = frame
                        .iter()
                        .enumerate()
                        .filter(|(k, _)| {
                            let f = bin_frequency(*k, n_fft, sample_rate);
                            f >= lo && f < hi
                        })
                        .map(|(_, &m)| m)
                        .collect();
                    if band_mags.is_empty() {
                        return 0.0;
                    }
                    band_mags.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    let take = ((band_mags.len() as f32 * QUANTILE) as usize).max(1);
                    let valley: f32 =
                        band_mags[..take].iter().sum::<f32>() / take as f32;
                    let peak: f32 =
                        band_mags[band_mags.len() - take..].iter().sum::<f32>() / take as f32;
                    (peak + 1e-10).ln() - (valley + 1e-10).ln()
                })
                .collect()
        })
        .collect()
}
