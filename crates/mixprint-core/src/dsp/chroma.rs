//! Pitch-class (chroma) energy distribution

use super::stft::bin_frequency;

/// Fold per-frame magnitude spectra into `n_chroma` pitch classes,
/// `[frame][n_chroma]`. Class 0 is C; 12 bins give semitone classes, 24
/// quarter-tone resolution. Each frame is max-normalized.
pub fn chroma(
    magnitudes: &[Vec<f32>],
    sample_rate: u32,
    n_fft: usize,
    n_chroma: usize,
) -> Vec<Vec<f32>> {
    let bins_per_semitone = n_chroma as f32 / 12.0;
    magnitudes
        .iter()
        .map(|frame| {
            let mut classes = vec![0.0f32; n_chroma];
            for (k, &mag) in frame.iter().enumerate().skip(1) {
                let freq = bin_frequency(k, n_fft, sample_rate);
                if freq < 27.5 {
                    // Below A0, no meaningful pitch content
                    continue;
                }
                let midi = 69.0 + 12.0 * (freq / 440.0).log2();
                let class =
                    (midi * bins_per_semitone).round().rem_euclid(n_chroma as f32) as usize;
                classes[class % n_chroma] += mag * mag;
            }
            let max = classes.iter().cloned().fold(0.0f32, f32::max);
            if max > 0.0 {
                for c in classes.iter_mut() {
                    *c /= max;
                }
            }
            classes
        })
        .collect()
}
