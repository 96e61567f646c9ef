//! Harmonic/percussive separation by median filtering
//!
//! Harmonic content is sustained along time, percussive content along
//! frequency. Median-filtering the magnitude spectrogram along each axis
//! and soft-masking keeps the harmonic component for chroma analysis.

const KERNEL: usize = 17;

/// Harmonic component of a magnitude spectrogram, same shape as the input.
pub fn harmonic_magnitudes(magnitudes: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let num_frames = magnitudes.len();
    if num_frames == 0 {
        return Vec::new();
    }
    let n_bins = magnitudes[0].len();
    let half = KERNEL / 2;

    // Median along time: enhances harmonics
    let mut harmonic = vec![vec![0.0f32; n_bins]; num_frames];
    let mut window = Vec::with_capacity(KERNEL);
    for k in 0..n_bins {
        for t in 0..num_frames {
            let lo = t.saturating_sub(half);
            let hi = (t + half + 1).min(num_frames);
            window.clear();
            window.extend((lo..hi).map(|ti| magnitudes[ti][k]));
            harmonic[t][k] = median(&mut window);
        }
    }

    // Median along frequency: enhances percussive transients
    let mut percussive = vec![vec![0.0f32; n_bins]; num_frames];
    for t in 0..num_frames {
        for k in 0..n_bins {
            let lo = k.saturating_sub(half);
            let hi = (k + half + 1).min(n_bins);
            window.clear();
            window.extend(magnitudes[t][lo..hi].iter().copied());
            percussive[t][k] = median(&mut window);
        }
    }

    // Soft Wiener-style mask, power 2
    (0..num_frames)
        .map(|t| {
            (0..n_bins)
                .map(|k| {
                    let h = harmonic[t][k] * harmonic[t][k];
                    let p = percussive[t][k] * percussive[t][k];
                    let mask = h / (h + p + 1e-10);
                    magnitudes[t][k] * mask
                })
                .collect()
        })
        .collect()
}

fn median(values: &mut Vec<f32>) -> f32 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustained_tone_survives_masking() {
        // One bin active across all frames: purely harmonic
        let mut mags = vec![vec![0.0f32; 64]; 32];
        for frame in mags.iter_mut() {
            frame[10] = 1.0;
        }
        let harmonic = harmonic_magnitudes(&mags);
        let kept: f32 = harmonic.iter().map(|f| f[10]).sum::<f32>() / 32.0;
        assert!(kept > 0.8, "sustained bin should survive, kept {kept}");
    }

    #[test]
    fn broadband_click_is_suppressed() {
        // One frame active across all bins: purely percussive
        let mut mags = vec![vec![0.0f32; 64]; 32];
        for v in mags[16].iter_mut() {
            *v = 1.0;
        }
        let harmonic = harmonic_magnitudes(&mags);
        let kept: f32 = harmonic[16].iter().sum::<f32>() / 64.0;
        assert!(kept < 0.2, "click frame should be masked out, kept {kept}");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(harmonic_magnitudes(&[]).is_empty());
    }
}
