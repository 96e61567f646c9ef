//! Mel-frequency cepstral coefficients

/// Compute MFCCs from a mel power spectrogram, `[frame][n_mfcc]`.
///
/// Log-compressed mel energies through an orthonormal DCT-II; the
/// precomputed DCT matrix keeps repeated extraction cheap.
pub fn mfcc(mel_power: &[Vec<f32>], n_mfcc: usize) -> Vec<Vec<f32>> {
    if mel_power.is_empty() {
        return Vec::new();
    }
    let n_mels = mel_power[0].len();
    let dct = dct_matrix(n_mfcc, n_mels);

    mel_power
        .iter()
        .map(|frame| {
            let log_mel: Vec<f32> = frame.iter().map(|&p| (p.max(1e-10)).ln()).collect();
            dct.iter()
                .map(|row| row.iter().zip(log_mel.iter()).map(|(&d, &m)| d * m).sum())
                .collect()
        })
        .collect()
}

/// Orthonormal DCT-II matrix `[n_out][n_in]`
pub fn dct_matrix(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    use std::f32::consts::PI;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n_in as f32).sqrt()
            } else {
                (2.0 / n_in as f32).sqrt()
            };
            (0..n_in)
                .map(|n| scale * (PI / n_in as f32 * (n as f32 + 0.5) * k as f32).cos())
                .collect()
        })
        .collect()
}

/// First-order time derivative by central difference with replicated
/// edges, `[frame][coeff]`.
pub fn deltas(frames: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = frames.len();
    if n == 0 {
        return Vec::new();
    }
    let width = frames[0].len();
    (0..n)
        .map(|t| {
            let prev = &frames[t.saturating_sub(1)];
            let next = &frames[(t + 1).min(n - 1)];
            (0..width).map(|k| (next[k] - prev[k]) / 2.0).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dct_rows_are_orthonormal() {
        let dct = dct_matrix(8, 8);
        for i in 0..8 {
            for j in 0..8 {
                let dot: f32 = dct[i].iter().zip(dct[j].iter()).map(|(a, b)| a * b).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(dot, expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn mfcc_shape_matches_request() {
        let mel = vec![vec![1.0f32; 64]; 5];
        let coeffs = mfcc(&mel, 13);
        assert_eq!(coeffs.len(), 5);
        assert_eq!(coeffs[0].len(), 13);
    }

    #[test]
    fn constant_signal_has_zero_deltas() {
        let frames = vec![vec![3.0f32; 4]; 6];
        let d = deltas(&frames);
        assert!(d.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn linear_ramp_has_constant_delta() {
        let frames: Vec<Vec<f32>> = (0..5).map(|t| vec![t as f32]).collect();
        let d = deltas(&frames);
        // Interior frames see slope 1.0
        assert_abs_diff_eq!(d[2][0], 1.0, epsilon = 1e-6);
    }
}
