//! Mel filterbank and mel power spectrogram

/// Slaney-style mel scale
pub fn hz_to_mel(hz: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        let logstep = (6.4f32).ln() / 27.0;
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep
    }
}

pub fn mel_to_hz(mel: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        let logstep = (6.4f32).ln() / 27.0;
        MIN_LOG_HZ * ((mel - MIN_LOG_MEL) * logstep).exp()
    }
}

/// Triangular mel filterbank, `[n_mels][n_bins]`, area-normalized.
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let f_max = sample_rate as f32 / 2.0;

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(f_max);
    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32)
        .collect();
    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();

    let bin_freqs: Vec<f32> = (0..n_bins)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let mut filterbank = vec![vec![0.0f32; n_bins]; n_mels];
    for m in 0..n_mels {
        let (lower, center, upper) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
        // Slaney normalization keeps filter response roughly constant per band
        let norm = 2.0 / (upper - lower);
        for (k, &freq) in bin_freqs.iter().enumerate() {
            let weight = if freq <= lower || freq >= upper {
                0.0
            } else if freq <= center {
                (freq - lower) / (center - lower)
            } else {
                (upper - freq) / (upper - center)
            };
            filterbank[m][k] = weight * norm;
        }
    }
    filterbank
}

/// Apply a filterbank to per-frame magnitude spectra, producing a mel
/// power spectrogram `[frame][n_mels]`.
pub fn mel_spectrogram(magnitudes: &[Vec<f32>], filterbank: &[Vec<f32>]) -> Vec<Vec<f32>> {
    magnitudes
        .iter()
        .map(|frame| {
            filterbank
                .iter()
                .map(|filter| {
                    filter
                        .iter()
                        .zip(frame.iter())
                        .map(|(&w, &m)| w * m * m)
                        .sum()
                })
                .collect()
        })
        .collect()
}
