//! Tempo estimation from an onset envelope
//!
//! Spectral flux over the mel spectrogram gives an onset strength
//! envelope; picked peaks are beat events and the tempo is the median
//! inter-beat interval. Fewer than two events means the tempo is
//! undefined and extraction of rhythm features must fail.

use crate::error::CoreError;

/// Minimum gap between beat events in seconds
const MIN_BEAT_GAP_S: f64 = 0.1;

/// Envelope floor below which a peak is numeric noise, not an onset
const MIN_ONSET_STRENGTH: f32 = 1.0;

/// Onset strength: per-frame sum of positive log-energy flux
pub fn onset_envelope(mel_power: &[Vec<f32>]) -> Vec<f32> {
    let mut envelope = Vec::with_capacity(mel_power.len());
    envelope.push(0.0);
    for t in 1..mel_power.len() {
        let flux: f32 = mel_power[t]
            .iter()
            .zip(mel_power[t - 1].iter())
            .map(|(&cur, &prev)| {
                let d = (cur.max(1e-10)).ln() - (prev.max(1e-10)).ln();
                d.max(0.0)
            })
            .sum();
        envelope.push(flux);
    }
    envelope
}

/// Pick beat events: local envelope maxima above mean + one standard
/// deviation (floored so numeric noise never qualifies), separated by a
/// refractory gap. Returns frame indices.
pub fn detect_beats(envelope: &[f32], sample_rate: u32, hop_size: usize) -> Vec<usize> {
    if envelope.len() < 3 {
        return Vec::new();
    }
    let n = envelope.len() as f32;
    let mean: f32 = envelope.iter().sum::<f32>() / n;
    let var: f32 = envelope.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let threshold = (mean + var.sqrt()).max(MIN_ONSET_STRENGTH);

    let min_gap = ((MIN_BEAT_GAP_S * sample_rate as f64) / hop_size as f64).ceil() as usize;
    let mut beats: Vec<usize> = Vec::new();
    for t in 1..envelope.len() - 1 {
        if envelope[t] > threshold
            && envelope[t] >= envelope[t - 1]
            && envelope[t] > envelope[t + 1]
        {
            if let Some(&last) = beats.last() {
                if t - last < min_gap {
                    continue;
                }
            }
            beats.push(t);
        }
    }
    beats
}

/// Estimated tempo in beats per minute from the median inter-beat
/// interval.
pub fn estimate_tempo(
    mel_power: &[Vec<f32>],
    sample_rate: u32,
    hop_size: usize,
) -> Result<f32, CoreError> {
    let envelope = onset_envelope(mel_power);
    let beats = detect_beats(&envelope, sample_rate, hop_size);
    if beats.len() < 2 {
        return Err(CoreError::TooFewBeats { got: beats.len() });
    }

    let mut intervals: Vec<usize> = beats.windows(2).map(|w| w[1] - w[0]).collect();
    intervals.sort_unstable();
    let median_frames = intervals[intervals.len() / 2] as f64;
    let seconds = median_frames * hop_size as f64 / sample_rate as f64;
    Ok((60.0 / seconds) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::dsp::mel::{mel_filterbank, mel_spectrogram};
    use crate::dsp::stft::compute_stft;

    fn click_train(bpm: f64, sample_rate: u32, seconds: f64) -> Vec<f32> {
        let total = (seconds * sample_rate as f64) as usize;
        let period = (60.0 / bpm * sample_rate as f64) as usize;
        let mut samples = vec![0.0f32; total];
        let mut pos = 0;
        while pos < total {
            for i in 0..256.min(total - pos) {
                // Short noisy burst so the click has broadband energy
                samples[pos + i] = (1.0 - i as f32 / 256.0) * if i % 2 == 0 { 1.0 } else { -1.0 };
            }
            pos += period;
        }
        samples
    }

    fn mel_frames(samples: &[f32], config: &FeatureConfig) -> Vec<Vec<f32>> {
        let stft = compute_stft(samples, config.n_fft, config.hop_size).unwrap();
        let fb = mel_filterbank(config.sample_rate, config.n_fft, config.n_mels);
        mel_spectrogram(&stft.magnitudes(), &fb)
    }

    #[test]
    fn click_train_tempo_is_recovered() {
        let config = FeatureConfig::default();
        let samples = click_train(120.0, config.sample_rate, 10.0);
        let mel = mel_frames(&samples, &config);
        let bpm = estimate_tempo(&mel, config.sample_rate, config.hop_size).unwrap();
        assert!(
            (bpm - 120.0).abs() < 10.0,
            "expected ~120 bpm, got {bpm}"
        );
    }

    #[test]
    fn silence_has_no_beats() {
        let config = FeatureConfig::default();
        let samples = vec![0.0f32; config.sample_rate as usize * 5];
        let mel = mel_frames(&samples, &config);
        let err = estimate_tempo(&mel, config.sample_rate, config.hop_size).unwrap_err();
        assert!(matches!(err, CoreError::TooFewBeats { .. }));
    }

    #[test]
    fn steady_tone_has_undefined_tempo() {
        let config = FeatureConfig::default();
        let samples: Vec<f32> = (0..config.sample_rate as usize * 5)
            .map(|i| (i as f32 / config.sample_rate as f32 * 440.0 * std::f32::consts::TAU).sin())
            .collect();
        let mel = mel_frames(&samples, &config);
        assert!(estimate_tempo(&mel, config.sample_rate, config.hop_size).is_err());
    }
}
