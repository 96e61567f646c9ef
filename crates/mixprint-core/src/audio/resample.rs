//! Resampling to the fixed analysis rate

use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample a mono buffer from `from_rate` to `to_rate`.
///
/// Identity when the rates already match.
pub fn resample_to_target(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let chunk_size = 4096;
    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        1.0,
        params,
        chunk_size,
        1,
    )?;

    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).ceil() as usize;
    let mut output = Vec::with_capacity(expected);
    let mut pos = 0;
    while pos < samples.len() {
        let needed = resampler.input_frames_next();
        if pos + needed <= samples.len() {
            let chunk = &samples[pos..pos + needed];
            let frames = resampler.process(&[chunk], None)?;
            output.extend_from_slice(&frames[0]);
            pos += needed;
        } else {
            let chunk = &samples[pos..];
            let frames = resampler.process_partial(Some(&[chunk]), None)?;
            output.extend_from_slice(&frames[0]);
            pos = samples.len();
        }
    }
    // Drain the resampler's internal delay line
    let tail = resampler.process_partial::<&[f32]>(None, None)?;
    output.extend_from_slice(&tail[0]);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_to_target(&samples, 22050, 22050).unwrap(), samples);
    }

    #[test]
    fn downsampling_halves_the_length() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (i as f32 / 44100.0 * 440.0 * std::f32::consts::TAU).sin())
            .collect();
        let out = resample_to_target(&samples, 44100, 22050).unwrap();
        let expected = samples.len() / 2;
        // Sinc transients add a small tail; length must be close
        assert!((out.len() as i64 - expected as i64).unsigned_abs() < 1024);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(resample_to_target(&[], 44100, 22050).unwrap().is_empty());
    }
}
