//! Audio decoding for WAV, MP3, FLAC and OGG Vorbis

use super::{resample_to_target, AudioFormat};
use crate::error::CoreError;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

/// Decoded audio data
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let mut mono = Vec::with_capacity(self.samples.len() / self.channels as usize);
        for chunk in self.samples.chunks(self.channels as usize) {
            let avg: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
            mono.push(avg);
        }
        mono
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Decode an audio file, downmix to mono and resample to `target_sample_rate`.
pub fn decode_audio(path: &Path, target_sample_rate: u32) -> Result<AudioData, CoreError> {
    let decode_err = |reason: String| CoreError::Decode {
        path: path.display().to_string(),
        reason,
    };

    if !path.exists() {
        return Err(decode_err("file not found".to_string()));
    }

    let format = AudioFormat::from_path(path);
    let mut audio = match format {
        AudioFormat::Wav => decode_wav(path).map_err(|e| decode_err(e.to_string()))?,
        AudioFormat::Mp3 => decode_mp3(path).map_err(|e| decode_err(e.to_string()))?,
        AudioFormat::Flac => decode_flac(path).map_err(|e| decode_err(e.to_string()))?,
        AudioFormat::Ogg => decode_ogg(path).map_err(|e| decode_err(e.to_string()))?,
        AudioFormat::Unknown => {
            return Err(decode_err("unsupported audio format".to_string()));
        }
    };

    if audio.sample_rate == 0 || audio.samples.is_empty() {
        return Err(decode_err("no decodable audio frames".to_string()));
    }

    if audio.channels > 1 {
        audio.samples = audio.to_mono();
        audio.channels = 1;
    }
    if audio.sample_rate != target_sample_rate {
        audio.samples = resample_to_target(&audio.samples, audio.sample_rate, target_sample_rate)
            .map_err(|e| decode_err(format!("resampling failed: {e}")))?;
        audio.sample_rate = target_sample_rate;
    }
    audio.duration_ms =
        (audio.samples.len() as f64 / audio.sample_rate as f64 * 1000.0).round() as u32;

    Ok(audio)
}

/// Decode with a wall-clock bound so one unreadable file cannot stall a
/// whole batch. The decode runs on a worker thread; on timeout the unit is
/// reported failed and the batch moves on.
pub fn decode_audio_with_timeout(
    path: &Path,
    target_sample_rate: u32,
    timeout: Duration,
) -> Result<AudioData, CoreError> {
    let (tx, rx) = mpsc::channel();
    let owned = path.to_path_buf();
    std::thread::spawn(move || {
        let result = decode_audio(&owned, target_sample_rate);
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(CoreError::DecodeTimeout {
            path: path.display().to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

fn decode_wav(path: &Path) -> anyhow::Result<AudioData> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(raw_audio(samples, sample_rate, channels))
}

fn decode_mp3(path: &Path) -> anyhow::Result<AudioData> {
    let data = std::fs::read(path)?;
    let mut decoder = minimp3::Decoder::new(&data[..]);
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                for &sample in &frame.data {
                    samples.push(sample as f32 / 32768.0);
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => anyhow::bail!("mp3 decode error: {e}"),
        }
    }

    Ok(raw_audio(samples, sample_rate, channels))
}

fn decode_flac(path: &Path) -> anyhow::Result<AudioData> {
    let mut reader = claxon::FlacReader::open(path)?;
    let info = reader.streaminfo();
    let sample_rate = info.sample_rate;
    let channels = info.channels as u16;
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;

    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(raw_audio(samples, sample_rate, channels))
}

fn decode_ogg(path: &Path) -> anyhow::Result<AudioData> {
    let file = std::fs::File::open(path)?;
    let mut reader = lewton::inside_ogg::OggStreamReader::new(file)?;
    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader.read_dec_packet_itl()? {
        for &sample in &packet {
            samples.push(sample as f32 / 32768.0);
        }
    }

    Ok(raw_audio(samples, sample_rate, channels))
}

fn raw_audio(samples: Vec<f32>, sample_rate: u32, channels: u16) -> AudioData {
    let duration_ms = if sample_rate > 0 && channels > 0 {
        (samples.len() as f64 / (sample_rate as u64 * channels as u64) as f64 * 1000.0) as u32
    } else {
        0
    };
    AudioData {
        samples,
        sample_rate,
        channels,
        duration_ms,
    }
}
