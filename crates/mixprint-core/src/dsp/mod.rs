//! Signal-processing building blocks
//!
//! Everything operates on plain `Vec`-of-frames buffers so the pieces
//! compose without intermediate copies of the audio itself. The
//! descriptor layer decides which blocks to run and how to pool them.

pub mod chroma;
pub mod contrast;
pub mod hpss;
pub mod mel;
pub mod mfcc;
pub mod stft;
pub mod tempo;
pub mod tonnetz;

pub use chroma::chroma;
pub use contrast::spectral_contrast;
pub use hpss::harmonic_magnitudes;
pub use mel::{mel_filterbank, mel_spectrogram};
pub use mfcc::{deltas, mfcc};
pub use stft::{compute_stft, Stft};
pub use tempo::estimate_tempo;
pub use tonnetz::tonnetz;
