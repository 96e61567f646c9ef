//! Feature-extraction configuration
//!
//! All analysis constants live here. Anything that changes the descriptor
//! layout feeds into `descriptor_version()`, which is what the store and
//! the matching pipeline use to refuse cross-configuration comparisons.

use serde::{Deserialize, Serialize};

/// Closed set of descriptor layouts.
///
/// Selecting a profile picks which feature blocks are concatenated; there
/// is no runtime string dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorProfile {
    /// Timbral + harmonic + spectral shape + rhythm, the full stack
    Combined,
    /// Cepstral coefficients only (plus deltas when configured)
    Timbral,
    /// Pitch-class distribution plus tonal centroids
    Harmonic,
}

impl DescriptorProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorProfile::Combined => "combined",
            DescriptorProfile::Timbral => "timbral",
            DescriptorProfile::Harmonic => "harmonic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Fixed analysis sample rate; input is resampled to this
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_size: usize,
    pub n_mfcc: usize,
    pub n_mels: usize,
    /// 12 for semitone classes, 24 for quarter-tone resolution
    pub n_chroma: usize,
    /// Number of octave sub-bands for spectral contrast (yields bands + 1 values)
    pub contrast_bands: usize,
    /// Lower edge of the first contrast sub-band in Hz
    pub contrast_fmin: f32,
    /// Length of the fixed analysis sub-window in seconds; the descriptor
    /// is averaged over whole sub-windows only
    pub analysis_window_s: f64,
    /// Append first- and second-order MFCC time derivatives
    pub include_deltas: bool,
    /// Append per-bin STFT magnitude/phase mean and variance
    pub include_spectral_stats: bool,
    pub profile: DescriptorProfile,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            hop_size: 512,
            n_mfcc: 40,
            n_mels: 128,
            n_chroma: 12,
            contrast_bands: 6,
            contrast_fmin: 200.0,
            analysis_window_s: 60.0,
            include_deltas: false,
            include_spectral_stats: true,
            profile: DescriptorProfile::Combined,
        }
    }
}

impl FeatureConfig {
    /// Number of STFT frequency bins
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Samples per analysis sub-window
    pub fn window_samples(&self) -> usize {
        (self.analysis_window_s * self.sample_rate as f64) as usize
    }

    fn mfcc_block(&self) -> usize {
        if self.include_deltas {
            self.n_mfcc * 3
        } else {
            self.n_mfcc
        }
    }

    /// Total descriptor length for the configured profile
    pub fn descriptor_len(&self) -> usize {
        match self.profile {
            DescriptorProfile::Timbral => self.mfcc_block(),
            DescriptorProfile::Harmonic => self.n_chroma + 6,
            DescriptorProfile::Combined => {
                let mut len = self.mfcc_block()
                    + self.n_chroma
                    + self.n_mels
                    + (self.contrast_bands + 1)
                    + 6  // tonnetz
                    + 1; // tempo
                if self.include_spectral_stats {
                    len += 4 * self.n_bins();
                }
                len
            }
        }
    }

    /// Tag identifying the feature configuration that produced a
    /// descriptor. Two descriptors are comparable iff their tags match.
    pub fn descriptor_version(&self) -> String {
        let mut tag = format!(
            "{}-v1-sr{}-fft{}-hop{}-win{}",
            self.profile.as_str(),
            self.sample_rate,
            self.n_fft,
            self.hop_size,
            self.analysis_window_s,
        );
        match self.profile {
            DescriptorProfile::Timbral => {
                tag.push_str(&format!("-mfcc{}", self.n_mfcc));
            }
            DescriptorProfile::Harmonic => {
                tag.push_str(&format!("-chroma{}", self.n_chroma));
            }
            DescriptorProfile::Combined => {
                tag.push_str(&format!(
                    "-mfcc{}-mel{}-chroma{}-cb{}",
                    self.n_mfcc, self.n_mels, self.n_chroma, self.contrast_bands
                ));
                if self.include_spectral_stats {
                    tag.push_str("-stats");
                }
            }
        }
        if self.include_deltas && self.profile != DescriptorProfile::Harmonic {
            tag.push_str("-deltas");
        }
        tag
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sample_rate == 0 {
            anyhow::bail!("sample_rate must be > 0");
        }
        if self.n_fft == 0 || self.hop_size == 0 {
            anyhow::bail!("n_fft and hop_size must be > 0");
        }
        if self.hop_size > self.n_fft {
            anyhow::bail!("hop_size must not exceed n_fft");
        }
        if self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            anyhow::bail!("n_mfcc must be in 1..=n_mels");
        }
        if self.n_chroma == 0 || self.n_chroma % 12 != 0 {
            anyhow::bail!("n_chroma must be a positive multiple of 12");
        }
        if self.contrast_bands == 0 {
            anyhow::bail!("contrast_bands must be > 0");
        }
        if self.contrast_fmin <= 0.0 {
            anyhow::bail!("contrast_fmin must be > 0");
        }
        if self.analysis_window_s <= 0.0 {
            anyhow::bail!("analysis_window_s must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        FeatureConfig::default().validate().unwrap();
    }

    #[test]
    fn combined_descriptor_len_counts_every_block() {
        let config = FeatureConfig::default();
        // 40 mfcc + 12 chroma + 128 mel + 7 contrast + 6 tonnetz + 1 tempo
        // + 4 * 1025 stft stats
        assert_eq!(config.descriptor_len(), 40 + 12 + 128 + 7 + 6 + 1 + 4100);
    }

    #[test]
    fn profiles_have_distinct_version_tags() {
        let mut a = FeatureConfig::default();
        let mut b = FeatureConfig::default();
        a.profile = DescriptorProfile::Timbral;
        b.profile = DescriptorProfile::Harmonic;
        assert_ne!(a.descriptor_version(), b.descriptor_version());
        assert_ne!(
            a.descriptor_version(),
            FeatureConfig::default().descriptor_version()
        );
    }

    #[test]
    fn version_tag_tracks_dimension_changes() {
        let base = FeatureConfig::default();
        let mut wider = FeatureConfig::default();
        wider.n_mfcc = 30;
        assert_ne!(base.descriptor_version(), wider.descriptor_version());
    }

    #[test]
    fn rejects_oversized_hop() {
        let mut config = FeatureConfig::default();
        config.hop_size = config.n_fft + 1;
        assert!(config.validate().is_err());
    }
}
