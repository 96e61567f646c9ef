//! End-to-end identification over a synthetic corpus
//!
//! Three reference tracks with distinct spectra, a mix assembled by
//! concatenating them, and a run of the full decode/segment/extract/
//! normalize/match pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mixprint_core::{
    describe_file, identify, populate, DescriptorProfile, FeatureConfig, FeatureExtractor,
    IdentifyConfig, TrackSource,
};
use mixprint_store::FeatureStore;

const SR: u32 = 22050;
const TRACK_SECONDS: f32 = 2.0;

fn tone_samples(freqs: &[f32], seconds: f32) -> Vec<f32> {
    let total = (SR as f32 * seconds) as usize;
    (0..total)
        .map(|i| {
            let t = i as f32 / SR as f32;
            freqs
                .iter()
                .map(|f| (t * f * std::f32::consts::TAU).sin())
                .sum::<f32>()
                / freqs.len() as f32
                * 0.7
        })
        .collect()
}

fn write_wav(path: &Path, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &v in samples {
        writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn test_extractor() -> FeatureExtractor {
    let mut config = FeatureConfig::default();
    config.analysis_window_s = 0.5;
    config.profile = DescriptorProfile::Timbral;
    FeatureExtractor::new(config).unwrap()
}

struct Fixture {
    _dir: tempfile::TempDir,
    store_path: PathBuf,
    mix_path: PathBuf,
    sources: Vec<TrackSource>,
}

fn build_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let tracks: [(&str, &str, Vec<f32>); 3] = [
        ("house", "track-a", vec![220.0, 440.0]),
        ("techno", "track-b", vec![523.25, 1046.5]),
        ("ambient", "track-c", vec![880.0, 1318.5]),
    ];

    let mut sources = Vec::new();
    let mut mix = Vec::new();
    for (category, track_id, freqs) in &tracks {
        let samples = tone_samples(freqs, TRACK_SECONDS);
        let path = dir.path().join(format!("{track_id}.wav"));
        write_wav(&path, &samples);
        mix.extend_from_slice(&samples);
        sources.push(TrackSource {
            category: category.to_string(),
            track_id: track_id.to_string(),
            path,
        });
    }

    let mix_path = dir.path().join("mix.wav");
    write_wav(&mix_path, &mix);
    let store_path = dir.path().join("corpus.mps");
    Fixture {
        _dir: dir,
        store_path,
        mix_path,
        sources,
    }
}

fn segment_config() -> IdentifyConfig {
    IdentifyConfig {
        window_s: TRACK_SECONDS as f64,
        overlap_fraction: 0.0,
        base_index: 1,
        top_k: 1,
    }
}

#[test]
fn every_mix_segment_maps_to_its_source_track() {
    let fixture = build_fixture();
    let extractor = test_extractor();
    let store = FeatureStore::create(
        &fixture.store_path,
        extractor.config().descriptor_len(),
        extractor.descriptor_version(),
    )
    .unwrap();

    let report = populate(
        &store,
        &extractor,
        &fixture.sources,
        Duration::from_secs(60),
    )
    .unwrap();
    assert_eq!(report.stored, 3);
    assert!(report.failed.is_empty());

    let predictions = identify(&store, &extractor, &fixture.mix_path, &segment_config()).unwrap();
    assert_eq!(predictions.len(), 3);

    let expected = ["track-a", "track-b", "track-c"];
    for (i, p) in predictions.iter().enumerate() {
        assert_eq!(p.segment_index, i + 1);
        assert_eq!(p.track_id.as_deref(), Some(expected[i]), "segment {i}");
        let sim = p.similarity.unwrap();
        assert!(sim > 0.99, "segment {i} similarity {sim}");
    }
    assert_eq!(predictions[0].category.as_deref(), Some("house"));
}

#[test]
fn empty_store_yields_only_no_match_predictions() {
    let fixture = build_fixture();
    let extractor = test_extractor();
    let store = FeatureStore::create(
        &fixture.store_path,
        extractor.config().descriptor_len(),
        extractor.descriptor_version(),
    )
    .unwrap();

    let predictions = identify(&store, &extractor, &fixture.mix_path, &segment_config()).unwrap();
    assert_eq!(predictions.len(), 3);
    for p in &predictions {
        assert!(p.track_id.is_none());
        assert!(p.category.is_none());
        assert!(p.similarity.is_none());
    }
}

#[test]
fn file_descriptor_agrees_with_the_stored_corpus() {
    let fixture = build_fixture();
    let extractor = test_extractor();
    let store = FeatureStore::create(
        &fixture.store_path,
        extractor.config().descriptor_len(),
        extractor.descriptor_version(),
    )
    .unwrap();
    populate(
        &store,
        &extractor,
        &fixture.sources,
        Duration::from_secs(60),
    )
    .unwrap();

    let desc = describe_file(&fixture.sources[0].path, &extractor).unwrap();
    assert_eq!(desc.version, extractor.descriptor_version());
    assert_eq!(desc.values, store.get("house", "track-a").unwrap());
}

#[test]
fn reopened_store_matches_like_the_original() {
    let fixture = build_fixture();
    let extractor = test_extractor();
    {
        let store = FeatureStore::create(
            &fixture.store_path,
            extractor.config().descriptor_len(),
            extractor.descriptor_version(),
        )
        .unwrap();
        populate(
            &store,
            &extractor,
            &fixture.sources,
            Duration::from_secs(60),
        )
        .unwrap();
    }

    let store = FeatureStore::open(&fixture.store_path).unwrap();
    assert_eq!(store.len(), 3);
    let predictions = identify(&store, &extractor, &fixture.mix_path, &segment_config()).unwrap();
    assert_eq!(
        predictions[1].track_id.as_deref(),
        Some("track-b"),
        "second segment"
    );
}
