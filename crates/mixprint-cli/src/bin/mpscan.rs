//! mpscan - Reference corpus scanner
//!
//! Usage: mpscan <corpus_root> <store.mps>
//!
//! Walks a `category/track` directory tree, extracts one descriptor per
//! audio file and commits it to the feature store. Already-stored tracks
//! are skipped, so re-running over a grown collection is cheap.

use anyhow::{Context, Result};
use clap::Parser;
use mixprint_core::{audio::AudioFormat, corpus, FeatureConfig, FeatureExtractor, TrackSource};
use mixprint_store::FeatureStore;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mpscan")]
#[command(about = "Scan a reference collection into a feature store", long_about = None)]
struct Args {
    /// Root directory laid out as <category>/<track files>
    corpus_root: PathBuf,

    /// Feature store file, created if missing
    store_path: PathBuf,

    /// Optional TOML file overriding the analysis configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Per-file decode timeout in seconds
    #[arg(long, default_value_t = 120)]
    decode_timeout: u64,

    /// Also export the resulting store as JSON for inspection
    #[arg(long)]
    export: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (clean JSON output for parsing)
    // Verbose: show Info level logs for debugging
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("failed to configure worker pool")?;
    }

    run_scan(&args)
}

fn run_scan(args: &Args) -> Result<()> {
    if !args.corpus_root.is_dir() {
        anyhow::bail!("corpus root not found: {}", args.corpus_root.display());
    }

    let config = load_config(args.config.as_deref())?;
    let extractor = FeatureExtractor::new(config)?;

    let store = if args.store_path.exists() {
        FeatureStore::open(&args.store_path)
            .with_context(|| format!("failed to open store {}", args.store_path.display()))?
    } else {
        FeatureStore::create(
            &args.store_path,
            extractor.config().descriptor_len(),
            extractor.descriptor_version(),
        )
        .with_context(|| format!("failed to create store {}", args.store_path.display()))?
    };

    let sources = collect_sources(&args.corpus_root)?;
    log::info!(
        "found {} audio files under {}",
        sources.len(),
        args.corpus_root.display()
    );

    let start = std::time::Instant::now();
    let report = corpus::populate(
        &store,
        &extractor,
        &sources,
        Duration::from_secs(args.decode_timeout),
    )?;
    let elapsed = start.elapsed();

    if let Some(export_path) = &args.export {
        let file = std::fs::File::create(export_path)
            .with_context(|| format!("failed to create {}", export_path.display()))?;
        store.export_json(std::io::BufWriter::new(file))?;
        log::info!("exported store to {}", export_path.display());
    }

    let result = serde_json::json!({
        "status": "success",
        "store_file": args.store_path.display().to_string(),
        "descriptor_version": store.descriptor_version(),
        "stored": report.stored,
        "already_present": report.already_present,
        "failed": report.failed.iter().map(|f| serde_json::json!({
            "category": f.category,
            "track_id": f.track_id,
            "reason": f.reason,
        })).collect::<Vec<_>>(),
        "total_in_store": store.len(),
        "processing_time_seconds": elapsed.as_secs_f64(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FeatureConfig> {
    let config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read config {}", p.display()))?;
            toml::from_str(&text).with_context(|| format!("invalid config {}", p.display()))?
        }
        None => FeatureConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Collect `<category>/<track>` sources; the track id is the file stem.
/// Files directly under the root or with unknown extensions are skipped
/// with a log line.
fn collect_sources(root: &Path) -> Result<Vec<TrackSource>> {
    let mut sources = Vec::new();
    let mut categories: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    categories.sort();

    for category_dir in categories {
        let category = match category_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let mut files: Vec<PathBuf> = std::fs::read_dir(&category_dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        for path in files {
            if !AudioFormat::from_path(&path).is_supported() {
                log::debug!("skipping non-audio file {}", path.display());
                continue;
            }
            let track_id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            sources.push(TrackSource {
                category: category.clone(),
                track_id,
                path,
            });
        }
    }
    Ok(sources)
}
