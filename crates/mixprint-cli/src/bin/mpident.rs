//! mpident - Identify known tracks inside a long recording
//!
//! Usage: mpident <mix> <store.mps> [-o predictions.json]
//!
//! Segments the recording, matches each segment against the reference
//! store and prints ordered predictions as JSON. When an output file is
//! given and already holds results, the run is skipped and the existing
//! predictions are reprinted; `--force` recomputes.

use anyhow::{Context, Result};
use clap::Parser;
use mixprint_core::{identify, FeatureConfig, FeatureExtractor, IdentifyConfig, Prediction};
use mixprint_store::FeatureStore;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mpident")]
#[command(about = "Identify reference tracks inside a recording", long_about = None)]
struct Args {
    /// Recording to identify (DJ mix, broadcast log)
    mix_path: PathBuf,

    /// Feature store with the reference corpus
    store_path: PathBuf,

    /// Write predictions to this file as well as stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Recompute even when the output file already has predictions
    #[arg(short, long)]
    force: bool,

    /// Optional TOML file overriding the analysis configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Segment length in seconds
    #[arg(short, long, default_value_t = 90.0)]
    window: f64,

    /// Overlap between consecutive segments in seconds
    #[arg(long, default_value_t = 20.0)]
    overlap: f64,

    /// Index assigned to the first segment
    #[arg(long, default_value_t = 1)]
    base_index: usize,

    /// Ranked candidates to report per segment
    #[arg(short, long, default_value_t = 1)]
    top: usize,

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

    run_ident(&args)
}

fn run_ident(args: &Args) -> Result<()> {
    if !args.mix_path.exists() {
        anyhow::bail!("recording not found: {}", args.mix_path.display());
    }
    if args.window <= 0.0 {
        anyhow::bail!("segment window must be positive");
    }
    if !(0.0..args.window).contains(&args.overlap) {
        anyhow::bail!("overlap must be in [0, window)");
    }

    // Resumption: an existing non-empty result stands for the whole run
    if let Some(output) = &args.output {
        if !args.force {
            if let Some(existing) = read_existing(output)? {
                log::info!(
                    "reusing existing predictions from {}, pass --force to recompute",
                    output.display()
                );
                print_predictions(&args.mix_path, &existing, true)?;
                return Ok(());
            }
        }
    }

    let config = load_config(args.config.as_deref())?;
    let extractor = FeatureExtractor::new(config)?;
    let store = FeatureStore::open(&args.store_path)
        .with_context(|| format!("failed to open store {}", args.store_path.display()))?;

    let identify_config = IdentifyConfig {
        window_s: args.window,
        overlap_fraction: args.overlap / args.window,
        base_index: args.base_index,
        top_k: args.top,
    };

    let start = std::time::Instant::now();
    let predictions = identify(&store, &extractor, &args.mix_path, &identify_config)?;
    log::info!(
        "identified {} segments in {:.2}s",
        predictions.len(),
        start.elapsed().as_secs_f64()
    );

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&predictions)?;
        std::fs::write(output, json)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }
    print_predictions(&args.mix_path, &predictions, false)?;

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

/// Parse a previous run's output file; `None` when absent or empty.
fn read_existing(path: &Path) -> Result<Option<Vec<Prediction>>> {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            let predictions = serde_json::from_str(&text)
                .with_context(|| format!("existing output {} is not readable", path.display()))?;
            Ok(Some(predictions))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn print_predictions(mix_path: &Path, predictions: &[Prediction], reused: bool) -> Result<()> {
    let matched = predictions.iter().filter(|p| p.track_id.is_some()).count();
    let result = serde_json::json!({
        "status": if reused { "reused" } else { "success" },
        "input_file": mix_path.display().to_string(),
        "segments": predictions.len(),
        "matched_segments": matched,
        "predictions": predictions,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
