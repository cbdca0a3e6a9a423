/// Command-line runner: compute a land-suitability GeoTIFF from a folder of
/// factor rasters and a weight set.
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use landsuit_core::{run_analysis, EngineConfig, NdviBlend, StatusStore, SuitabilityEngine, WeightSet};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "landsuit", about = "Weighted land-suitability scoring over GeoTIFF factor layers")]
struct Args {
    /// Weights as a JSON object, e.g. '{"fertility":30,"moisture":25}'
    #[arg(long, conflicts_with = "weights_file")]
    weights: Option<String>,

    /// Path to a JSON file holding the weight object
    #[arg(long)]
    weights_file: Option<PathBuf>,

    /// Folder containing the factor GeoTIFFs [default: data]
    #[arg(long)]
    data_folder: Option<PathBuf>,

    /// Output GeoTIFF
    #[arg(short, long, default_value = "data/suitability.tif")]
    output: PathBuf,

    /// Engine configuration JSON; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Divide the NDVI score by 100 before blending
    #[arg(long)]
    ndvi_unit_scale: bool,

    /// Require a weight for every known factor
    #[arg(long)]
    strict: bool,

    /// Print which factor files are present and exit
    #[arg(long)]
    list_factors: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing log subscriber")?;
    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &args.data_folder {
        config.data_dir = dir.clone();
    }
    if args.ndvi_unit_scale {
        config.ndvi_blend = NdviBlend::Unit;
    }
    Ok(config)
}

fn load_weights(args: &Args) -> Result<WeightSet> {
    let weights = if let Some(json) = &args.weights {
        WeightSet::from_json(json).context("parsing --weights")?
    } else if let Some(path) = &args.weights_file {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        WeightSet::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        info!("no weights given, using defaults");
        WeightSet::default()
    };

    if args.strict {
        let missing = weights.missing_factors();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.id()).collect();
            bail!("missing weights for: {}", names.join(", "));
        }
    }
    Ok(weights)
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose)?;

    let config = load_config(&args)?;
    let engine = SuitabilityEngine::new(config);

    if args.list_factors {
        let report = engine.factor_availability();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let weights = load_weights(&args)?;
    let output = &args.output;

    let store = StatusStore::new();
    let stats = run_analysis(&engine, &weights, output, &store)
        .with_context(|| format!("suitability analysis over {}", engine.config().data_dir.display()))?;

    let status = store.snapshot();
    info!("{} ({})", status.message, output.display());
    if let Some(s) = stats {
        println!("{}", serde_json::to_string_pretty(&s)?);
    }
    Ok(())
}
