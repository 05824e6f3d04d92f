use anyhow::{Context, Result};
use clap::Parser;
use image::RgbImage;
use leaf_health::actuation::{ActuationOutcome, PumpSwitch, SerialCommandMap, SerialLine, dispatch};
use leaf_health::{BatchClassifier, ClassificationResult, ClassifierConfig, LeafClassifier};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "leaf_health=info,leaf_health_cli=info";

#[derive(Parser)]
#[command(name = "leaf-health")]
#[command(version, about = "Classify leaf photos as healthy, moderate or unhealthy", long_about = None)]
struct Cli {
    /// Leaf images to classify
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// JSON classifier configuration; missing fields keep their defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the longest working side in pixels
    #[arg(long, value_name = "N")]
    max_side: Option<u32>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Run the pump and serial actuators and include their outcomes in the output
    #[arg(long)]
    commands: bool,

    /// Serial device the mapped command line is written to (implies --commands)
    #[arg(long, value_name = "DEVICE")]
    serial_port: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    path: &'a Path,
    #[serde(flatten)]
    result: &'a ClassificationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    actuation: Option<Vec<ActuationOutcome>>,
}

#[derive(Serialize)]
struct Failure<'a> {
    path: &'a Path,
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Logging & Argument Parsing ---
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();
    let cli = Cli::parse();

    // --- 2. Configuration ---
    let mut config = match &cli.config {
        Some(path) => ClassifierConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ClassifierConfig::default(),
    };
    if let Some(max_side) = cli.max_side {
        config.preprocess.max_side = max_side;
    }
    config.validate().context("invalid configuration")?;

    // Without a device the serial actuator only reports the mapped command.
    let serial_map = SerialCommandMap::from_env();
    let serial = match &cli.serial_port {
        Some(device) => SerialLine::open(device, serial_map)
            .with_context(|| format!("opening serial device {}", device.display()))?
            .boxed(),
        None => SerialLine::new("serial", serial_map, std::io::sink()).boxed(),
    };
    let actuate = cli.commands || cli.serial_port.is_some();

    // --- 3. Decoding ---
    // A file that fails to decode is reported and skipped; the rest still run.
    let mut decoded: Vec<(&Path, RgbImage)> = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        match load_rgb(path) {
            Ok(image) => decoded.push((path.as_path(), image)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping image");
                emit(&Failure { path: path.as_path(), error: format!("{err:#}") }, cli.pretty)?;
            }
        }
    }

    // --- 4. Classification ---
    let (paths, images): (Vec<&Path>, Vec<RgbImage>) = decoded.into_iter().unzip();
    let results = if images.len() > 1 {
        let pool = BatchClassifier::new(config).context("starting batch classifier")?;
        info!(images = images.len(), workers = pool.worker_count(), "classifying batch");
        pool.classify_all(images).await
    } else {
        let classifier = LeafClassifier::new(config).context("invalid configuration")?;
        images.iter().map(|image| classifier.classify(image)).collect()
    };

    // --- 5. Output ---
    for (path, result) in paths.into_iter().zip(results) {
        match result {
            Ok(result) => {
                let actuation = actuate.then(|| dispatch(&result, &[&PumpSwitch, &serial]));
                emit(&Report { path, result: &result, actuation }, cli.pretty)?;
            }
            Err(err) => emit(&Failure { path, error: err.to_string() }, cli.pretty)?,
        }
    }

    Ok(())
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    Ok(image.to_rgb8())
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let line = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{line}");
    Ok(())
}
