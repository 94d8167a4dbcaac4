use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ramcore::data::synthetic::SyntheticSpectrum;
use ramcore::processing::{process_spectrum, SpectrumProcessingConfig};

/// Runs baseline removal and peak picking on a synthetic Raman spectrum and prints
/// the result as JSON.
#[derive(Parser, Debug)]
#[command(name = "ramcore", version, about)]
struct Args {
    /// JSON file with a `SpectrumProcessingConfig`; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Smoothness penalty of the baseline
    #[arg(long)]
    lambda: Option<f64>,

    /// Relative weight change that stops the baseline iteration
    #[arg(long)]
    ratio: Option<f64>,

    /// Maximum number of baseline iterations
    #[arg(long)]
    itermax: Option<usize>,

    /// Minimum prominence of reported peaks
    #[arg(long)]
    prominence: Option<f64>,

    /// Search peaks on the raw spectrum instead of the baseline corrected one
    #[arg(long)]
    keep_bg: bool,

    /// Number of samples of the synthetic spectrum
    #[arg(long, default_value_t = 2000)]
    points: usize,

    /// Standard deviation of the added noise
    #[arg(long, default_value_t = 1.0)]
    noise: f64,

    /// Seed of the noise generator
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<SpectrumProcessingConfig>(&text).context("parsing config")?
        }
        None => SpectrumProcessingConfig::default(),
    };

    if let Some(lambda) = args.lambda {
        config.baseline.lambda = lambda;
    }
    if let Some(ratio) = args.ratio {
        config.baseline.ratio = ratio;
    }
    if let Some(itermax) = args.itermax {
        config.baseline.itermax = itermax;
    }
    if let Some(prominence) = args.prominence {
        config.prominence_threshold = prominence;
    }
    if args.keep_bg {
        config.remove_bg = false;
    }

    // quartz-like lines on a curved fluorescence background
    let spectrum = SyntheticSpectrum::new(100.0, 1800.0, args.points)
        .with_drift(vec![300.0, 0.4, -1.5e-4])
        .with_peak(206.0, 6.0, 180.0)
        .with_peak(464.0, 4.0, 900.0)
        .with_peak(808.0, 5.0, 90.0)
        .with_peak(1082.0, 7.0, 120.0)
        .with_noise(args.noise, args.seed)
        .generate();

    info!("generated {}", spectrum);

    let processed = process_spectrum("synthetic", &spectrum, &config)?;
    println!("{}", serde_json::to_string_pretty(&processed)?);

    Ok(())
}
