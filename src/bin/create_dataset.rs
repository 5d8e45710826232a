//! Merge an inscription CSV with downloaded annotations into `combined_dataset_<timestamp>.csv`.

use chrono::Local;
use clap::Parser;
use saintsophia::config::Settings;
use saintsophia::telemetry;
use saintsophia::tools::{create_dataset, dataset_filename};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Create a combined dataset from inscriptions and annotations")]
struct Cli {
    /// Inscription CSV, e.g. `inscriptions_20240812_123456.csv`.
    csv_file: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(None);

    let settings = Settings::from_env()?;
    let output = PathBuf::from(dataset_filename(Local::now()));
    let summary = create_dataset(&cli.csv_file, &settings.annotations_dir, &output)?;
    let Some(path) = &summary.path else {
        eprintln!("No data to process");
        std::process::exit(1);
    };
    println!("Combined dataset saved as {}", path.display());
    println!("{}", summary);
    Ok(())
}
