//! Download one annotation file per inscription listed in an exported CSV.

use clap::Parser;
use saintsophia::config::Settings;
use saintsophia::telemetry;
use saintsophia::tools::{download_annotations, DownloadOptions, HttpAnnotationSource};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Download annotations for the inscriptions in a CSV export")]
struct Cli {
    /// CSV with `id` and `panel_title` columns.
    csv_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(None);

    let settings = Settings::from_env()?;
    let source = HttpAnnotationSource::new(&settings.annotation_api)?;
    let options = DownloadOptions::new(&settings.annotations_dir);
    let report = download_annotations(&source, &cli.csv_file, &options).await?;
    println!("{}", report);
    println!("Annotation files saved in '{}'", options.output_dir.display());
    Ok(())
}
