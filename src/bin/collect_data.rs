//! One-shot pipeline: basic export, annotation download, simple combined dataset.

use chrono::Local;
use clap::Parser;
use saintsophia::config::Settings;
use saintsophia::tools::{
    create_simple_dataset, dataset_filename, download_annotations, export_inscriptions, DownloadOptions,
    ExportVariant, HttpAnnotationSource,
};
use saintsophia::{catalog, store, telemetry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Export inscriptions, download their annotations and build a dataset")]
struct Cli {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    Cli::parse();
    telemetry::init_tracing(None);

    let settings = Settings::from_env()?;
    let registry = catalog::registry()?;
    let app = registry.get_app_config(catalog::APP_LABEL)?;
    let pool = store::connect(&settings).await?;

    let export = export_inscriptions(&pool, &settings.schema, app, ExportVariant::Basic, None).await?;
    println!("Exported {} inscriptions to {}", export.rows, export.path.display());

    let source = HttpAnnotationSource::new(&settings.annotation_api)?;
    let options = DownloadOptions::new(&settings.annotations_dir);
    let downloads = download_annotations(&source, &export.path, &options).await?;
    println!("{}", downloads);

    let output = PathBuf::from(dataset_filename(Local::now()));
    let summary = create_simple_dataset(&export.path, &settings.annotations_dir, &output)?;
    println!("Combined dataset saved as {}", summary.path.display());
    println!("{}", summary);

    println!("Files created:");
    println!("  - {} (raw inscription data)", export.path.display());
    println!("  - {}/ (annotation JSON files)", options.output_dir.display());
    println!("  - {} (combined dataset)", summary.path.display());
    Ok(())
}
