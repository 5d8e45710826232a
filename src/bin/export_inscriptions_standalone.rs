//! Full 32-column inscription export with joined multi-value fields.

use clap::Parser;
use saintsophia::config::Settings;
use saintsophia::tools::{export_inscriptions, ExportVariant};
use saintsophia::{catalog, store, telemetry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Export inscriptions with all related data to CSV")]
struct Cli {
    /// Output file. Defaults to `inscriptions_with_transcription_<timestamp>.csv`.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Also export inscriptions without a transcription that have another text field,
    /// an author, or a mentioned person.
    #[arg(long)]
    include_empty_text_fields: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(None);

    let settings = Settings::from_env()?;
    let registry = catalog::registry()?;
    let app = registry.get_app_config(catalog::APP_LABEL)?;
    let pool = store::connect(&settings).await?;
    let variant = ExportVariant::Full {
        include_empty_text_fields: cli.include_empty_text_fields,
    };
    let report = export_inscriptions(&pool, &settings.schema, app, variant, cli.output).await?;
    println!("Exported {} inscriptions to {}", report.rows, report.path.display());
    println!("File size: {:.1} KB ({} bytes)", report.bytes as f64 / 1024.0, report.bytes);
    Ok(())
}
