//! Export inscriptions that have a transcription to `inscriptions_<timestamp>.csv`.

use clap::Parser;
use saintsophia::config::Settings;
use saintsophia::tools::{export_inscriptions, ExportVariant};
use saintsophia::{catalog, store, telemetry};

#[derive(Parser)]
#[command(version, about = "Export inscriptions with transcription data to CSV")]
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
    let report = export_inscriptions(&pool, &settings.schema, app, ExportVariant::Basic, None).await?;
    println!("Exported {} inscriptions to {}", report.rows, report.path.display());
    Ok(())
}
