//! Update inscription fields from an edited CSV; columns are matched to fields by name.

use clap::Parser;
use saintsophia::config::Settings;
use saintsophia::error::ConfigError;
use saintsophia::service::PgInscriptionStore;
use saintsophia::tools::update_inscriptions;
use saintsophia::{catalog, store, telemetry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Update inscription data from a CSV file")]
struct Cli {
    /// CSV with an `id` column and one column per field to update.
    csv_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(None);

    let settings = Settings::from_env()?;
    let registry = catalog::registry()?;
    let app = registry.get_app_config(catalog::APP_LABEL)?;
    let model = app
        .get_model("inscription")
        .ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: "inscription".into(),
        })?;
    let pool = store::connect(&settings).await?;
    let store = PgInscriptionStore::new(pool, &settings.schema, model.clone());
    let report = update_inscriptions(&store, model, &cli.csv_file).await?;
    println!("{}", report);
    Ok(())
}
