//! Saint Sophia catalog API server.
//!
//! Run from repo root: `cargo run -p saintsophia-server`

use saintsophia::config::Settings;
use saintsophia::migration::ensure_tables;
use saintsophia::routes::{app_router, documentation, route_registry};
use saintsophia::{catalog, store, telemetry, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing(Some("saintsophia_server=info"));

    let settings = Settings::from_env()?;
    store::ensure_database_exists(&settings.database_url).await?;
    let pool = store::connect(&settings).await?;

    let models = catalog::registry()?;
    if settings.auto_migrate {
        ensure_tables(&pool, &models, &settings.schema).await?;
    }
    let exclude: Vec<&str> = settings.exclude_models.iter().map(String::as_str).collect();
    let routes = route_registry(&models, &exclude)?;
    let docs = documentation(&routes)?;
    tracing::info!(routes = routes.global().len(), docs = docs.len(), "route tables built");

    let state = AppState::new(pool, &settings.schema, routes);
    let app = app_router(state, &docs)?;
    let listener = TcpListener::bind(settings.bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
