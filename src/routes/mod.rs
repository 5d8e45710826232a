//! Route tables, generated model routes, documentation routes, and the assembled app router.

mod common;
pub mod docs;
mod model;
mod table;

pub use common::common_routes;
pub use docs::{build_app_endpoint, doc_routes, doc_title, docs_router, DocKind, DocOptions, DocRoute};
pub use model::{model_router, routes_for};
pub use table::{Action, RouteEntry, RouteRegistry, RouteTable};

use crate::error::ConfigError;
use crate::model::ModelRegistry;
use crate::state::AppState;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Model routes of the global table, health routes, and the given documentation routes.
pub fn app_router(state: AppState, docs: &[DocRoute]) -> Result<Router, ConfigError> {
    let router = model_router(state.routes.global())
        .merge(docs_router(docs)?)
        .merge(common_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    Ok(router)
}

/// Route tables for every registered app, each under `api/{app}`, skipping models in `exclude`.
pub fn route_registry(models: &ModelRegistry, exclude: &[&str]) -> Result<RouteRegistry, ConfigError> {
    let mut routes = RouteRegistry::new();
    for app in models.apps() {
        let entries = routes_for(models, &app.label, &build_app_endpoint(&app.label), exclude)?;
        routes.register_app(&app.label, entries)?;
    }
    Ok(routes)
}

/// Global documentation routes followed by one schema/documentation pair per app.
pub fn documentation(routes: &RouteRegistry) -> Result<Vec<DocRoute>, ConfigError> {
    let mut docs = Vec::from(doc_routes(&DocOptions::default(), routes)?);
    for label in routes.app_labels() {
        docs.extend(doc_routes(&DocOptions::for_app(label), routes)?);
    }
    Ok(docs)
}
