//! Shared application state for all routes. Route tables are fixed at startup.

use crate::routes::RouteRegistry;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// PostgreSQL schema holding the catalog tables.
    pub schema: Arc<str>,
    pub routes: Arc<RouteRegistry>,
}

impl AppState {
    pub fn new(pool: PgPool, schema: &str, routes: RouteRegistry) -> Self {
        AppState {
            pool,
            schema: Arc::from(schema),
            routes: Arc::new(routes),
        }
    }
}
