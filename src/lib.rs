//! Saint Sophia inscription catalog: registry-driven read-only REST API, OpenAPI documentation,
//! and the CSV/annotation data tools.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod schema;
pub mod serializer;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod tools;

pub use config::Settings;
pub use error::{AppError, ConfigError, SchemaError};
pub use migration::ensure_tables;
pub use model::{AppConfig, ModelDescriptor, ModelRegistry};
pub use routes::{app_router, documentation, route_registry, RouteRegistry};
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
