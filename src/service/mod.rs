//! Database-facing services: generic record reads and the inscription store used by the tools.

mod inscriptions;
mod read;
pub use inscriptions::{fetch_export_rows, InscriptionStore, PgInscriptionStore};
pub use read::{ReadService, DEFAULT_LIMIT, MAX_LIMIT};
