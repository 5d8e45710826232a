//! Inscription rows for the data tools: flat export rows and per-record text updates.

use crate::error::AppError;
use crate::model::{AppConfig, ModelDescriptor};
use crate::service::read::bind_all;
use crate::sql::export::{select_export_rows, ExportColumn, Selection};
use crate::sql::{select_text_columns, update_text_columns};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;

/// Export rows in column order, every cell as text ("" for NULL).
pub async fn fetch_export_rows(
    pool: &PgPool,
    schema: &str,
    app: &AppConfig,
    model: &ModelDescriptor,
    columns: &[ExportColumn],
    selection: &Selection,
) -> Result<Vec<Vec<String>>, AppError> {
    let q = select_export_rows(app, model, columns, selection, schema)?;
    tracing::debug!(sql = %q.sql, "export query");
    let rows = bind_all(&q).fetch_all(pool).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            cells.push(row.try_get::<String, _>(i)?);
        }
        out.push(cells);
    }
    Ok(out)
}

/// Record access needed by the bulk updater.
#[async_trait]
pub trait InscriptionStore: Send + Sync {
    /// Current text values of `fields` for record `id` (`None` inside the map for NULL);
    /// `Ok(None)` when no such record exists.
    async fn current_values(
        &self,
        id: i64,
        fields: &[String],
    ) -> Result<Option<HashMap<String, Option<String>>>, AppError>;

    async fn update_fields(&self, id: i64, changes: &[(String, String)]) -> Result<(), AppError>;
}

pub struct PgInscriptionStore {
    pool: PgPool,
    schema: String,
    model: Arc<ModelDescriptor>,
}

impl PgInscriptionStore {
    pub fn new(pool: PgPool, schema: &str, model: Arc<ModelDescriptor>) -> Self {
        PgInscriptionStore {
            pool,
            schema: schema.to_string(),
            model,
        }
    }
}

#[async_trait]
impl InscriptionStore for PgInscriptionStore {
    async fn current_values(
        &self,
        id: i64,
        fields: &[String],
    ) -> Result<Option<HashMap<String, Option<String>>>, AppError> {
        let q = select_text_columns(&self.model, fields, id, &self.schema);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let Some(row) = bind_all(&q).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let mut values = HashMap::new();
        for field in fields {
            if self.model.get_field(field).is_some() {
                values.insert(field.clone(), row.try_get::<Option<String>, _>(field.as_str())?);
            }
        }
        Ok(Some(values))
    }

    async fn update_fields(&self, id: i64, changes: &[(String, String)]) -> Result<(), AppError> {
        let q = update_text_columns(&self.model, id, changes, &self.schema);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        bind_all(&q).execute(&self.pool).await?;
        Ok(())
    }
}
