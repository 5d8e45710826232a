//! Idempotent DDL for registered models: schema, model tables, join tables, then foreign keys.

use crate::error::AppError;
use crate::model::{FieldDescriptor, FieldKind, ModelDescriptor, ModelRegistry};
use crate::sql::{literal, qualified_table, quoted};
use sqlx::PgPool;

fn column_def(model: &ModelDescriptor, field: &FieldDescriptor) -> Option<String> {
    let column = field.column()?;
    let ty = field.column_type()?;
    let mut def = format!("{} {}", quoted(&column), ty.ddl_type());
    if field.name == model.pk() {
        def.push_str(" PRIMARY KEY");
        return Some(def);
    }
    if !field.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &field.default {
        def.push_str(&format!(" DEFAULT {}", default));
    }
    Some(def)
}

pub fn create_table_sql(schema: &str, model: &ModelDescriptor) -> String {
    let cols: Vec<String> = model.fields.iter().filter_map(|f| column_def(model, f)).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified_table(schema, &model.table_name()),
        cols.join(", ")
    )
}

/// Join tables of `model`'s many-to-many fields; requires both sides to exist.
pub fn create_join_tables_sql(schema: &str, model: &ModelDescriptor, models: &[&ModelDescriptor]) -> Vec<String> {
    let mut out = Vec::new();
    for field in model.many_to_many_fields() {
        let Some(to) = field.related_model() else { continue };
        let Some(related) = models.iter().find(|m| m.name == to) else { continue };
        let (ours, theirs) = model.join_columns(field);
        out.push(format!(
            "CREATE TABLE IF NOT EXISTS {jt} (\"id\" BIGSERIAL PRIMARY KEY, {ours} BIGINT NOT NULL REFERENCES {mt}(\"id\") ON DELETE CASCADE, {theirs} BIGINT NOT NULL REFERENCES {rt}(\"id\") ON DELETE CASCADE, UNIQUE ({ours}, {theirs}))",
            jt = qualified_table(schema, &model.join_table(field)),
            ours = quoted(&ours),
            theirs = quoted(&theirs),
            mt = qualified_table(schema, &model.table_name()),
            rt = qualified_table(schema, &related.table_name()),
        ));
    }
    out
}

/// Postgres truncates identifiers to 63 bytes; the existence check must compare the stored form.
const MAX_IDENTIFIER_LEN: usize = 63;

fn constraint_name(table: &str, column: &str) -> String {
    let mut name = format!("{}_{}_fk", table, column);
    while name.len() > MAX_IDENTIFIER_LEN {
        name.pop();
    }
    name
}

/// One `ADD CONSTRAINT` per foreign key, guarded by a `pg_constraint` lookup so re-runs are no-ops
/// and any other failure surfaces.
pub fn foreign_key_sql(schema: &str, model: &ModelDescriptor, models: &[&ModelDescriptor]) -> Vec<String> {
    let mut out = Vec::new();
    let table = qualified_table(schema, &model.table_name());
    for field in &model.fields {
        let FieldKind::ForeignKey { to } = &field.kind else { continue };
        let Some(related) = models.iter().find(|m| &m.name == to) else { continue };
        let Some(column) = field.column() else { continue };
        let name = constraint_name(&model.table_name(), &column);
        out.push(format!(
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_constraint WHERE conname = {name_lit} AND conrelid = {table_lit}::regclass) THEN ALTER TABLE {table} ADD CONSTRAINT {name} FOREIGN KEY ({column}) REFERENCES {related}(\"id\") ON DELETE SET NULL; END IF; END $$",
            name_lit = literal(&name),
            table_lit = literal(&table),
            table = table,
            name = quoted(&name),
            column = quoted(&column),
            related = qualified_table(schema, &related.table_name()),
        ));
    }
    out
}

/// Creates whatever is missing for every registered model. Existing tables are left untouched.
pub async fn ensure_tables(pool: &PgPool, registry: &ModelRegistry, schema: &str) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
        .execute(pool)
        .await?;
    for app in registry.apps() {
        let models: Vec<&ModelDescriptor> = app.models().map(|m| m.as_ref()).collect();
        for model in &models {
            let sql = create_table_sql(schema, model);
            tracing::debug!(sql = %sql, "ddl");
            sqlx::query(&sql).execute(pool).await?;
        }
        for model in &models {
            for sql in create_join_tables_sql(schema, model, &models) {
                tracing::debug!(sql = %sql, "ddl");
                sqlx::query(&sql).execute(pool).await?;
            }
        }
        for model in &models {
            for sql in foreign_key_sql(schema, model, &models) {
                tracing::debug!(sql = %sql, "ddl");
                sqlx::query(&sql).execute(pool).await?;
            }
        }
        tracing::info!(app = %app.label, tables = models.len(), "catalog tables ensured");
    }
    Ok(())
}
