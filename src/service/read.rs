//! Read-only execution of generated record queries.

use crate::error::AppError;
use crate::model::QuerySet;
use crate::serializer::SerializerDefinition;
use crate::sql::{count_records, select_record_by_id, select_records, PgBindValue, QueryBuf};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

pub struct ReadService;

impl ReadService {
    /// Records matching `filters`, ordered by primary key. Limit defaults to 100, capped at 1000.
    pub async fn list(
        pool: &PgPool,
        schema: &str,
        qs: &QuerySet,
        serializer: &SerializerDefinition,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = offset.unwrap_or(0);
        let q = select_records(qs, serializer, filters, Some(limit), Some(offset), schema);
        let rows = Self::fetch_all(pool, &q).await?;
        rows.iter().map(record).collect()
    }

    pub async fn retrieve(
        pool: &PgPool,
        schema: &str,
        qs: &QuerySet,
        serializer: &SerializerDefinition,
        id: i64,
    ) -> Result<Option<Value>, AppError> {
        let q = select_record_by_id(qs, serializer, id, schema);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(&q).fetch_optional(pool).await?;
        row.as_ref().map(record).transpose()
    }

    pub async fn count(
        pool: &PgPool,
        schema: &str,
        qs: &QuerySet,
        filters: &[(String, Value)],
    ) -> Result<i64, AppError> {
        let q = count_records(qs, filters, schema);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(&q).fetch_one(pool).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<PgRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(q).fetch_all(pool).await?)
    }
}

pub(crate) fn bind_all(q: &QueryBuf) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

fn record(row: &PgRow) -> Result<Value, AppError> {
    Ok(row.try_get::<Value, _>("record")?)
}
