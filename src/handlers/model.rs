//! Generic read-only model handlers: list, retrieve, count.

use crate::error::AppError;
use crate::response::{success_many, success_one_ok, CountBody};
use crate::routes::RouteEntry;
use crate::service::ReadService;
use crate::state::AppState;
use axum::response::IntoResponse;
use serde_json::Value;
use std::collections::HashMap;

fn filters_for(entry: &RouteEntry, params: &HashMap<String, String>) -> Result<Vec<(String, Value)>, AppError> {
    let mut filters = Vec::new();
    for backend in &entry.filter_backends {
        filters.extend(backend.filter_queryset(entry, params)?);
    }
    Ok(filters)
}

/// Absent is `None`; present but not a non-negative integer is a 400.
fn page_param(params: &HashMap<String, String>, name: &str) -> Result<Option<u32>, AppError> {
    params
        .get(name)
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer, got '{}'", name, v)))
        })
        .transpose()
}

pub async fn list(
    state: AppState,
    entry: &RouteEntry,
    params: HashMap<String, String>,
) -> Result<impl IntoResponse, AppError> {
    let limit = page_param(&params, "limit")?;
    let offset = page_param(&params, "offset")?;
    let filters = filters_for(entry, &params)?;
    let rows = ReadService::list(
        &state.pool,
        &state.schema,
        &entry.queryset,
        &entry.serializer,
        &filters,
        limit,
        offset,
    )
    .await?;
    Ok(success_many(rows))
}

/// `id` must be digits only; anything else is not a record path.
pub async fn retrieve(state: AppState, entry: &RouteEntry, id: String) -> Result<impl IntoResponse, AppError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::NotFound(id));
    }
    let pk: i64 = id.parse().map_err(|_| AppError::NotFound(id.clone()))?;
    let row = ReadService::retrieve(&state.pool, &state.schema, &entry.queryset, &entry.serializer, pk)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", entry.queryset.model.name, id)))?;
    Ok(success_one_ok(row))
}

pub async fn count(
    state: AppState,
    entry: &RouteEntry,
    params: HashMap<String, String>,
) -> Result<impl IntoResponse, AppError> {
    let filters = filters_for(entry, &params)?;
    let count = ReadService::count(&state.pool, &state.schema, &entry.queryset, &filters).await?;
    Ok(success_one_ok(CountBody { count }))
}
