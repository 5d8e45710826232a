//! Filter backends: turn query parameters into exact-match filters and describe them for the schema.
//!
//! A backend offers up to two ways of describing itself. Either strategy may be absent (`None`)
//! or fail (`Some(Err(..))`); the schema inspector probes them in order.

use crate::error::{AppError, SchemaError};
use crate::model::{ColumnType, FieldDescriptor};
use crate::routes::RouteEntry;
use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub ty: String,
}

/// One query parameter as it appears in an OpenAPI operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterParameter {
    pub name: String,
    pub required: bool,
    #[serde(rename = "in")]
    pub location: String,
    pub description: String,
    pub schema: ParameterSchema,
}

impl FilterParameter {
    pub fn query(name: &str, description: &str, ty: &str) -> Self {
        FilterParameter {
            name: name.to_string(),
            required: false,
            location: "query".into(),
            description: description.to_string(),
            schema: ParameterSchema { ty: ty.to_string() },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterField {
    pub name: String,
    pub label: Option<String>,
    pub required: bool,
}

/// Named filters a backend accepts, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub fields: Vec<FilterField>,
}

impl FilterSet {
    /// Fallback description: every filter as an optional string query parameter.
    pub fn parameters(&self) -> Vec<FilterParameter> {
        self.fields
            .iter()
            .map(|f| FilterParameter {
                name: f.name.clone(),
                required: f.required,
                location: "query".into(),
                description: f.label.clone().unwrap_or_else(|| f.name.clone()),
                schema: ParameterSchema { ty: "string".into() },
            })
            .collect()
    }
}

pub trait FilterBackend: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Parameters described by the backend itself.
    fn schema_operation_parameters(&self, _view: &RouteEntry) -> Option<Result<Vec<FilterParameter>, SchemaError>> {
        None
    }

    /// The backend's filter set, if it has one for this view.
    fn filterset(&self, _view: &RouteEntry) -> Option<Result<Option<FilterSet>, SchemaError>> {
        None
    }

    /// Exact-match filters (field name, typed value) for the request's query parameters.
    fn filter_queryset(
        &self,
        _view: &RouteEntry,
        _params: &HashMap<String, String>,
    ) -> Result<Vec<(String, Value)>, AppError> {
        Ok(Vec::new())
    }
}

/// Parses a query value into the column's type so the database never sees an uncastable value.
fn typed_value(field: &FieldDescriptor, raw: &str) -> Result<Value, AppError> {
    let invalid = |what: &str| AppError::BadRequest(format!("{} must be {}, got '{}'", field.name, what, raw));
    Ok(match field.column_type() {
        Some(ColumnType::Int) => Value::from(raw.parse::<i32>().map_err(|_| invalid("a 32-bit integer"))?),
        Some(ty) if ty.is_integer() => Value::from(raw.parse::<i64>().map_err(|_| invalid("an integer"))?),
        Some(ColumnType::Float) => match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::from(f),
            _ => return Err(invalid("a finite number")),
        },
        Some(ColumnType::Bool) => {
            if raw.eq_ignore_ascii_case("true") || raw == "1" {
                Value::Bool(true)
            } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
                Value::Bool(false)
            } else {
                return Err(invalid("true or false"));
            }
        }
        Some(ColumnType::Timestamptz) => {
            let ts = DateTime::parse_from_rfc3339(raw).map_err(|_| invalid("an RFC 3339 timestamp"))?;
            Value::String(ts.to_rfc3339())
        }
        _ => Value::String(raw.to_string()),
    })
}

/// Exact-match filtering on the model's concrete fields (scalars and foreign keys).
#[derive(Clone, Debug, Default)]
pub struct FieldFilterBackend;

impl FilterBackend for FieldFilterBackend {
    fn name(&self) -> &str {
        "FieldFilterBackend"
    }

    fn filterset(&self, view: &RouteEntry) -> Option<Result<Option<FilterSet>, SchemaError>> {
        let fields: Vec<FilterField> = view
            .queryset
            .model
            .concrete_fields()
            .map(|f| FilterField {
                name: f.name.clone(),
                label: None,
                required: false,
            })
            .collect();
        Some(Ok((!fields.is_empty()).then_some(FilterSet { fields })))
    }

    fn filter_queryset(
        &self,
        view: &RouteEntry,
        params: &HashMap<String, String>,
    ) -> Result<Vec<(String, Value)>, AppError> {
        let mut filters = Vec::new();
        for field in view.queryset.model.concrete_fields() {
            if let Some(raw) = params.get(&field.name) {
                filters.push((field.name.clone(), typed_value(field, raw)?));
            }
        }
        Ok(filters)
    }
}

/// Describes `limit` / `offset`; the list handler applies them.
#[derive(Clone, Debug, Default)]
pub struct PaginationBackend;

impl FilterBackend for PaginationBackend {
    fn name(&self) -> &str {
        "PaginationBackend"
    }

    fn schema_operation_parameters(&self, _view: &RouteEntry) -> Option<Result<Vec<FilterParameter>, SchemaError>> {
        Some(Ok(vec![
            FilterParameter::query("limit", "Number of results to return (default 100, max 1000).", "integer"),
            FilterParameter::query("offset", "Index of the first result.", "integer"),
        ]))
    }
}

pub fn default_filter_backends() -> Vec<Arc<dyn FilterBackend>> {
    vec![Arc::new(FieldFilterBackend), Arc::new(PaginationBackend)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::registry;
    use crate::routes::{routes_for, Action};

    fn list_entry() -> RouteEntry {
        let registry = registry().unwrap();
        routes_for(&registry, "inscriptions", "api/inscriptions", &[])
            .unwrap()
            .into_iter()
            .find(|e| e.action == Action::List && e.extra["model"] == "inscription")
            .unwrap()
    }

    #[test]
    fn field_filters_are_typed() {
        let entry = list_entry();
        let params = HashMap::from([
            ("min_year".to_string(), "1100".to_string()),
            ("title".to_string(), "Graffito".to_string()),
            ("tags".to_string(), "3".to_string()),
        ]);
        let filters = FieldFilterBackend.filter_queryset(&entry, &params).unwrap();
        assert_eq!(
            filters,
            vec![
                ("title".to_string(), Value::from("Graffito")),
                ("min_year".to_string(), Value::from(1100)),
            ]
        );
    }

    #[test]
    fn bad_integer_is_a_bad_request() {
        let entry = list_entry();
        let params = HashMap::from([("panel".to_string(), "abc".to_string())]);
        assert!(matches!(
            FieldFilterBackend.filter_queryset(&entry, &params),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn values_outside_the_column_type_are_bad_requests() {
        let entry = list_entry();
        for (name, raw) in [
            ("min_year", "99999999999"),
            ("created_at", "notadate"),
            ("elevation", "NaN"),
            ("id", "1.5"),
        ] {
            let params = HashMap::from([(name.to_string(), raw.to_string())]);
            assert!(
                matches!(FieldFilterBackend.filter_queryset(&entry, &params), Err(AppError::BadRequest(_))),
                "{name}={raw}"
            );
        }
    }

    #[test]
    fn timestamps_are_normalised() {
        let entry = list_entry();
        let params = HashMap::from([("created_at".to_string(), "2024-08-12T12:00:00Z".to_string())]);
        let filters = FieldFilterBackend.filter_queryset(&entry, &params).unwrap();
        assert_eq!(filters, vec![("created_at".to_string(), Value::from("2024-08-12T12:00:00+00:00"))]);
    }

    #[test]
    fn filterset_falls_back_to_string_parameters() {
        let entry = list_entry();
        let set = FieldFilterBackend.filterset(&entry).unwrap().unwrap().unwrap();
        let params = set.parameters();
        let panel = params.iter().find(|p| p.name == "panel").unwrap();
        assert_eq!(panel.location, "query");
        assert_eq!(panel.description, "panel");
        assert_eq!(panel.schema.ty, "string");
        assert!(!panel.required);
        assert!(params.iter().all(|p| p.name != "tags"));
    }
}
