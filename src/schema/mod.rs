//! Schema generation: filter backends, per-route inspection, and the OpenAPI document.

pub mod filters;
pub mod inspector;
pub mod openapi;

pub use filters::{
    default_filter_backends, FieldFilterBackend, FilterBackend, FilterField, FilterParameter, FilterSet,
    PaginationBackend, ParameterSchema,
};
pub use inspector::AutoSchema;
pub use openapi::{openapi_for, SchemaInfo};
