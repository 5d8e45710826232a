//! HTTP handlers for generated model routes and API documentation.

pub mod docs;
pub mod model;
