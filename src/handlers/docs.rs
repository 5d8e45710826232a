//! Documentation handlers: OpenAPI JSON and the ReDoc page.

use crate::error::ConfigError;
use axum::response::Html;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

pub async fn schema_document(document: Arc<Value>) -> Json<Value> {
    Json(document.as_ref().clone())
}

/// Title and schema URL come from the route registry, never from a request; anything that would
/// need escaping is a registry mistake and refused.
fn markup_free(what: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.contains(['<', '>', '&', '"', '\'']) {
        return Err(ConfigError::UnsafeMarkup {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub fn render_redoc(title: &str, schema_url: &str) -> Result<String, ConfigError> {
    markup_free("title", title)?;
    markup_free("schema url", schema_url)?;
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>body {{ margin: 0; padding: 0; }}</style>
  </head>
  <body>
    <redoc spec-url="{schema_url}"></redoc>
    <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
  </body>
</html>
"#
    ))
}

/// Serves a page rendered once at startup.
pub async fn redoc_page(page: Arc<String>) -> Html<String> {
    Html(page.as_ref().clone())
}
