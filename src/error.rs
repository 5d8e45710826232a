//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup-time and job-setup problems. Always fatal for the caller.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no installed app with label '{0}'")]
    AppNotFound(String),
    #[error("app '{0}' is already registered")]
    DuplicateApp(String),
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("duplicate route: {method} {pattern}")]
    DuplicateRoute { method: String, pattern: String },
    #[error("CSV must have '{0}' column")]
    MissingColumn(String),
    #[error("no matching model fields found in CSV")]
    NoMatchingColumns,
    #[error("documentation {what} '{value}' contains HTML markup characters")]
    UnsafeMarkup { what: &'static str, value: String },
    #[error("invalid setting {name}: {message}")]
    InvalidSetting { name: &'static str, message: String },
}

/// Failures while describing a route for the OpenAPI document. Never fatal.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("path '{0}' has fewer than three segments; cannot infer a tag")]
    ShallowPath(String),
    #[error("filter backend {backend}: {message}")]
    Backend { backend: String, message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for surface {surface}")]
    UpstreamStatus { status: u16, surface: String },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Http(_) | AppError::UpstreamStatus { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            AppError::Csv(_) | AppError::Io(_) | AppError::Json(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        // Server-side detail (SQL text, file paths) stays in the log.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn database_errors_do_not_reach_the_client() {
        let err = AppError::Db(sqlx::Error::Protocol("invalid input syntax for type bigint".into()));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "database_error");
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn bad_requests_explain_themselves() {
        let (status, body) = body_of(AppError::BadRequest("limit must be an integer".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "bad request: limit must be an integer");
    }
}
