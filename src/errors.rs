use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid payload")]
    Validation(#[from] ValidationError),

    #[error("malformed id: {0}")]
    MalformedId(String),

    #[error("Not found")]
    NotFound,

    /// Store failure while reading; the cause is logged, not returned.
    #[error("database error")]
    Database(anyhow::Error),

    /// Store refused a write or lookup the client asked for.
    #[error("{0}")]
    Rejected(anyhow::Error),

    #[error("Internal Server Error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MalformedId(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Rejected(_) => StatusCode::BAD_REQUEST,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An unreadable body (wrong content type, broken JSON) is an invalid payload.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationError::single("body", &rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation(err) => serde_json::json!({
                "error": self.to_string(),
                "details": err.fields,
            }),
            AppError::Database(e) => {
                tracing::error!(error = %format!("{e:#}"), "store read failed");
                serde_json::json!({ "error": self.to_string() })
            }
            AppError::Rejected(e) => {
                tracing::warn!(error = %format!("{e:#}"), "store rejected request");
                serde_json::json!({ "error": self.to_string() })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}
