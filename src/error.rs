use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::mail::MailError;
use crate::store::StoreError;

/// Handler-level failure, rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal Server Error")]
    Store(#[from] StoreError),
    #[error("Failed to send email")]
    Mail(#[from] MailError),
    #[error("Internal Server Error")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Mail(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Store(StoreError::Conflict(msg)) => msg.clone(),
            AppError::Store(StoreError::NotFound) => "Not found".to_string(),
            other => other.to_string(),
        };
        if self.status_code().is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
