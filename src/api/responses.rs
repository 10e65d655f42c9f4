//! API response and error types

use crate::utils::error::OcrError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Response for `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

/// Response for `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Response for `POST /extract-text`
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractTextResponse {
    pub text: String,
    pub pages: usize,
}

/// 錯誤回應，格式為 `{"detail": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Client errors keep their own message; everything else is prefixed with
    /// the operation that failed.
    pub fn from_processing(operation: &str, err: OcrError) -> Self {
        match &err {
            OcrError::MissingUpload { .. } | OcrError::MalformedUpload { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            OcrError::UploadTooLarge { .. } => Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
            _ if err.is_client_error() => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            OcrError::ServiceUnavailable { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, format!("{}: {}", operation, err))
            }
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{}: {}", operation, err),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{} {}", self.status, self.detail);
        } else {
            tracing::debug!("{} {}", self.status, self.detail);
        }
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}
