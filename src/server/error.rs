//! Request errors and their HTTP mapping.
//!
//! Every failure is returned as `{"error": "..."}` with a status that says
//! whose fault it was: 400 for anything wrong with the request itself, 413
//! for oversize bodies, 422 when the effect rejects otherwise valid input,
//! 500 for everything else.

use crate::effects::ParamError;
use crate::imaging::BackendError;
use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("no image uploaded: send multipart/form-data with a `file` field")]
    MissingFile,
    #[error("uploaded file is empty")]
    EmptyFile,
    #[error(transparent)]
    Params(#[from] ParamError),
    #[error("{}", .0.body_text())]
    Multipart(#[from] MultipartError),
    #[error("{}", .0.body_text())]
    NotMultipart(#[from] MultipartRejection),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("server is shutting down")]
    Closed(#[from] tokio::sync::AcquireError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::EmptyFile | ApiError::Params(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Multipart(e) => e.status(),
            ApiError::NotMultipart(e) => e.status(),
            ApiError::Backend(BackendError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Backend(BackendError::InvalidInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Backend(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Closed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, "{message}");
        } else {
            tracing::debug!(%status, "{message}");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
