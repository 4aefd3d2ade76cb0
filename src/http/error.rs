use crate::error::{AiblockError, PipelineError, Stage};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    stage: Option<&'static str>,
    detail: String,
}

/// An error rendered as `{"error", "stage", "detail"}` with a mapped status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    stage: Option<Stage>,
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(error: &AiblockError) -> StatusCode {
    match error {
        AiblockError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AiblockError::NoContext => StatusCode::NOT_FOUND,
        AiblockError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AiblockError::Generation(_) | AiblockError::Execution(_) => StatusCode::BAD_GATEWAY,
        AiblockError::ExecutionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AiblockError> for ApiError {
    fn from(error: AiblockError) -> Self {
        Self {
            status: status_for(&error),
            kind: error.kind(),
            stage: None,
            detail: error.to_string(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        Self {
            stage: Some(error.stage),
            ..ApiError::from(error.source)
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::from(AiblockError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind,
            stage: self.stage.map(|s| s.as_str()),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
