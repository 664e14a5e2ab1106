use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::application::error::{ErrorReport, LoadError};

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
}

/// JSON error response carrying the diagnostic the response logger reports.
#[derive(Debug)]
pub struct ApiError {
    source: &'static str,
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    detail: String,
}

impl ApiError {
    pub fn from_load(source: &'static str, err: LoadError) -> Self {
        if err.is_internal() {
            error!(source, kind = %err.kind(), detail = %err.message(), "Internal loader failure");
        }
        Self {
            source,
            status: err.status_code(),
            code: err.boundary_kind().as_str(),
            message: err.presentation_message(),
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        Self::from_load("infra::http", err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(self.source, self.status, self.detail).attach(&mut response);
        response
    }
}
