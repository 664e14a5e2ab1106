use std::error::Error as StdError;
use std::fmt;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::application::repos::RepoError;
use crate::application::upstream::UpstreamError;
use crate::{domain::error::DomainError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failure classes surfaced by the loader layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAttribute,
    RecordNotFound,
    ServerInternal,
    /// Fingerprint or cached payload could not be (de)serialized.
    InternalSerialization,
    /// A loader was requested that the registry never wired.
    InternalConfig,
    Cancelled,
    Unauthorized,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidAttribute => "invalid_attribute",
            ErrorKind::RecordNotFound => "record_not_found",
            ErrorKind::ServerInternal => "server_internal",
            ErrorKind::InternalSerialization => "internal_serialization",
            ErrorKind::InternalConfig => "internal_config",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-key load failure. Cheap to clone so one memoized result can reach every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct LoadError {
    kind: ErrorKind,
    message: String,
}

impl LoadError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_attribute(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidAttribute, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RecordNotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerInternal, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalSerialization, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalConfig, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request context cancelled")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Single-resource Service failure: the not-found sentinel keeps its meaning.
    pub fn from_repo(operation: &'static str, error: &RepoError) -> Self {
        match error {
            RepoError::NotFound => Self::not_found(format!("{operation}: {error}")),
            other => Self::internal(format!("{operation}: {other}")),
        }
    }

    /// List Service failure: every error, not-found included, is internal.
    pub fn from_repo_list(operation: &'static str, error: &RepoError) -> Self {
        Self::internal(format!("{operation}: {error}"))
    }

    pub fn from_upstream(operation: &'static str, error: &UpstreamError) -> Self {
        Self::internal(format!("{operation}: {error}"))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Programming errors that present as `ServerInternal` but are logged distinctly.
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InternalSerialization | ErrorKind::InternalConfig
        )
    }

    /// The kind protocol surfaces should present.
    pub fn boundary_kind(&self) -> ErrorKind {
        if self.is_internal() {
            ErrorKind::ServerInternal
        } else {
            self.kind
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.boundary_kind() {
            ErrorKind::InvalidAttribute => StatusCode::BAD_REQUEST,
            ErrorKind::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn presentation_message(&self) -> &'static str {
        match self.boundary_kind() {
            ErrorKind::InvalidAttribute => "You passed an invalid value for the attributes.",
            ErrorKind::RecordNotFound => "Record Not Found",
            ErrorKind::Unauthorized => "Unauthorized",
            _ => "Internal Server Error",
        }
    }
}

impl From<DomainError> for LoadError {
    fn from(error: DomainError) -> Self {
        Self::invalid_attribute(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
