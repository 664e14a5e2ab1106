use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("`{value}` is not a supported {field}")]
    Unknown { field: &'static str, value: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn unknown(field: &'static str, value: impl Into<String>) -> Self {
        Self::Unknown {
            field,
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
