//! Error types and error codes for Adega
//!
//! This module defines:
//! - `AdegaError`: Application-specific error enum
//! - `AppError`: Wrapper for integration with a request-handling layer
//! - `ErrorCode`: Structured error codes for API responses

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum AdegaError {
    /// No supported encoding could decode an uploaded CSV payload.
    #[error("could not decode CSV file: {0}")]
    Decode(String),

    /// A required column was absent from an uploaded CSV header row.
    #[error("required column not found: {0}")]
    MissingColumn(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Wrapper for application errors
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

// General success and error codes
pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

// Upload error codes
pub const UPLOAD_FILE_EMPTY: ErrorCode<'static> = ErrorCode {
    code: 100010,
    message: "uploaded file is empty",
};

pub const UPLOAD_DECODE_FAILED: ErrorCode<'static> = ErrorCode {
    code: 100004,
    message: "failed to decode uploaded file",
};

pub const UPLOAD_COLUMN_MISSING: ErrorCode<'static> = ErrorCode {
    code: 100011,
    message: "required column missing in uploaded file",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adega_error_display() {
        let err = AdegaError::MissingColumn("client code".to_string());
        assert_eq!(format!("{}", err), "required column not found: client code");

        let err = AdegaError::NotFound("equipment 42".to_string());
        assert_eq!(format!("{}", err), "equipment 42 not found");

        let err = AdegaError::Decode("unknown code page".to_string());
        assert_eq!(
            format!("{}", err),
            "could not decode CSV file: unknown code page"
        );
    }

    #[test]
    fn test_error_code_constants() {
        assert_eq!(SUCCESS.code, 0);
        assert_eq!(SUCCESS.message, "success");
        assert_eq!(RESOURCE_CONFLICT.code, 20005);
    }

    #[test]
    fn test_app_error_downcast() {
        let app_err = AppError::from(anyhow::Error::new(AdegaError::Conflict(
            "tag already registered".to_string(),
        )));
        assert_eq!(format!("{}", app_err), "tag already registered");
        assert!(matches!(
            app_err.downcast_ref::<AdegaError>(),
            Some(AdegaError::Conflict(_))
        ));
    }
}
