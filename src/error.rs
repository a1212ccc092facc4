use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{credentials::CredentialError, repository::RepositoryError, storage::StorageError};

/// ValidationError
///
/// A submission was rejected before any side effect took place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field `{0}` is required")]
    MissingField(&'static str),
    #[error("an uploaded file is required")]
    MissingFile,
    #[error("the uploaded file is empty")]
    EmptyFile,
    #[error("the uploaded file is {size} bytes, the limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// SubmissionError
///
/// Failure taxonomy of the submission workflow. Each variant is scoped to the
/// single request that produced it.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("blob store write failed: {0}")]
    BlobStore(#[source] StorageError),
    #[error("resource insert failed: {0}")]
    Repository(#[from] RepositoryError),
}

pub type AppResult<T> = Result<T, AppError>;

/// AppError
///
/// HTTP-facing error. Internal details are logged where the error is converted
/// and the client only sees a generic message for 5xx responses.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::conflict(msg),
            other => {
                tracing::error!(error = ?other, "repository operation failed");
                Self::internal("Database operation failed")
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => Self::not_found(format!("No file named {name}")),
            StorageError::InvalidName(name) => Self::bad_request(format!("Invalid filename {name}")),
            other => {
                tracing::error!(error = ?other, "blob store operation failed");
                Self::internal("File storage failed")
            }
        }
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(e) => e.into(),
            SubmissionError::BlobStore(e) => e.into(),
            SubmissionError::Repository(e) => e.into(),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            CredentialError::EmailTaken => Self::conflict("Email already exists"),
            CredentialError::MissingField(field) => {
                Self::bad_request(format!("field `{field}` is required"))
            }
            CredentialError::Hashing(msg) => {
                tracing::error!(error = %msg, "password hashing failed");
                Self::internal("Authentication failed")
            }
            CredentialError::Token(e) => {
                tracing::error!(error = ?e, "token issuance failed");
                Self::internal("Authentication failed")
            }
            CredentialError::Repository(e) => e.into(),
        }
    }
}
