//! Error taxonomy and HTTP response mapping
//!
//! Every failure a handler can produce is one variant of [`HandlerError`].
//! The actix `ResponseError` impl is the single place where outcomes become
//! status codes and bodies; backend detail is logged there and never sent
//! to the caller.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::{error, warn};
use thiserror::Error;

/// The request body could not be turned into the expected payload shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid JSON payload: {0}")]
    MalformedJson(String),

    #[error("Request body is not valid UTF-8 text.")]
    InvalidText,

    #[error("Request body exceeds the maximum payload size.")]
    PayloadTooLarge,

    #[error("Failed to read request body: {0}")]
    PayloadRead(String),

    #[error("Missing Content-Type header.")]
    MissingContentType,

    #[error("Content-Type must be multipart/form-data.")]
    NotMultipart,

    #[error("Missing multipart boundary.")]
    MissingBoundary,

    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    #[error("No file found in the request.")]
    NoFileFound,
}

/// A decoded payload broke a structural or business rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid product data.")]
    InvalidProduct,

    #[error("Invalid product identifier.")]
    InvalidRowKey,

    #[error("Invalid order data.")]
    InvalidOrder,

    #[error("Request body is empty.")]
    EmptyText,

    #[error("File exceeds the maximum upload size.")]
    FileTooLarge,

    #[error("File type is not allowed.")]
    FileTypeNotAllowed,
}

/// Outcome of a failed backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict on {0}")]
    Conflict(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn backend(detail: impl std::fmt::Display) -> Self {
        StorageError::Backend(detail.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Backend(format!("io: {}", err))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(format!("sqlite: {}", err))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(format!("serialization: {}", err))
    }
}

/// Everything a request handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage configuration error: {0}")]
    Configuration(String),

    #[error("{entity} not found: {detail}")]
    NotFound { entity: &'static str, detail: String },

    #[error("{entity} conflict: {detail}")]
    Conflict { entity: &'static str, detail: String },

    #[error("{entity} backend failure: {detail}")]
    Backend { entity: &'static str, detail: String },
}

impl HandlerError {
    /// Attach the entity kind to a backend outcome.
    pub fn storage(entity: &'static str, err: StorageError) -> Self {
        match err {
            StorageError::NotFound(detail) => HandlerError::NotFound { entity, detail },
            StorageError::Conflict(detail) => HandlerError::Conflict { entity, detail },
            StorageError::Backend(detail) => HandlerError::Backend { entity, detail },
        }
    }

    /// Body text sent to the caller. Never carries backend detail.
    pub fn user_message(&self) -> String {
        match self {
            HandlerError::Decode(e) => e.to_string(),
            HandlerError::Validation(e) => e.to_string(),
            HandlerError::Configuration(_) => "Storage is not configured.".to_string(),
            HandlerError::NotFound { entity, .. } => format!("{} not found.", entity),
            HandlerError::Conflict { entity, .. } => {
                format!("{} conflicts with an existing or newer version.", entity)
            }
            HandlerError::Backend { .. } => "An internal error occurred.".to_string(),
        }
    }
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::Decode(_) | HandlerError::Validation(_) => StatusCode::BAD_REQUEST,
            HandlerError::NotFound { .. } => StatusCode::NOT_FOUND,
            // Conflicts stay inside the 200/400/404/500 status set.
            HandlerError::Configuration(_)
            | HandlerError::Conflict { .. }
            | HandlerError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status.as_u16(), self);
        } else {
            warn!("Request rejected with {}: {}", status.as_u16(), self);
        }
        HttpResponse::build(status)
            .content_type("text/plain; charset=utf-8")
            .body(self.user_message())
    }
}
