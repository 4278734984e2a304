//! Typed errors for the fallible boundaries the Registry itself doesn't
//! own: HTTP handlers, object-store I/O, and configuration loading.
//!
//! Wire-level errors returned to a socket are `pairsync_proto::ErrorCode`,
//! not this type; this covers the ambient service surface around it.

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("missing required field {0:?}")]
    MissingField(&'static str),

    #[error("unknown room or transfer: {0}")]
    NotFound(String),

    #[error("object store error: {0}")]
    ObjectStore(#[from] crate::object_store::ObjectStoreError),

    #[error("registry actor unavailable: {0}")]
    RegistryUnavailable(#[from] actix::MailboxError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ResponseError for CoordinatorError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::MissingField(_) => HttpResponse::BadRequest().json(ErrorBody::from(self)),
            Self::NotFound(_) => HttpResponse::NotFound().json(ErrorBody::from(self)),
            Self::ObjectStore(crate::object_store::ObjectStoreError::NotFound(_)) => {
                HttpResponse::NotFound().json(ErrorBody::from(self))
            }
            Self::ObjectStore(_) | Self::RegistryUnavailable(_) | Self::Config(_) => {
                HttpResponse::InternalServerError().json(ErrorBody::from(self))
            }
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl From<&CoordinatorError> for ErrorBody {
    fn from(e: &CoordinatorError) -> Self {
        Self { error: e.to_string() }
    }
}
