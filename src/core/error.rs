//! # Error Handling Module
//!
//! This module defines every failure the authentication core can report, using the
//! `thiserror` crate, together with the HTTP status each one maps to.
//!
//! ## Failure Taxonomy
//!
//! Authentication outcomes map onto distinct variants:
//! - `InvalidToken`: signature or structure failure while parsing a token. The gateway
//!   swallows it and treats the request as anonymous, so it is never rendered verbatim.
//! - `InvalidCredentials`: a login identifier/password pair matched no identity store (401).
//! - `ResolverUnavailable`: an identity store itself failed (500). Never conflated with
//!   bad credentials.
//! - `IdentityNotFound`: push-token attach found no identity with the given id (404).
//! - `UnauthenticatedAccess`: a protected route was reached with no bound principal (401).
//!
//! ## Rust Concepts Used
//!
//! - `#[derive(Error)]` generates `Display` and `std::error::Error` from the attributes
//! - `IntoResponse` lets handlers return `ClubResult<T>` and have axum render the error
//! - `From` impls make the `?` operator convert library errors automatically

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::token::TokenError;

/// Main result type used throughout the crate
pub type ClubResult<T> = Result<T, ClubError>;

/// Error types for the authentication core and its HTTP surface
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClubError {
    /// Configuration-related errors (invalid config, missing files, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Token failed signature verification or is structurally malformed
    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    /// Identifier/password pair matched no identity store
    #[error("Invalid identifier or password")]
    InvalidCredentials,

    /// An identity store failed while resolving an identity
    #[error("Identity resolver unavailable: {store} store - {reason}")]
    ResolverUnavailable { store: String, reason: String },

    /// No identity store contains the given id
    #[error("Identity not found: {identity_id}")]
    IdentityNotFound { identity_id: String },

    /// A protected route was reached without an authenticated principal
    #[error("Authentication required for {path}")]
    UnauthenticatedAccess { path: String },

    /// Registration collided with an existing identity in the same store
    #[error("Identity already exists: {identity_id}")]
    IdentityExists { identity_id: String },

    /// Request validation errors (empty fields, malformed body, etc.)
    #[error("Request validation failed: {field} - {reason}")]
    RequestValidation { field: String, reason: String },

    /// Raw failure reported by an identity store
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// I/O errors (file operations, socket binding, etc.)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl ClubError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a storage error with a custom message
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a validation error for a specific field
    pub fn validation<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::RequestValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an identity-not-found error
    pub fn identity_not_found<S: Into<String>>(identity_id: S) -> Self {
        Self::IdentityNotFound {
            identity_id: identity_id.into(),
        }
    }

    /// Create an unauthenticated-access error for a request path
    pub fn unauthenticated<S: Into<String>>(path: S) -> Self {
        Self::UnauthenticatedAccess { path: path.into() }
    }

    /// Wrap a store failure as a resolver failure
    pub fn resolver_unavailable<S: Into<String>>(store: S, cause: &ClubError) -> Self {
        Self::ResolverUnavailable {
            store: store.into(),
            reason: cause.to_string(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UnauthenticatedAccess { .. } => StatusCode::UNAUTHORIZED,
            Self::IdentityNotFound { .. } => StatusCode::NOT_FOUND,
            Self::IdentityExists { .. } => StatusCode::CONFLICT,
            Self::RequestValidation { .. } => StatusCode::BAD_REQUEST,
            Self::Json { .. } => StatusCode::BAD_REQUEST,
            Self::ResolverUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::InvalidToken { .. } => "invalid_token",
            Self::InvalidCredentials => "invalid_credentials",
            Self::ResolverUnavailable { .. } => "resolver_unavailable",
            Self::IdentityNotFound { .. } => "identity_not_found",
            Self::UnauthenticatedAccess { .. } => "unauthenticated",
            Self::IdentityExists { .. } => "identity_exists",
            Self::RequestValidation { .. } => "request_validation_error",
            Self::Storage { .. } => "storage_error",
            Self::Internal { .. } => "internal_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
        }
    }

    /// Message that is safe to hand to a client
    ///
    /// Server-side failures are reduced to a generic text so store and I/O details stay
    /// in the logs.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<TokenError> for ClubError {
    fn from(err: TokenError) -> Self {
        Self::InvalidToken {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ClubError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ClubError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Render errors as `{"error": {"code", "message", "type"}}`
impl IntoResponse for ClubError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed with server error");
        }

        let error_response = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.public_message(),
                "type": self.error_type(),
            }
        });

        (status, Json(error_response)).into_response()
    }
}
