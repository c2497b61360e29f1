//! Unified error types for the `postcms` crate.
//!
//! This module centralizes all failures that can occur while using the SDK and
//! provides a single top-level [`Error`] enum plus the convenient [`Result`] alias.
//! Errors from lower layers (`reqwest`, `serde_json`, URL parsing, the token store)
//! are mapped into structured variants so callers can handle them precisely.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Build-Time Error ---

/// Errors that can occur while building a [`crate::PostCms`] client.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to build the HTTP client (reqwest configuration).
    #[error("Failed to build the HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// The tenant host or base URL override is not a valid URL.
    #[error("Invalid base URL: {0}")]
    Url(#[from] url::ParseError),

    /// The tenant id cannot be used as a subdomain.
    #[error("Invalid tenant id: {0:?}")]
    InvalidTenant(String),
}

// --- The Main Operational Error Enum ---

/// The crate’s top-level error type.
///
/// It groups failures into high-level categories:
/// - [`Error::Request`]: HTTP transport, cancellation, or decoding issues
/// - [`Error::Api`]: the backend answered with an error envelope
/// - [`Error::Parse`]: URL parsing failures
/// - [`Error::Store`]: the session token could not be read or written
/// - [`Error::Build`]: construction of the client failed
///
/// Most lower-level errors automatically convert into this enum via `From`.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request/response failed (transport, abort, validation, JSON).
    #[error("Request failed: {0}")]
    Request(#[from] RequestError),

    /// The backend returned `{ error: { status, message } }`.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// URL parsing failed while preparing a request.
    #[error("Failed to parse URL: {0}")]
    Parse(#[from] url::ParseError),

    /// Reading or writing the persisted session token failed.
    #[error("Token store error: {0}")]
    Store(#[from] StoreError),

    /// Building the client failed.
    #[error("Client build failed: {0}")]
    Build(#[from] BuildError),
}

impl Error {
    /// Returns the backend error envelope, if this is one.
    #[must_use]
    pub const fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the backend rejected the session token.
    ///
    /// Covers a `401` error envelope as well as a bare HTTP 401 without a JSON body.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Api(err) => err.is_unauthorized(),
            Self::Request(RequestError::Server { status, .. }) => {
                *status == reqwest::StatusCode::UNAUTHORIZED
            }
            _ => false,
        }
    }

    /// Returns true if the request was cancelled through a [`crate::FetchController`].
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Request(RequestError::Aborted))
    }
}

// --- Application-level error envelope ---

/// Error object carried in the `error` field of a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{status} - {message}")]
pub struct ApiError {
    /// Status code chosen by the backend (usually mirrors HTTP).
    pub status: u16,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// True for `401`, meaning the session token is no longer accepted.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

// --- Consolidated Request Error ---

/// Transport and decoding errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Network/protocol failure from reqwest (timeouts, TLS, I/O, etc.).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server returned a non-success status without a JSON error envelope.
    #[error("Server responded with an error: {status} - {message}")]
    Server {
        /// The HTTP status code returned by the server.
        status: reqwest::StatusCode,
        /// Short description or the server response body captured for context.
        message: String,
    },

    /// Caller supplied an invalid endpoint/argument for this API.
    #[error("Invalid request: {message}")]
    Validation {
        /// Human-readable explanation of what was invalid.
        message: String,
    },

    /// JSON decoding failed when parsing a server response.
    #[error("JSON decode error: {message}")]
    DecodeJson {
        /// Error message from the JSON deserializer (with context if available).
        message: String,
    },

    /// The request was aborted through its [`crate::FetchController`].
    #[error("The request was aborted")]
    Aborted,
}

// --- Token store errors ---

/// Failures of a [`crate::TokenStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for `postcms` operations.
pub type Result<T> = std::result::Result<T, Error>;

// Ergonomic "Staircase" From Implementations ---
// A macro to reduce boilerplate for converting base errors into the top-level Error.
macro_rules! impl_from_for_error {
    ($from_type:ty, $to_variant:path) => {
        impl From<$from_type> for Error {
            fn from(err: $from_type) -> Self {
                $to_variant(err.into())
            }
        }
    };
}

// Request Errors
impl_from_for_error!(reqwest::Error, Error::Request);
