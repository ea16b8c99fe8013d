//! Runtime error types for the Restfit dispatcher.
//!
//! [`RestfitError`] is the single error kind raised by the dispatcher, the
//! converter pipeline and the request builder. Whether an error reaches the
//! caller depends on the declared return type of the generated function:
//! `Option<T>` functions suppress every error to `None`, `Result<T, E>`
//! functions propagate it unchanged.
//!
//! [`TransportError`] is raised by [`crate::HttpTransport`] implementations
//! and is normalised into [`crate::CallResult::Failure`] before any converter
//! sees it.

use thiserror::Error;

/// Convenience alias used throughout the runtime and by generated code.
pub type Result<T, E = RestfitError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Base URL validation reasons
// ---------------------------------------------------------------------------

/// Reported when the configured base URL is empty.
pub const BASE_URL_REQUIRED: &str = "Base URL required";

/// Reported when the configured base URL does not end with `/`.
pub const BASE_URL_NEEDS_TRAILING_SLASH: &str = "Base URL needs to end with /";

/// Reported when the configured base URL is not an `http` or `https` URL.
pub const BASE_URL_SCHEME_NOT_FOUND: &str = "Expected URL scheme 'http' or 'https' was not found";

// ---------------------------------------------------------------------------
// Dispatcher errors
// ---------------------------------------------------------------------------

/// Errors raised while building, executing or converting a request.
#[derive(Debug, Error)]
pub enum RestfitError {
    /// A blocking function was called but no registered response converter
    /// claims its return type.
    #[error("Add a ResponseConverter for {type_name} or make function async")]
    NoResponseConverter {
        /// Rendered [`crate::TypeData`] of the declared return type.
        type_name: String,
    },

    /// An async function was called but neither a registered suspend
    /// converter nor the built-in default converter can produce its return type.
    #[error("No SuspendResponseConverter found for {type_name}")]
    NoSuspendResponseConverter {
        /// Rendered [`crate::TypeData`] of the declared return type.
        type_name: String,
    },

    /// No registered parameter converter handles the requested conversion.
    #[error("No RequestConverter found to convert {parameter_type} to {request_type}")]
    NoParameterConverter {
        /// Declared type of the function argument.
        parameter_type: String,
        /// Type the argument must be converted into.
        request_type: String,
    },

    /// A converter produced a value whose concrete type is not the one the
    /// call site asked for.
    #[error("Converter produced a value that is not a {expected}")]
    TypeMismatch {
        /// Rust name of the expected type.
        expected: String,
    },

    /// A non-nullable call completed without producing a value.
    #[error("Expected a value of type {type_name} but the call produced none")]
    MissingValue {
        /// Qualified name of the declared return type.
        type_name: String,
    },

    /// The base URL given to [`crate::RestfitBuilder`] was rejected.
    #[error("{reason}: {base_url}")]
    InvalidBaseUrl {
        /// The rejected value.
        base_url: String,
        /// One of the `BASE_URL_*` constants.
        reason: &'static str,
    },

    /// The request URL could not be resolved against the base URL.
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        /// The relative or absolute URL that failed to parse.
        url: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The request builder finished without an HTTP method.
    #[error("No HTTP method set for request to '{url}'")]
    MissingMethod {
        /// Target URL of the request.
        url: String,
    },

    /// The server answered with a non-success status while
    /// [`crate::RestfitBuilder::expect_success`] is enabled.
    #[error("Request to {url} failed with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Target URL of the request.
        url: String,
        /// The full response, available to converters that want to inspect it.
        response: Box<crate::HttpResponse>,
    },

    /// The transport failed before a response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request body could not be serialised.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A response body could not be decoded into the declared type.
    #[error("Failed to decode response body as {type_name}: {message}")]
    Decode {
        /// Name of the target type.
        type_name: String,
        /// Description of the decoding failure.
        message: String,
    },

    /// Raised by user converters that need to report their own failure.
    #[error("{0}")]
    Converter(String),
}

impl RestfitError {
    /// Creates a [`RestfitError::MissingValue`] for `type_name`.
    ///
    /// Used by generated code when a non-nullable call produced nothing.
    pub fn missing_value(type_name: impl Into<String>) -> Self {
        Self::MissingValue {
            type_name: type_name.into(),
        }
    }

    /// Creates a [`RestfitError::Converter`] carrying `message`.
    pub fn converter(message: impl Into<String>) -> Self {
        Self::Converter(message.into())
    }

    /// Returns the HTTP status when this error stems from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure reported by an [`crate::HttpTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The method token cannot be represented by the underlying client.
    #[error("Invalid HTTP method '{method}'")]
    InvalidMethod {
        /// The method token as given.
        method: String,
    },

    /// Failure inside `reqwest` (connection, TLS, timeout, body read).
    #[error("HTTP transport failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Failure reported by a custom transport.
    #[error("HTTP transport failed: {0}")]
    Other(String),
}
