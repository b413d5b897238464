//! Error types for credwatch.
//!
//! Failures below the polling pipeline are translated into one of the
//! variants of [`Error`] before they cross that boundary, so callers can tell
//! a rejected token apart from an unreachable server or a malformed payload.

use thiserror::Error;

/// The unified error type for credwatch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Logging in (or refreshing the session) failed or timed out.
    #[error("authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// A single API call was rejected with HTTP 401.
    ///
    /// Recoverable by one refresh-and-retry inside the pipeline.
    #[error("token rejected by {endpoint}")]
    AuthFailed { endpoint: String },

    /// Non-authentication HTTP failure.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// The response did not have the expected shape.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// The notification channel could not be reached.
    #[error("notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Persisted state could not be written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Check if this is a rejected-token error.
    pub fn is_auth_failed(&self) -> bool {
        matches!(self, Error::AuthFailed { .. })
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Authentication(_) => "authentication",
            Error::AuthFailed { .. } => "auth_failed",
            Error::Api(_) => "api",
            Error::Transform(_) => "transform",
            Error::Notification(_) => "notification",
            Error::Storage(_) => "storage",
        }
    }
}

/// Login and refresh failures.
///
/// Cloneable so a single failed login can be fanned out to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// The login flow reported failure.
    #[error("login failed: {reason}")]
    LoginFailed { reason: String },

    /// The login flow did not finish in time.
    #[error("login timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The login flow finished but produced no usable token.
    #[error("login produced no token: {reason}")]
    MissingToken { reason: String },

    /// A freshly acquired token was rejected as well.
    #[error("token rejected again after re-authentication")]
    TokenRejected,
}

/// Non-authentication failures from the downstream API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status other than 401.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response.
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The response body was not JSON.
    #[error("invalid response body from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// The client could not be configured.
    #[error("invalid client configuration: {message}")]
    Configuration { message: String },
}

/// Unexpected response shapes.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A required field is absent.
    #[error("missing field `{field}`")]
    MissingField { field: String },

    /// A field is present but unusable.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

/// Notification delivery failures. Logged, never propagated.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The channel could not be reached.
    #[error("delivery failed: {message}")]
    Delivery { message: String },

    /// The channel answered with a non-2xx status.
    #[error("channel returned HTTP {status}")]
    Status { status: u16 },
}

/// Persisted-state write failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem I/O failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The record could not be encoded.
    #[error("could not encode record: {message}")]
    Encode { message: String },
}
