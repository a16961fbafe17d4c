use crate::http::Method;

/// The tagged set of failure kinds the router, chain engine, and acceptor
/// agree on. User code raises `ErrorResponse` (directly, or via the
/// `unauthorized`/`forbidden`/`conflict`/... helpers) for anything beyond
/// the cases the core itself detects.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HttpError {
    /// No endpoint node matched the request path at all.
    #[error("Cannot {method} {path}")]
    NotFound { method: Method, path: String },

    /// The endpoint node exists but has no handler registered for the
    /// requested method.
    #[error("Cannot {method} {path}")]
    MethodNotAllowed { method: Method, path: String },

    /// Raised by a body-decoding middleware when the body could not be
    /// parsed into the shape it expected.
    #[error("{message}")]
    BadRequest { message: String },

    /// Raised by a body-decoding middleware on a content-type mismatch.
    #[error("{message}")]
    UnsupportedMediaType { message: String },

    /// The general, user-extensible variant: any status code plus a
    /// message, for handlers that want to fail with something other than
    /// the cases above.
    #[error("{message}")]
    ErrorResponse { status: u16, message: String },
}

impl HttpError {
    pub fn not_found(method: Method, path: impl Into<String>) -> Self {
        Self::NotFound {
            method,
            path: path.into(),
        }
    }

    pub fn method_not_allowed(method: Method, path: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            method,
            path: path.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::UnsupportedMediaType {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::ErrorResponse {
            status: 401,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::ErrorResponse {
            status: 403,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ErrorResponse {
            status: 409,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::ErrorResponse {
            status: 500,
            message: message.into(),
        }
    }

    /// The status code this error should be reported with.
    pub fn status(&self) -> u16 {
        match self {
            HttpError::NotFound { .. } => 404,
            HttpError::MethodNotAllowed { .. } => 405,
            HttpError::BadRequest { .. } => 400,
            HttpError::UnsupportedMediaType { .. } => 415,
            HttpError::ErrorResponse { status, .. } => *status,
        }
    }

    /// The plain-text message a fallback-rendered response should carry.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
