//! Error types for client operations.
//!
//! Transport failures are mapped from HTTP status codes, business-rule
//! violations are raised before any mutating request is sent, and document
//! errors from the reconcile engine are carried through unchanged.

use std::fmt;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of client errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection refused, timeout or unexpected status.
    Network,
    /// Resource does not exist.
    NotFound,
    /// Resource already exists.
    Conflict,
    /// Session or shared secret rejected.
    Permission,
    /// Server rejected or failed to process the request.
    Server,
    /// Document or desired state is invalid.
    Invalid,
    /// Operation refused by a local precondition.
    Rule,
    /// Resource type does not support the operation.
    Unsupported,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource already exists",
            Self::Permission => "Access denied",
            Self::Server => "Server error",
            Self::Invalid => "Invalid resource document",
            Self::Rule => "Operation not allowed",
            Self::Unsupported => "Operation not available",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the appNGizer URL and that the instance is running",
            Self::NotFound => "Verify the resource name and its site, application or repository",
            Self::Conflict => "Use update instead of create",
            Self::Permission => "Check the shared secret of the platform",
            Self::Server => "Inspect the appNG log for the reported exception",
            Self::Invalid => "Check the supplied field values",
            Self::Rule => "Resolve the reported precondition and try again",
            Self::Unsupported => "Use a different operation for this resource type",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to an appNGizer endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Document failed schema validation before sending.
    #[error("validation failed for {resource}: {}", .problems.join("; "))]
    Validation {
        /// Resource type tag.
        resource: String,
        /// Every problem found.
        problems: Vec<String>,
    },

    /// 404.
    #[error("not found: {path}")]
    NotFound {
        /// Requested path.
        path: String,
    },

    /// 409, or an existence pre-check before create.
    #[error("already exists: {path}")]
    Conflict {
        /// Requested path.
        path: String,
    },

    /// 403.
    #[error("forbidden: {path}")]
    Forbidden {
        /// Requested path.
        path: String,
    },

    /// 400.
    #[error("bad request: {path}")]
    BadRequest {
        /// Requested path.
        path: String,
    },

    /// 500, with the exception text from the error page when present.
    #[error("server error at {path}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Server {
        /// Requested path.
        path: String,
        /// Extracted exception text.
        message: Option<String>,
    },

    /// Any other status or transport failure.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Precondition checked locally before a mutating call.
    #[error("{0}")]
    BusinessRule(String),

    /// Operation not supported by the resource type.
    #[error("{operation} not available for {resource}")]
    NotAvailable {
        /// Requested operation.
        operation: &'static str,
        /// Resource description.
        resource: String,
    },

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Document could not be parsed, encoded or merged.
    #[error(transparent)]
    Document(reconcile::Error),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create a business rule error.
    pub fn rule(message: impl Into<String>) -> Self {
        Self::BusinessRule(message.into())
    }

    /// Map a non-success status to its error.
    pub fn from_status(status: u16, path: &str, message: Option<String>) -> Self {
        let path = path.to_string();
        match status {
            400 => Self::BadRequest { path },
            403 => Self::Forbidden { path },
            404 => Self::NotFound { path },
            409 => Self::Conflict { path },
            500 => Self::Server { path, message },
            other => Self::http(format!("HTTP {other} at {path}"), Some(other)),
        }
    }

    /// Whether this is a 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::Document(_) => ErrorCategory::Invalid,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Forbidden { .. } => ErrorCategory::Permission,
            Self::BadRequest { .. } | Self::Server { .. } => ErrorCategory::Server,
            Self::Http { .. } => ErrorCategory::Network,
            Self::BusinessRule(_) | Self::Hash(_) => ErrorCategory::Rule,
            Self::NotAvailable { .. } => ErrorCategory::Unsupported,
        }
    }
}

impl From<reconcile::Error> for Error {
    fn from(err: reconcile::Error) -> Self {
        match err {
            reconcile::Error::Validation { resource, problems } => {
                Self::Validation { resource, problems }
            }
            other => Self::Document(other),
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(format!("HTTP {code}"), Some(code)),
            other => Self::http(other.to_string(), None),
        }
    }
}

impl From<bcrypt::BcryptError> for Error {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Hash(err.to_string())
    }
}
