//! Error types for document handling and reconciliation.

use std::fmt;

/// Result type alias for reconcile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconcile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or unencodable XML.
    Format,
    /// Document does not satisfy its resource schema.
    Validation,
    /// Desired state names something the schema does not declare.
    Schema,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Format => "Invalid XML document",
            Self::Validation => "Document failed validation",
            Self::Schema => "Unknown field",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Format => "Check that the server returned an XML document",
            Self::Validation => "Supply the required fields with valid values",
            Self::Schema => "Check the field name against the resource type",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while parsing, merging or validating documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// XML could not be parsed or written.
    #[error("XML error: {0}")]
    Xml(String),

    /// Document failed validation against its schema.
    #[error("validation failed for {resource}: {}", .problems.join("; "))]
    Validation {
        /// Resource type tag.
        resource: String,
        /// Every problem found.
        problems: Vec<String>,
    },

    /// Desired state references a key the schema does not declare.
    #[error("unknown field '{field}' for {resource}")]
    UnknownField {
        /// Resource type tag.
        resource: String,
        /// Offending key.
        field: String,
    },
}

impl Error {
    /// Create an XML error from any displayable cause.
    pub fn xml(cause: impl fmt::Display) -> Self {
        Self::Xml(cause.to_string())
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Xml(_) => ErrorCategory::Format,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::UnknownField { .. } => ErrorCategory::Schema,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::xml(err)
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::xml(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::xml(err)
    }
}
