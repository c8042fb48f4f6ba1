//! Error types for reading and writing HL7 V3 XML.

use thiserror::Error;

/// Errors raised by the codec.
///
/// Read-side errors record the reader's byte offset where the problem was
/// detected. Write-side errors have no position.
#[derive(Error, Debug)]
pub enum CodecError {
    /// An expected element is missing or out of order, or an element is in the
    /// wrong namespace or has the wrong local name.
    #[error("<{element}>: {message}{}", at(.position))]
    Structural {
        element: String,
        message: String,
        position: Option<u64>,
    },

    /// A mandatory attribute is missing or empty, or its value is malformed or
    /// not in the set accepted at this position.
    #[error("<{element} {attribute}=\"{value}\">: {message}{}", at(.position))]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
        message: String,
        position: Option<u64>,
    },

    /// A rule spanning several fields does not hold.
    #[error("{message}{}", at(.position))]
    InvariantViolation {
        message: String,
        position: Option<u64>,
    },

    /// A date/time value matches none of the accepted formats.
    #[error("<{element}>: unrecognized date/time '{value}'{}", at(.position))]
    InvalidDateTime {
        element: String,
        value: String,
        position: Option<u64>,
    },

    /// Malformed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error on the underlying reader or writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON view of the model could not be produced or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn at(position: &Option<u64>) -> String {
    match position {
        Some(offset) => format!(" (at byte {offset})"),
        None => String::new(),
    }
}

impl CodecError {
    /// The reader offset the error was detected at, for read errors.
    pub fn position(&self) -> Option<u64> {
        match self {
            CodecError::Structural { position, .. }
            | CodecError::InvalidAttribute { position, .. }
            | CodecError::InvariantViolation { position, .. }
            | CodecError::InvalidDateTime { position, .. } => *position,
            CodecError::Xml(_) | CodecError::Io(_) | CodecError::Json(_) => None,
        }
    }

    /// The element the error refers to, when there is one.
    pub fn element(&self) -> Option<&str> {
        match self {
            CodecError::Structural { element, .. }
            | CodecError::InvalidAttribute { element, .. }
            | CodecError::InvalidDateTime { element, .. } => Some(element),
            _ => None,
        }
    }

    pub(crate) fn invariant(message: impl Into<String>, position: Option<u64>) -> Self {
        CodecError::InvariantViolation {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn structural(
        element: impl Into<String>,
        message: impl Into<String>,
        position: Option<u64>,
    ) -> Self {
        CodecError::Structural {
            element: element.into(),
            message: message.into(),
            position,
        }
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
