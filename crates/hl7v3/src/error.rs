//! Error types for constructing HL7 V3 model values.

use thiserror::Error;

/// Errors raised while constructing or classifying model values.
///
/// Construction is the only validation point for identifiers and coded values,
/// so every variant here corresponds to a value that was rejected before it
/// could exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The value is not a dotted-decimal object identifier.
    #[error("invalid OID '{0}'")]
    InvalidOid(String),

    /// The value does not match the template URN grammar.
    #[error("invalid URN '{0}'")]
    InvalidUrn(String),

    /// The value is not a usable interaction (schema) name.
    #[error("invalid interaction name '{0}'")]
    InvalidInteractionName(String),

    /// The identification extension is not a GUID.
    #[error("invalid GUID '{value}': {reason}")]
    InvalidGuid { value: String, reason: String },

    /// A mandatory string was empty.
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    /// A coded value is not one of the accepted literals.
    #[error("unknown {vocabulary} code '{code}'")]
    UnknownCode {
        vocabulary: &'static str,
        code: String,
    },

    /// A coded value uses a code system that is not accepted for its position.
    #[error("code system '{code_system}' is not allowed for {vocabulary}")]
    UnexpectedCodeSystem {
        vocabulary: &'static str,
        code_system: String,
    },

    /// The optional members of a transmission wrapper match none of the
    /// message kinds.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// A query control act carries a payload combination that is not allowed.
    #[error("invalid query payload combination: {0}")]
    InvalidQueryPayload(String),

    /// An acknowledgement claims success while carrying error details.
    #[error("acknowledgement type {type_code} is not an error type but error details are present")]
    AcknowledgementSeverityMismatch { type_code: String },
}

/// Result type alias for model construction.
pub type Result<T> = std::result::Result<T, ModelError>;
