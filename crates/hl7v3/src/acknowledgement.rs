//! Acknowledgements of a previously received message.

use serde::{Deserialize, Serialize};

use crate::codes::{AcknowledgementDetailCode, AcknowledgementType, Severity};
use crate::error::{ModelError, Result};
use crate::ii::IdentificationId;

/// One issue reported by an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgementDetail {
    pub type_code: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<AcknowledgementDetailCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Where in the acknowledged message the issue was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl AcknowledgementDetail {
    pub fn new(type_code: Severity) -> Self {
        Self {
            type_code,
            code: None,
            text: None,
            location: None,
        }
    }

    pub fn error(code: AcknowledgementDetailCode, text: impl Into<String>) -> Self {
        Self {
            type_code: Severity::Error,
            code: Some(code),
            text: Some(text.into()),
            location: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.type_code == Severity::Error
    }
}

/// The acknowledgement section of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub type_code: AcknowledgementType,
    /// Identification of the message being acknowledged.
    pub target_message: IdentificationId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<AcknowledgementDetail>,
}

impl Acknowledgement {
    pub fn new(type_code: AcknowledgementType, target_message: IdentificationId) -> Self {
        Self {
            type_code,
            target_message,
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: AcknowledgementDetail) -> Self {
        self.details.push(detail);
        self
    }

    /// Returns `true` if any detail has error severity.
    pub fn has_errors(&self) -> bool {
        self.details.iter().any(AcknowledgementDetail::is_error)
    }

    /// The type code that must go on the wire.
    ///
    /// An accept code is replaced by its error sibling (AA to AE, CA to CE)
    /// when any detail is an error.
    pub fn effective_type_code(&self) -> AcknowledgementType {
        if self.has_errors() {
            self.type_code.escalated()
        } else {
            self.type_code
        }
    }

    /// Error details require one of the two error codes.
    pub fn validate(&self) -> Result<()> {
        Self::check_severity(self.type_code, self.has_errors())
    }

    /// Like [`Acknowledgement::validate`], applied to the escalated type code.
    ///
    /// Only accept codes escalate, so a reject code with error details is
    /// still refused.
    pub fn validate_effective(&self) -> Result<()> {
        Self::check_severity(self.effective_type_code(), self.has_errors())
    }

    fn check_severity(type_code: AcknowledgementType, has_errors: bool) -> Result<()> {
        if has_errors && !type_code.is_error() {
            return Err(ModelError::AcknowledgementSeverityMismatch {
                type_code: type_code.code().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> IdentificationId {
        IdentificationId::generate()
    }

    #[test]
    fn test_effective_type_escalates_on_error_detail() {
        let code = AcknowledgementDetailCode::hl7("SYN102").unwrap();
        let ack = Acknowledgement::new(AcknowledgementType::CommitAccept, target())
            .with_detail(AcknowledgementDetail::new(Severity::Warning))
            .with_detail(AcknowledgementDetail::error(code, "bad value"));
        assert_eq!(ack.effective_type_code(), AcknowledgementType::CommitError);
        assert!(matches!(
            ack.validate(),
            Err(ModelError::AcknowledgementSeverityMismatch { .. })
        ));
    }

    #[test]
    fn test_effective_type_keeps_code_without_errors() {
        let ack = Acknowledgement::new(AcknowledgementType::ApplicationAccept, target())
            .with_detail(AcknowledgementDetail::new(Severity::Information).with_text("fyi"));
        assert_eq!(
            ack.effective_type_code(),
            AcknowledgementType::ApplicationAccept
        );
        assert!(ack.validate().is_ok());

        let reject = Acknowledgement::new(AcknowledgementType::ApplicationReject, target())
            .with_detail(AcknowledgementDetail::new(Severity::Error));
        assert_eq!(
            reject.effective_type_code(),
            AcknowledgementType::ApplicationReject
        );
        assert!(reject.validate().is_err());
    }

    #[test]
    fn test_reject_codes_with_error_detail_are_refused() {
        for type_code in [
            AcknowledgementType::ApplicationReject,
            AcknowledgementType::CommitReject,
        ] {
            let ack = Acknowledgement::new(type_code, target())
                .with_detail(AcknowledgementDetail::new(Severity::Error));
            assert!(matches!(
                ack.validate(),
                Err(ModelError::AcknowledgementSeverityMismatch { .. })
            ));
            assert!(ack.validate_effective().is_err());
        }

        let accept = Acknowledgement::new(AcknowledgementType::CommitAccept, target())
            .with_detail(AcknowledgementDetail::new(Severity::Error));
        assert!(accept.validate().is_err());
        assert!(accept.validate_effective().is_ok());

        let error = Acknowledgement::new(AcknowledgementType::ApplicationError, target())
            .with_detail(AcknowledgementDetail::new(Severity::Error));
        assert!(error.validate().is_ok());
    }
}
