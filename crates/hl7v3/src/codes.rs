//! Coded values: classificator ids and the closed HL7 vocabularies used by the
//! transmission wrapper.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::identifiers::OId;
use crate::oids;

/// A code drawn from a code system identified by an OID.
///
/// Only the code is validated (it must not be empty). Which code systems are
/// acceptable depends on where the value is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawClassificator")]
pub struct ClassificatorId {
    code: String,
    code_system: OId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RawClassificator {
    code: String,
    code_system: OId,
    #[serde(default)]
    display_name: Option<String>,
}

impl TryFrom<RawClassificator> for ClassificatorId {
    type Error = ModelError;

    fn try_from(raw: RawClassificator) -> Result<Self> {
        Ok(ClassificatorId::new(raw.code, raw.code_system)?.with_display_name(raw.display_name))
    }
}

impl ClassificatorId {
    /// Creates a coded value. The code must not be empty.
    pub fn new(code: impl Into<String>, code_system: OId) -> Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(ModelError::Empty { field: "code" });
        }
        Ok(Self {
            code,
            code_system,
            display_name: None,
        })
    }

    /// Attaches (or clears) a human readable display name.
    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name.filter(|name| !name.is_empty());
        self
    }

    /// The code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The code system.
    pub fn code_system(&self) -> &OId {
        &self.code_system
    }

    /// The display name, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns `true` if the code belongs to `code_system`.
    pub fn is_from(&self, code_system: &OId) -> bool {
        &self.code_system == code_system
    }
}

impl fmt::Display for ClassificatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.code, self.code_system)
    }
}

/// The detail code of an acknowledgement detail.
///
/// Restricted to the HL7 AcknowledgementDetailCode system and the national
/// application error code system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ClassificatorId", into = "ClassificatorId")]
pub struct AcknowledgementDetailCode(ClassificatorId);

impl AcknowledgementDetailCode {
    /// Code systems an acknowledgement detail code may come from.
    pub fn accepted_code_systems() -> [OId; 2] {
        [
            oids::acknowledgement_detail_code(),
            oids::national_error_code(),
        ]
    }

    /// A code from the HL7 AcknowledgementDetailCode system.
    pub fn hl7(code: impl Into<String>) -> Result<Self> {
        Ok(Self(ClassificatorId::new(
            code,
            oids::acknowledgement_detail_code(),
        )?))
    }

    /// A code from the national application error system.
    pub fn national(code: impl Into<String>) -> Result<Self> {
        Ok(Self(ClassificatorId::new(code, oids::national_error_code())?))
    }

    /// The underlying coded value.
    pub fn as_classificator(&self) -> &ClassificatorId {
        &self.0
    }

    /// The code.
    pub fn code(&self) -> &str {
        self.0.code()
    }

    /// The code system.
    pub fn code_system(&self) -> &OId {
        self.0.code_system()
    }
}

impl TryFrom<ClassificatorId> for AcknowledgementDetailCode {
    type Error = ModelError;

    fn try_from(value: ClassificatorId) -> Result<Self> {
        if Self::accepted_code_systems()
            .iter()
            .any(|system| value.is_from(system))
        {
            Ok(Self(value))
        } else {
            Err(ModelError::UnexpectedCodeSystem {
                vocabulary: "acknowledgement detail code",
                code_system: value.code_system().to_string(),
            })
        }
    }
}

impl From<AcknowledgementDetailCode> for ClassificatorId {
    fn from(code: AcknowledgementDetailCode) -> Self {
        code.0
    }
}

/// Declares a closed HL7 vocabulary with its wire codes.
macro_rules! coded_vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $vocabulary:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $code)] $variant, )+
        }

        impl $name {
            /// Every member of the vocabulary, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire code.
            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Looks up a member by its wire code.
            pub fn from_code(code: &str) -> Result<Self> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(ModelError::UnknownCode {
                        vocabulary: $vocabulary,
                        code: code.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_code(s)
            }
        }
    };
}

coded_vocabulary! {
    /// Whether the message is part of production, debugging or training.
    pub enum ProcessingCode: "processing code" {
        Production => "P",
        Debugging => "D",
        Training => "T",
    }
}

coded_vocabulary! {
    /// The processing mode of the message.
    pub enum ProcessingModeCode: "processing mode code" {
        Archive => "A",
        InitialLoad => "I",
        Restore => "R",
        CurrentProcessing => "T",
    }
}

coded_vocabulary! {
    /// When the receiver must send an accept-level acknowledgement.
    pub enum AcceptAckCode: "accept acknowledgement code" {
        Always => "AL",
        ErrorOnly => "ER",
        Never => "NE",
    }
}

coded_vocabulary! {
    /// Acknowledgement type: application-level and commit-level
    /// accept / error / reject.
    pub enum AcknowledgementType: "acknowledgement type" {
        ApplicationAccept => "AA",
        ApplicationError => "AE",
        ApplicationReject => "AR",
        CommitAccept => "CA",
        CommitError => "CE",
        CommitReject => "CR",
    }
}

impl AcknowledgementType {
    /// Returns `true` for the two error codes.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            AcknowledgementType::ApplicationError | AcknowledgementType::CommitError
        )
    }

    /// Returns `true` for the two accept codes.
    pub fn is_accept(self) -> bool {
        matches!(
            self,
            AcknowledgementType::ApplicationAccept | AcknowledgementType::CommitAccept
        )
    }

    /// Returns `true` for commit (transport) level codes.
    pub fn is_commit_level(self) -> bool {
        matches!(
            self,
            AcknowledgementType::CommitAccept
                | AcknowledgementType::CommitError
                | AcknowledgementType::CommitReject
        )
    }

    /// The error sibling of an accept code. Other codes are returned unchanged.
    pub fn escalated(self) -> Self {
        match self {
            AcknowledgementType::ApplicationAccept => AcknowledgementType::ApplicationError,
            AcknowledgementType::CommitAccept => AcknowledgementType::CommitError,
            other => other,
        }
    }
}

coded_vocabulary! {
    /// Severity of an acknowledgement detail.
    pub enum Severity: "acknowledgement detail type" {
        Error => "E",
        Warning => "W",
        Information => "I",
    }
}

coded_vocabulary! {
    /// Outcome of a query.
    pub enum QueryResponseCode: "query response code" {
        Ok => "OK",
        NoDataFound => "NF",
        ApplicationError => "AE",
        QueryParameterError => "QE",
    }
}

coded_vocabulary! {
    /// Lifecycle state of a query.
    pub enum QueryStatusCode: "query status code" {
        Aborted => "aborted",
        DeliveredResponse => "deliveredResponse",
        Executing => "executing",
        New => "new",
        WaitContinuedQueryResponse => "waitContinuedQueryResponse",
    }
}
