//! The transmission wrapper and its classified variants.
//!
//! A decoded message starts life as [`WrapperParts`]: the fully populated
//! envelope plus whichever of the acknowledgement and control act were present.
//! [`WrapperParts::classify`] turns that into a [`TransmissionWrapper`]:
//!
//! | acknowledgement | control act | variant |
//! |---|---|---|
//! | absent | message | [`Request`] |
//! | present | absent | [`AcknowledgementResponse`] |
//! | present | message | [`ApplicationResponse`] |
//! | present | query | [`QueryApplicationResponse`] |
//! | absent | query | [`QueryApplicationResponse`] (request form) |

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::acknowledgement::Acknowledgement;
use crate::codes::{AcceptAckCode, ProcessingCode, ProcessingModeCode};
use crate::control_act::{ControlAct, ControlActDetails, MessageControlAct, QueryControlAcknowledgement};
use crate::error::{ModelError, Result};
use crate::ii::{IdentificationId, InteractionId, TemplateId};
use crate::participants::{AttentionLine, Device};

/// Envelope fields every transmission wrapper carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub template_id: TemplateId,
    pub id: IdentificationId,
    pub creation_time: DateTime<FixedOffset>,
    /// Content of `versionCode/@code`.
    pub version_code: String,
    pub interaction_id: InteractionId,
    pub processing_code: ProcessingCode,
    pub processing_mode_code: ProcessingModeCode,
    pub accept_ack_code: AcceptAckCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<i64>,
    pub receiver: Device,
    pub sender: Device,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attention_lines: Vec<AttentionLine>,
}

/// A plain request carrying a message control act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub envelope: Envelope,
    pub control_act: MessageControlAct,
}

/// An application-level response: acknowledgement plus a message control act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub envelope: Envelope,
    pub acknowledgement: Acknowledgement,
    pub control_act: MessageControlAct,
}

/// A response carrying only an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgementResponse {
    pub envelope: Envelope,
    pub acknowledgement: Acknowledgement,
}

/// A message carrying a query control act.
///
/// With an acknowledgement it is a query response; without one it is a query
/// request (or continuation request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryApplicationResponse {
    pub envelope: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgement: Option<Acknowledgement>,
    pub control_act: QueryControlAcknowledgement,
}

impl QueryApplicationResponse {
    pub fn is_query_request(&self) -> bool {
        self.acknowledgement.is_none()
    }
}

/// Which variant a wrapper was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Request,
    ApplicationResponse,
    AcknowledgementResponse,
    QueryApplicationResponse,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Request => "Request",
            MessageKind::ApplicationResponse => "ApplicationResponse",
            MessageKind::AcknowledgementResponse => "AcknowledgementResponse",
            MessageKind::QueryApplicationResponse => "QueryApplicationResponse",
        };
        f.write_str(name)
    }
}

/// Borrowed view of a wrapper's control act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlActRef<'a> {
    Message(&'a MessageControlAct),
    Query(&'a QueryControlAcknowledgement),
}

impl<'a> ControlActRef<'a> {
    pub fn details(self) -> &'a ControlActDetails {
        match self {
            ControlActRef::Message(act) => &act.details,
            ControlActRef::Query(act) => &act.details,
        }
    }
}

/// A classified HL7 V3 message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransmissionWrapper {
    Request(Request),
    ApplicationResponse(ApplicationResponse),
    AcknowledgementResponse(AcknowledgementResponse),
    QueryApplicationResponse(QueryApplicationResponse),
}

impl TransmissionWrapper {
    pub fn kind(&self) -> MessageKind {
        match self {
            TransmissionWrapper::Request(_) => MessageKind::Request,
            TransmissionWrapper::ApplicationResponse(_) => MessageKind::ApplicationResponse,
            TransmissionWrapper::AcknowledgementResponse(_) => MessageKind::AcknowledgementResponse,
            TransmissionWrapper::QueryApplicationResponse(_) => {
                MessageKind::QueryApplicationResponse
            }
        }
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            TransmissionWrapper::Request(m) => &m.envelope,
            TransmissionWrapper::ApplicationResponse(m) => &m.envelope,
            TransmissionWrapper::AcknowledgementResponse(m) => &m.envelope,
            TransmissionWrapper::QueryApplicationResponse(m) => &m.envelope,
        }
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        match self {
            TransmissionWrapper::Request(m) => &mut m.envelope,
            TransmissionWrapper::ApplicationResponse(m) => &mut m.envelope,
            TransmissionWrapper::AcknowledgementResponse(m) => &mut m.envelope,
            TransmissionWrapper::QueryApplicationResponse(m) => &mut m.envelope,
        }
    }

    pub fn acknowledgement(&self) -> Option<&Acknowledgement> {
        match self {
            TransmissionWrapper::Request(_) => None,
            TransmissionWrapper::ApplicationResponse(m) => Some(&m.acknowledgement),
            TransmissionWrapper::AcknowledgementResponse(m) => Some(&m.acknowledgement),
            TransmissionWrapper::QueryApplicationResponse(m) => m.acknowledgement.as_ref(),
        }
    }

    pub fn control_act(&self) -> Option<ControlActRef<'_>> {
        match self {
            TransmissionWrapper::Request(m) => Some(ControlActRef::Message(&m.control_act)),
            TransmissionWrapper::ApplicationResponse(m) => {
                Some(ControlActRef::Message(&m.control_act))
            }
            TransmissionWrapper::AcknowledgementResponse(_) => None,
            TransmissionWrapper::QueryApplicationResponse(m) => {
                Some(ControlActRef::Query(&m.control_act))
            }
        }
    }

    /// Returns `true` for a query control act without an acknowledgement.
    pub fn is_query_request(&self) -> bool {
        matches!(self, TransmissionWrapper::QueryApplicationResponse(m) if m.is_query_request())
    }

    /// Splits the wrapper back into its unclassified parts.
    pub fn into_parts(self) -> WrapperParts {
        match self {
            TransmissionWrapper::Request(m) => WrapperParts {
                envelope: m.envelope,
                acknowledgement: None,
                control_act: Some(ControlAct::Message(m.control_act)),
            },
            TransmissionWrapper::ApplicationResponse(m) => WrapperParts {
                envelope: m.envelope,
                acknowledgement: Some(m.acknowledgement),
                control_act: Some(ControlAct::Message(m.control_act)),
            },
            TransmissionWrapper::AcknowledgementResponse(m) => WrapperParts {
                envelope: m.envelope,
                acknowledgement: Some(m.acknowledgement),
                control_act: None,
            },
            TransmissionWrapper::QueryApplicationResponse(m) => WrapperParts {
                envelope: m.envelope,
                acknowledgement: m.acknowledgement,
                control_act: Some(ControlAct::Query(m.control_act)),
            },
        }
    }
}

impl From<Request> for TransmissionWrapper {
    fn from(value: Request) -> Self {
        TransmissionWrapper::Request(value)
    }
}

impl From<ApplicationResponse> for TransmissionWrapper {
    fn from(value: ApplicationResponse) -> Self {
        TransmissionWrapper::ApplicationResponse(value)
    }
}

impl From<AcknowledgementResponse> for TransmissionWrapper {
    fn from(value: AcknowledgementResponse) -> Self {
        TransmissionWrapper::AcknowledgementResponse(value)
    }
}

impl From<QueryApplicationResponse> for TransmissionWrapper {
    fn from(value: QueryApplicationResponse) -> Self {
        TransmissionWrapper::QueryApplicationResponse(value)
    }
}

/// An envelope and its optional members before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperParts {
    pub envelope: Envelope,
    pub acknowledgement: Option<Acknowledgement>,
    pub control_act: Option<ControlAct>,
}

impl WrapperParts {
    /// Picks the variant from which optional members are present.
    pub fn classify(self) -> Result<TransmissionWrapper> {
        let WrapperParts {
            envelope,
            acknowledgement,
            control_act,
        } = self;

        match (acknowledgement, control_act) {
            (None, Some(ControlAct::Message(control_act))) => {
                Ok(TransmissionWrapper::Request(Request {
                    envelope,
                    control_act,
                }))
            }
            (Some(acknowledgement), None) => Ok(TransmissionWrapper::AcknowledgementResponse(
                AcknowledgementResponse {
                    envelope,
                    acknowledgement,
                },
            )),
            (Some(acknowledgement), Some(ControlAct::Message(control_act))) => Ok(
                TransmissionWrapper::ApplicationResponse(ApplicationResponse {
                    envelope,
                    acknowledgement,
                    control_act,
                }),
            ),
            (acknowledgement, Some(ControlAct::Query(control_act))) => Ok(
                TransmissionWrapper::QueryApplicationResponse(QueryApplicationResponse {
                    envelope,
                    acknowledgement,
                    control_act,
                }),
            ),
            (None, None) => Err(ModelError::UnknownMessageType(
                "neither acknowledgement nor controlActProcess is present".to_string(),
            )),
        }
    }
}
