//! Building responses to a received request.
//!
//! Everything the response needs that cannot be derived from the request is
//! passed in through [`ResponseContext`]; nothing is read from ambient state.

use chrono::{DateTime, DurationRound, FixedOffset, TimeDelta, Utc};

use crate::acknowledgement::{Acknowledgement, AcknowledgementDetail};
use crate::codes::{AcknowledgementType, ProcessingModeCode};
use crate::control_act::MessageControlAct;
use crate::identifiers::{InteractionName, SchemaVersion};
use crate::ii::{IdentificationId, InteractionId, TemplateId};
use crate::wrapper::{AcknowledgementResponse, ApplicationResponse, Envelope, Request};

/// Envelope values of a response that are chosen by the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    pub id: IdentificationId,
    pub creation_time: DateTime<FixedOffset>,
    pub interaction_id: InteractionId,
    pub template_id: TemplateId,
    pub processing_mode_code: ProcessingModeCode,
}

impl ResponseContext {
    /// A context for `interaction` with a fresh message id, the current time
    /// and the matching template id.
    ///
    /// The time is truncated to milliseconds, the precision both timestamp
    /// formats carry.
    pub fn for_interaction(version: SchemaVersion, interaction: InteractionName) -> Self {
        let now = Utc::now();
        let creation_time = now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now);
        Self {
            id: IdentificationId::generate(),
            creation_time: creation_time.fixed_offset(),
            template_id: TemplateId::for_interaction(version, interaction.clone()),
            interaction_id: InteractionId::hl7(interaction),
            processing_mode_code: ProcessingModeCode::CurrentProcessing,
        }
    }

    /// The response envelope: the request's sender and receiver are swapped,
    /// while version, processing code and accept-ack code are copied.
    fn envelope_for(self, request: &Envelope) -> Envelope {
        Envelope {
            template_id: self.template_id,
            id: self.id,
            creation_time: self.creation_time,
            version_code: request.version_code.clone(),
            interaction_id: self.interaction_id,
            processing_code: request.processing_code,
            processing_mode_code: self.processing_mode_code,
            accept_ack_code: request.accept_ack_code,
            sequence_number: None,
            receiver: request.sender.clone(),
            sender: request.receiver.clone(),
            attention_lines: Vec::new(),
        }
    }
}

fn acknowledge(
    request: &Request,
    type_code: AcknowledgementType,
    details: Vec<AcknowledgementDetail>,
) -> Acknowledgement {
    Acknowledgement {
        type_code,
        target_message: request.envelope.id.clone(),
        details,
    }
}

impl AcknowledgementResponse {
    /// An acknowledgement-only response to `request`.
    pub fn for_request(
        request: &Request,
        context: ResponseContext,
        type_code: AcknowledgementType,
        details: Vec<AcknowledgementDetail>,
    ) -> Self {
        Self {
            envelope: context.envelope_for(&request.envelope),
            acknowledgement: acknowledge(request, type_code, details),
        }
    }
}

impl ApplicationResponse {
    /// An application response to `request` carrying `control_act`.
    pub fn for_request(
        request: &Request,
        context: ResponseContext,
        type_code: AcknowledgementType,
        details: Vec<AcknowledgementDetail>,
        control_act: MessageControlAct,
    ) -> Self {
        Self {
            envelope: context.envelope_for(&request.envelope),
            acknowledgement: acknowledge(request, type_code, details),
            control_act,
        }
    }
}
