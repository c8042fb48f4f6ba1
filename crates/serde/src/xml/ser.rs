//! Writing transmission wrappers as HL7 V3 XML.
//!
//! Elements are emitted in schema order. Everything that could make the output
//! invalid (query payload combinations, malformed embedded fragments, an
//! unusable root name) is checked before the first event is written, so a
//! failed write leaves the sink untouched.

use std::io::Write;

use hl7v3::participants::{
    ASSIGNED_CLASS_CODE, DATA_ENTERER_TYPE_CODE, DEVICE_CLASS_CODE, INSTANCE_DETERMINER_CODE,
    LICENSED_ENTITY_CLASS_CODE, MEMBER_CLASS_CODE, ORGANIZATION_CLASS_CODE, PERSON_CLASS_CODE,
    RECEIVER_TYPE_CODE, SENDER_TYPE_CODE,
};
use hl7v3::control_act::{CONTROL_ACT_CLASS_CODE, CONTROL_ACT_MOOD_CODE, SUBJECT_TYPE_CODE};
use hl7v3::{
    Acknowledgement, AcknowledgementDetail, AsLicensedEntity, AsMember, AssignedDevice,
    AssignedParty, AssignedPerson, AttentionLine, AuthorOrPerformer, ClassificatorId,
    ControlActDetails, ControlActRef, DataEnterer, Device, Envelope, InformationRecipient,
    InstanceIdentifier, MessageControlAct, Overseer, Person, PersonName, QueryAcknowledgement,
    QueryByParameterPayload, QueryContinuation, QueryControlAcknowledgement,
    RepresentedOrganization, Subject, TransmissionWrapper, II,
};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, warn};

use super::utils::{
    HL7_NAMESPACE, HL7_PREFIX, ITS_VERSION, XSI_NAMESPACE, check_fragment, is_valid_local_name,
    qualified,
};
use crate::datetime::format_datetime;
use crate::error::{CodecError, Result};
use crate::options::CodecOptions;

/// Checks everything that would make `wrapper` unwritable.
pub(crate) fn validate(wrapper: &TransmissionWrapper, local_name: &str) -> Result<()> {
    if !is_valid_local_name(local_name) {
        return Err(CodecError::structural(
            local_name,
            "not a valid local name for the message root",
            None,
        ));
    }
    match wrapper.control_act() {
        Some(ControlActRef::Message(act)) => {
            if let Some(subject) = &act.subject {
                check_subject(subject)?;
            }
        }
        Some(ControlActRef::Query(act)) => {
            act.shape()
                .map_err(|e| CodecError::invariant(e.to_string(), None))?;
            if let Some(subject) = &act.subject {
                check_subject(subject)?;
            }
            if let Some(query) = &act.query_by_parameter {
                check_fragment(&query.parameters).map_err(|message| {
                    CodecError::structural("queryByParameter", message, None)
                })?;
            }
        }
        None => {}
    }
    if let Some(ack) = wrapper.acknowledgement() {
        ack.validate_effective()
            .map_err(|e| CodecError::invariant(e.to_string(), None))?;
    }
    Ok(())
}

fn check_subject(subject: &Subject) -> Result<()> {
    check_fragment(&subject.content)
        .map_err(|message| CodecError::structural("subject", message, None))
}

/// Emits one message through a caller-supplied quick-xml writer.
pub(crate) struct MessageWriter<'w, W: Write> {
    writer: &'w mut Writer<W>,
    options: CodecOptions,
}

impl<'w, W: Write> MessageWriter<'w, W> {
    pub(crate) fn new(writer: &'w mut Writer<W>, options: CodecOptions) -> Self {
        Self { writer, options }
    }

    /// Validates, then writes the message as root element `local_name`,
    /// preceded by an XML declaration when `declaration` is set.
    pub(crate) fn write_message(
        &mut self,
        wrapper: &TransmissionWrapper,
        local_name: &str,
        declaration: bool,
    ) -> Result<()> {
        validate(wrapper, local_name)?;
        debug!(
            root = local_name,
            kind = %wrapper.kind(),
            version = %self.options.schema_version,
            "writing HL7 V3 message"
        );

        if declaration {
            self.writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }

        let mut root = BytesStart::new(qualified(local_name));
        root.push_attribute(("ITSVersion", ITS_VERSION));
        let xmlns = format!("xmlns:{HL7_PREFIX}");
        root.push_attribute((xmlns.as_str(), HL7_NAMESPACE));
        root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        self.writer.write_event(Event::Start(root))?;

        self.write_envelope(wrapper.envelope())?;
        if let Some(acknowledgement) = wrapper.acknowledgement() {
            self.write_acknowledgement(acknowledgement)?;
        }
        match wrapper.control_act() {
            Some(ControlActRef::Message(act)) => self.write_message_control_act(act)?,
            Some(ControlActRef::Query(act)) => self.write_query_control_act(act)?,
            None => {}
        }

        self.writer
            .write_event(Event::End(BytesEnd::new(qualified(local_name))))?;
        Ok(())
    }

    // Primitives

    fn start(&mut self, local: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(qualified(local));
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    fn end(&mut self, local: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(qualified(local))))?;
        Ok(())
    }

    fn empty(&mut self, local: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(qualified(local));
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn text_element(&mut self, local: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(local, attributes)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(local)
    }

    fn optional_text_element(&mut self, local: &str, text: Option<&str>) -> Result<()> {
        match text {
            Some(text) => self.text_element(local, &[], text),
            None => Ok(()),
        }
    }

    fn identifier(&mut self, local: &str, id: &impl InstanceIdentifier) -> Result<()> {
        let extension = id.extension();
        self.empty(
            local,
            &[("root", id.root().as_str()), ("extension", extension.as_str())],
        )
    }

    fn identifiers(&mut self, ids: &[II]) -> Result<()> {
        for id in ids {
            self.identifier("id", id)?;
        }
        Ok(())
    }

    fn classificator(&mut self, local: &str, code: &ClassificatorId) -> Result<()> {
        let mut attributes = vec![
            ("code", code.code()),
            ("codeSystem", code.code_system().as_str()),
        ];
        if let Some(display_name) = code.display_name() {
            attributes.push(("displayName", display_name));
        }
        self.empty(local, &attributes)
    }

    fn optional_classificator(&mut self, local: &str, code: Option<&ClassificatorId>) -> Result<()> {
        match code {
            Some(code) => self.classificator(local, code),
            None => Ok(()),
        }
    }

    fn code_element(&mut self, local: &str, code: &str) -> Result<()> {
        self.empty(local, &[("code", code)])
    }

    fn value_element(&mut self, local: &str, value: &str) -> Result<()> {
        self.empty(local, &[("value", value)])
    }

    fn optional_telecom(&mut self, telecom: Option<&str>) -> Result<()> {
        match telecom {
            Some(telecom) => self.value_element("telecom", telecom),
            None => Ok(()),
        }
    }

    fn optional_number(&mut self, local: &str, value: Option<u32>) -> Result<()> {
        match value {
            Some(value) => self.value_element(local, &value.to_string()),
            None => Ok(()),
        }
    }

    /// Copies a stored XML fragment into the output event by event.
    fn fragment(&mut self, element: &str, content: &str) -> Result<()> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Decl(_)) => {}
                // Kept inline with the surrounding text when indenting.
                Ok(Event::GeneralRef(r)) => {
                    let escaped = format!("&{};", String::from_utf8_lossy(&r));
                    self.writer
                        .write_event(Event::Text(BytesText::from_escaped(escaped)))?
                }
                Ok(event) => self.writer.write_event(event)?,
                Err(e) => return Err(CodecError::structural(element, e.to_string(), None)),
            }
        }
        Ok(())
    }

    // Envelope

    fn write_envelope(&mut self, envelope: &Envelope) -> Result<()> {
        self.identifier("templateId", &envelope.template_id)?;
        self.identifier("id", &envelope.id)?;
        let creation_time =
            format_datetime(&envelope.creation_time, self.options.timestamp_format);
        self.value_element("creationTime", &creation_time)?;
        self.code_element("versionCode", &envelope.version_code)?;
        self.identifier("interactionId", &envelope.interaction_id)?;
        self.code_element("processingCode", envelope.processing_code.code())?;
        self.code_element("processingModeCode", envelope.processing_mode_code.code())?;
        self.code_element("acceptAckCode", envelope.accept_ack_code.code())?;
        if let Some(sequence_number) = envelope.sequence_number {
            self.value_element("sequenceNumber", &sequence_number.to_string())?;
        }
        self.write_transmission_party("receiver", RECEIVER_TYPE_CODE, &envelope.receiver)?;
        self.write_transmission_party("sender", SENDER_TYPE_CODE, &envelope.sender)?;
        for line in &envelope.attention_lines {
            self.write_attention_line(line)?;
        }
        Ok(())
    }

    fn write_transmission_party(&mut self, local: &str, type_code: &str, device: &Device) -> Result<()> {
        self.start(local, &[("typeCode", type_code)])?;
        self.write_device("device", device)?;
        self.end(local)
    }

    fn write_device(&mut self, local: &str, device: &Device) -> Result<()> {
        self.start(
            local,
            &[
                ("classCode", DEVICE_CLASS_CODE),
                ("determinerCode", INSTANCE_DETERMINER_CODE),
            ],
        )?;
        self.identifiers(device.ids())?;
        self.optional_text_element("name", device.name.as_deref())?;
        self.optional_telecom(device.telecom.as_deref())?;
        self.optional_text_element("softwareName", device.software_name.as_deref())?;
        self.end(local)
    }

    fn write_attention_line(&mut self, line: &AttentionLine) -> Result<()> {
        self.start("attentionLine", &[])?;
        self.optional_text_element("keyWordText", line.key_word_text.as_deref())?;
        self.text_element("value", &[("xsi:type", "ST")], &line.value)?;
        self.end("attentionLine")
    }

    // Acknowledgement

    fn write_acknowledgement(&mut self, acknowledgement: &Acknowledgement) -> Result<()> {
        let type_code = acknowledgement.effective_type_code();
        if type_code != acknowledgement.type_code {
            warn!(
                nominal = %acknowledgement.type_code,
                emitted = %type_code,
                "error details present, escalating acknowledgement type"
            );
        }

        if self.options.schema_version.ack_type_as_attribute() {
            self.start("acknowledgement", &[("typeCode", type_code.code())])?;
        } else {
            self.start("acknowledgement", &[])?;
            self.code_element("typeCode", type_code.code())?;
        }
        self.start("targetMessage", &[])?;
        self.identifier("id", &acknowledgement.target_message)?;
        self.end("targetMessage")?;
        for detail in &acknowledgement.details {
            self.write_acknowledgement_detail(detail)?;
        }
        self.end("acknowledgement")
    }

    fn write_acknowledgement_detail(&mut self, detail: &AcknowledgementDetail) -> Result<()> {
        self.start(
            "acknowledgementDetail",
            &[("typeCode", detail.type_code.code())],
        )?;
        self.optional_classificator(
            "code",
            detail.code.as_ref().map(|code| code.as_classificator()),
        )?;
        self.optional_text_element("text", detail.text.as_deref())?;
        self.optional_text_element("location", detail.location.as_deref())?;
        self.end("acknowledgementDetail")
    }

    // Control act

    fn start_control_act(&mut self, details: &ControlActDetails) -> Result<()> {
        self.start(
            "controlActProcess",
            &[
                ("classCode", CONTROL_ACT_CLASS_CODE),
                ("moodCode", CONTROL_ACT_MOOD_CODE),
            ],
        )?;
        self.optional_classificator("code", details.code.as_ref())?;
        self.optional_text_element("text", details.text.as_deref())?;
        if let Some(effective_time) = &details.effective_time {
            let value = format_datetime(effective_time, self.options.timestamp_format);
            self.value_element("effectiveTime", &value)?;
        }
        self.optional_classificator("priorityCode", details.priority_code.as_ref())?;
        for reason in &details.reason_codes {
            self.classificator("reasonCode", reason)?;
        }
        if let Some(language) = &details.language_code {
            self.code_element("languageCode", language)?;
        }
        for overseer in &details.overseers {
            self.write_overseer(overseer)?;
        }
        for author in &details.authors {
            self.write_author_or_performer(author)?;
        }
        for enterer in &details.data_enterers {
            self.write_data_enterer(enterer)?;
        }
        for recipient in &details.information_recipients {
            self.write_information_recipient(recipient)?;
        }
        Ok(())
    }

    fn write_message_control_act(&mut self, act: &MessageControlAct) -> Result<()> {
        self.start_control_act(&act.details)?;
        if let Some(subject) = &act.subject {
            self.write_subject(subject)?;
        }
        self.end("controlActProcess")
    }

    fn write_query_control_act(&mut self, act: &QueryControlAcknowledgement) -> Result<()> {
        self.start_control_act(&act.details)?;
        if let Some(subject) = &act.subject {
            self.write_subject(subject)?;
        }
        if let Some(ack) = &act.query_acknowledgement {
            self.write_query_ack(ack)?;
        }
        if let Some(query) = &act.query_by_parameter {
            self.write_query_by_parameter(query)?;
        }
        if let Some(continuation) = &act.query_continuation {
            self.write_query_continuation(continuation)?;
        }
        self.end("controlActProcess")
    }

    fn write_subject(&mut self, subject: &Subject) -> Result<()> {
        self.start("subject", &[("typeCode", SUBJECT_TYPE_CODE)])?;
        self.fragment("subject", &subject.content)?;
        self.end("subject")
    }

    fn write_query_ack(&mut self, ack: &QueryAcknowledgement) -> Result<()> {
        self.start("queryAck", &[])?;
        if let Some(query_id) = &ack.query_id {
            self.identifier("queryId", query_id)?;
        }
        if let Some(status) = ack.status_code {
            self.code_element("statusCode", status.code())?;
        }
        self.code_element("queryResponseCode", ack.query_response_code.code())?;
        self.optional_number("resultTotalQuantity", ack.result_total_quantity)?;
        self.optional_number("resultCurrentQuantity", ack.result_current_quantity)?;
        self.optional_number("resultRemainingQuantity", ack.result_remaining_quantity)?;
        self.end("queryAck")
    }

    fn write_query_by_parameter(&mut self, query: &QueryByParameterPayload) -> Result<()> {
        self.start("queryByParameter", &[])?;
        self.identifier("queryId", &query.query_id)?;
        self.code_element("statusCode", query.status_code.code())?;
        self.optional_number("initialQuantity", query.initial_quantity)?;
        self.fragment("queryByParameter", &query.parameters)?;
        self.end("queryByParameter")
    }

    fn write_query_continuation(&mut self, continuation: &QueryContinuation) -> Result<()> {
        self.start("queryContinuation", &[])?;
        self.identifier("queryId", &continuation.query_id)?;
        self.value_element(
            "startResultNumber",
            &continuation.start_result_number.to_string(),
        )?;
        self.value_element(
            "continuationQuantity",
            &continuation.continuation_quantity.to_string(),
        )?;
        self.code_element("statusCode", continuation.status_code.code())?;
        self.end("queryContinuation")
    }

    // Participants

    fn write_overseer(&mut self, overseer: &Overseer) -> Result<()> {
        self.start("overseer", &[("typeCode", overseer.type_code.code())])?;
        self.write_assigned_person(&overseer.assigned_person)?;
        self.end("overseer")
    }

    fn write_author_or_performer(&mut self, author: &AuthorOrPerformer) -> Result<()> {
        self.start("authorOrPerformer", &[("typeCode", author.type_code.code())])?;
        match &author.party {
            AssignedParty::Person(person) => self.write_assigned_person(person)?,
            AssignedParty::Device(device) => self.write_assigned_device(device)?,
        }
        self.end("authorOrPerformer")
    }

    fn write_data_enterer(&mut self, enterer: &DataEnterer) -> Result<()> {
        self.start("dataEnterer", &[("typeCode", DATA_ENTERER_TYPE_CODE)])?;
        self.write_assigned_person(&enterer.assigned_person)?;
        self.end("dataEnterer")
    }

    fn write_information_recipient(&mut self, recipient: &InformationRecipient) -> Result<()> {
        self.start(
            "informationRecipient",
            &[("typeCode", recipient.type_code.code())],
        )?;
        self.write_assigned_person(&recipient.assigned_person)?;
        self.end("informationRecipient")
    }

    fn write_assigned_person(&mut self, assigned: &AssignedPerson) -> Result<()> {
        self.start("assignedPerson", &[("classCode", ASSIGNED_CLASS_CODE)])?;
        self.identifiers(&assigned.ids)?;
        self.optional_classificator("code", assigned.code.as_ref())?;
        self.optional_telecom(assigned.telecom.as_deref())?;
        if let Some(person) = &assigned.person {
            self.write_person(person)?;
        }
        if let Some(organization) = &assigned.represented_organization {
            self.write_organization("representedOrganization", organization)?;
        }
        self.end("assignedPerson")
    }

    fn write_person(&mut self, person: &Person) -> Result<()> {
        self.start(
            "assignedPerson",
            &[
                ("classCode", PERSON_CLASS_CODE),
                ("determinerCode", INSTANCE_DETERMINER_CODE),
            ],
        )?;
        self.identifiers(&person.ids)?;
        for name in &person.names {
            self.write_person_name(name)?;
        }
        self.optional_telecom(person.telecom.as_deref())?;
        for licence in &person.as_licensed_entity {
            self.write_licensed_entity(licence)?;
        }
        for member in &person.as_member {
            self.write_member(member)?;
        }
        self.end("assignedPerson")
    }

    fn write_person_name(&mut self, name: &PersonName) -> Result<()> {
        self.start("name", &[])?;
        for part in &name.parts {
            self.text_element(part.kind.element_name(), &[], &part.value)?;
        }
        self.end("name")
    }

    fn write_licensed_entity(&mut self, licence: &AsLicensedEntity) -> Result<()> {
        self.start("asLicensedEntity", &[("classCode", LICENSED_ENTITY_CLASS_CODE)])?;
        self.identifiers(&licence.ids)?;
        self.optional_classificator("code", licence.code.as_ref())?;
        self.end("asLicensedEntity")
    }

    fn write_member(&mut self, member: &AsMember) -> Result<()> {
        self.start("asMember", &[("classCode", MEMBER_CLASS_CODE)])?;
        self.identifiers(&member.ids)?;
        self.write_organization("group", &member.group)?;
        self.end("asMember")
    }

    fn write_organization(&mut self, local: &str, organization: &RepresentedOrganization) -> Result<()> {
        self.start(
            local,
            &[
                ("classCode", ORGANIZATION_CLASS_CODE),
                ("determinerCode", INSTANCE_DETERMINER_CODE),
            ],
        )?;
        self.identifiers(&organization.ids)?;
        self.optional_text_element("name", organization.name.as_deref())?;
        self.optional_telecom(organization.telecom.as_deref())?;
        self.end(local)
    }

    fn write_assigned_device(&mut self, assigned: &AssignedDevice) -> Result<()> {
        self.start("assignedDevice", &[("classCode", ASSIGNED_CLASS_CODE)])?;
        self.identifiers(&assigned.ids)?;
        if let Some(device) = &assigned.device {
            self.write_device("assignedDevice", device)?;
        }
        if let Some(organization) = &assigned.represented_organization {
            self.write_organization("representedOrganization", organization)?;
        }
        self.end("assignedDevice")
    }
}
