#![allow(dead_code)]

use chrono::DateTime;
use hl7v3::{
    AcceptAckCode, Acknowledgement, AcknowledgementDetail, AcknowledgementDetailCode,
    AcknowledgementResponse, AcknowledgementType, ApplicationResponse, AsLicensedEntity,
    AsMember, AssignedDevice, AssignedPerson, AttentionLine, AuthorOrPerformer,
    ClassificatorId, ControlActDetails, DataEnterer, Device, Envelope, IdentificationId,
    InformationRecipient, InteractionId, InteractionName, MessageControlAct, OId, Overseer,
    OverseerTypeCode, Person, PersonName, ProcessingCode, ProcessingModeCode,
    QueryAcknowledgement, QueryApplicationResponse, QueryByParameterPayload, QueryControlAcknowledgement,
    QueryResponseCode, QueryStatusCode, RecipientTypeCode, RepresentedOrganization, Request,
    SchemaVersion, Severity, Subject, TemplateId, TransmissionWrapper, II, oids,
};

pub const DEVICE_ROOT: &str = "1.3.6.1.4.1.38760.3.2";
pub const PERSON_ROOT: &str = "1.3.6.1.4.1.38760.4.1";
pub const MESSAGE_ID: &str = "5c2a9d2e-1f0a-4b8e-9a57-0c7e1b3d2f11";
pub const TARGET_ID: &str = "0b0e7a1c-4d2f-4e1b-8c3a-9f6d5e4c3b21";

pub const REQUEST_INTERACTION: &str = "PRPA_IN201305UV02";
pub const ACK_INTERACTION: &str = "MCCI_IN000002UV01";
pub const QUERY_INTERACTION: &str = "QUQI_IN000003UV01";

pub const SUBJECT_CONTENT: &str = r#"<hl7:registrationEvent classCode="REG" moodCode="EVN"><hl7:id root="1.3.6.1.4.1.38760.5.1" extension="REG-1"/><hl7:statusCode code="active"/></hl7:registrationEvent>"#;
pub const QUERY_PARAMETERS: &str = r#"<hl7:parameterList><hl7:patientIdentifier><hl7:value root="1.3.6.1.4.1.38760.6.1" extension="010101-12345"/><hl7:semanticsText>Patient.id</hl7:semanticsText></hl7:patientIdentifier></hl7:parameterList>"#;

pub fn oid(value: &str) -> OId {
    OId::new(value).unwrap()
}

pub fn ii(root: &str, extension: &str) -> II {
    II::new(oid(root), extension).unwrap()
}

pub fn device(extension: &str) -> Device {
    Device::with_id(ii(DEVICE_ROOT, extension))
}

pub fn envelope(interaction: &str, version: SchemaVersion) -> Envelope {
    let name = InteractionName::new(interaction).unwrap();
    Envelope {
        template_id: TemplateId::for_interaction(version, name.clone()),
        id: IdentificationId::parse(oids::message_id_root(), MESSAGE_ID).unwrap(),
        creation_time: DateTime::parse_from_rfc3339("2024-03-01T10:20:30+02:00").unwrap(),
        version_code: format!("V3-{}", version.token()),
        interaction_id: InteractionId::hl7(name),
        processing_code: ProcessingCode::Production,
        processing_mode_code: ProcessingModeCode::CurrentProcessing,
        accept_ack_code: AcceptAckCode::Always,
        sequence_number: None,
        receiver: device("registry"),
        sender: device("clinic"),
        attention_lines: Vec::new(),
    }
}

pub fn target() -> IdentificationId {
    IdentificationId::parse(oids::message_id_root(), TARGET_ID).unwrap()
}

pub fn subject() -> Subject {
    Subject::new(SUBJECT_CONTENT).unwrap()
}

pub fn doctor() -> AssignedPerson {
    let mut name = PersonName::from_given_family(["Anna"], "Ozola");
    name.push(hl7v3::NamePartKind::Prefix, "Dr.");
    AssignedPerson {
        ids: vec![ii(PERSON_ROOT, "D-100")],
        code: Some(ClassificatorId::new("221", oid("1.3.6.1.4.1.38760.2.9")).unwrap()),
        telecom: Some("tel:+37160000000".to_string()),
        person: Some(Person {
            ids: vec![ii(PERSON_ROOT, "010170-11111")],
            names: vec![name],
            telecom: None,
            as_licensed_entity: vec![AsLicensedEntity {
                ids: vec![ii("1.3.6.1.4.1.38760.4.2", "LIC-7")],
                code: None,
            }],
            as_member: vec![AsMember {
                ids: vec![ii("1.3.6.1.4.1.38760.4.3", "M-3")],
                group: organization("Ward 3"),
            }],
        }),
        represented_organization: Some(organization("City Hospital")),
    }
}

pub fn organization(name: &str) -> RepresentedOrganization {
    RepresentedOrganization {
        ids: vec![ii("1.3.6.1.4.1.38760.4.4", "ORG-1")],
        name: Some(name.to_string()),
        telecom: None,
    }
}

/// Control act details exercising every optional element and participant.
pub fn full_details() -> ControlActDetails {
    ControlActDetails {
        code: Some(ClassificatorId::new("PRPA_TE201305UV02", oids::trigger_event_code()).unwrap()),
        text: Some("Patient registration & update".to_string()),
        effective_time: Some(DateTime::parse_from_rfc3339("2024-03-01T09:00:00+02:00").unwrap()),
        priority_code: Some(ClassificatorId::new("R", oids::act_priority()).unwrap()),
        reason_codes: vec![
            ClassificatorId::new("NEW", oids::action_code_id()).unwrap(),
            ClassificatorId::new("ADMIT", oids::reason_code_id()).unwrap()
                .with_display_name(Some("Admission".to_string())),
            ClassificatorId::new("X1", oid("1.3.6.1.4.1.38760.9.9")).unwrap(),
        ],
        language_code: Some("lv".to_string()),
        overseers: vec![Overseer {
            type_code: OverseerTypeCode::Verifier,
            assigned_person: doctor(),
        }],
        authors: vec![
            AuthorOrPerformer::person(doctor()),
            AuthorOrPerformer::device(AssignedDevice {
                ids: vec![ii(DEVICE_ROOT, "lab-role")],
                device: Some(device("lab-analyzer").named("Analyzer 9")),
                represented_organization: None,
            }),
        ],
        data_enterers: vec![DataEnterer {
            assigned_person: AssignedPerson {
                ids: vec![ii(PERSON_ROOT, "NURSE-1")],
                ..Default::default()
            },
        }],
        information_recipients: vec![InformationRecipient {
            type_code: RecipientTypeCode::Tracker,
            assigned_person: AssignedPerson {
                ids: vec![ii(PERSON_ROOT, "GP-9")],
                ..Default::default()
            },
        }],
    }
}

pub fn request(version: SchemaVersion) -> TransmissionWrapper {
    let mut envelope = envelope(REQUEST_INTERACTION, version);
    envelope.sequence_number = Some(42);
    envelope.attention_lines.push(AttentionLine {
        key_word_text: Some("Department".to_string()),
        value: "Cardiology".to_string(),
    });
    Request {
        envelope,
        control_act: MessageControlAct::new(full_details(), subject()),
    }
    .into()
}

pub fn acknowledgement(type_code: AcknowledgementType) -> Acknowledgement {
    Acknowledgement::new(type_code, target())
}

pub fn error_detail() -> AcknowledgementDetail {
    AcknowledgementDetail::error(
        AcknowledgementDetailCode::national("E-104").unwrap(),
        "Patient not found",
    )
    .with_location("//hl7:subject")
}

pub fn acknowledgement_response(
    version: SchemaVersion,
    acknowledgement: Acknowledgement,
) -> TransmissionWrapper {
    AcknowledgementResponse {
        envelope: envelope(ACK_INTERACTION, version),
        acknowledgement,
    }
    .into()
}

pub fn application_response(version: SchemaVersion) -> TransmissionWrapper {
    ApplicationResponse {
        envelope: envelope(REQUEST_INTERACTION, version),
        acknowledgement: acknowledgement(AcknowledgementType::ApplicationAccept).with_detail(
            AcknowledgementDetail::new(Severity::Information).with_text("Registered"),
        ),
        control_act: MessageControlAct::new(ControlActDetails::default(), subject()),
    }
    .into()
}

pub fn query_payload() -> QueryByParameterPayload {
    QueryByParameterPayload {
        query_id: ii("1.3.6.1.4.1.38760.7.1", "Q-1"),
        status_code: QueryStatusCode::New,
        initial_quantity: Some(10),
        parameters: QUERY_PARAMETERS.to_string(),
    }
}

pub fn query_request(version: SchemaVersion) -> TransmissionWrapper {
    QueryApplicationResponse {
        envelope: envelope(QUERY_INTERACTION, version),
        acknowledgement: None,
        control_act: QueryControlAcknowledgement::query(ControlActDetails::default(), query_payload()),
    }
    .into()
}

pub fn query_response(version: SchemaVersion) -> TransmissionWrapper {
    let mut query_ack = QueryAcknowledgement::new(QueryResponseCode::Ok);
    query_ack.query_id = Some(ii("1.3.6.1.4.1.38760.7.1", "Q-1"));
    query_ack.status_code = Some(QueryStatusCode::DeliveredResponse);
    query_ack.result_total_quantity = Some(1);
    query_ack.result_current_quantity = Some(1);
    query_ack.result_remaining_quantity = Some(0);
    QueryApplicationResponse {
        envelope: envelope(QUERY_INTERACTION, version),
        acknowledgement: Some(acknowledgement(AcknowledgementType::ApplicationAccept)),
        control_act: QueryControlAcknowledgement::response(
            ControlActDetails::default(),
            query_ack,
            Some(subject()),
        ),
    }
    .into()
}

/// Hand-written acknowledgement in the 2011 dialect, with layout and comments
/// a real sender would produce.
pub const ACK_2011_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- accept acknowledgement -->
<MCCI_IN000002UV01 xmlns="urn:hl7-org:v3" ITSVersion="XML_1.0">
  <templateId root="1.3.6.1.4.1.38760.1.2" extension="URN:IVIS:100001:XSD-HL7V3-2011-multicacheschemas-MCCI_IN000002UV01"/>
  <id root="1.3.6.1.4.1.38760.1.1" extension="5c2a9d2e-1f0a-4b8e-9a57-0c7e1b3d2f11"/>
  <creationTime value="20240301102030.0000+0200"/>
  <versionCode code="V3-2011"/>
  <interactionId root="2.16.840.1.113883.1.6" extension="MCCI_IN000002UV01"/>
  <processingCode code="P"/>
  <processingModeCode code="T"/>
  <acceptAckCode code="NE"/>
  <receiver typeCode="RCV">
    <device classCode="DEV" determinerCode="INSTANCE">
      <id root="1.3.6.1.4.1.38760.3.2" extension="clinic"/>
    </device>
  </receiver>
  <sender typeCode="SND">
    <device classCode="DEV" determinerCode="INSTANCE">
      <id root="1.3.6.1.4.1.38760.3.2" extension="registry"/>
      <name>Registry</name>
      <softwareName>IVIS</softwareName>
    </device>
  </sender>
  <acknowledgement typeCode="AE">
    <targetMessage>
      <id root="1.3.6.1.4.1.38760.1.1" extension="{0B0E7A1C-4D2F-4E1B-8C3A-9F6D5E4C3B21}"/>
    </targetMessage>
    <acknowledgementDetail typeCode="E">
      <code code="E-104" codeSystem="1.3.6.1.4.1.38760.2.3"/>
      <text>Patient &amp; episode not found</text>
    </acknowledgementDetail>
  </acknowledgement>
</MCCI_IN000002UV01>
"#;

/// The same acknowledgement with the 2006 nested type code.
pub fn ack_2006_xml() -> String {
    ACK_2011_XML
        .replace("2011", "2006")
        .replace(
            r#"<acknowledgement typeCode="AE">"#,
            "<acknowledgement>\n    <typeCode code=\"AE\"/>",
        )
}
