mod common;

use common::*;
use hl7v3::{
    AcknowledgementDetail, AcknowledgementType, ControlActDetails, QueryApplicationResponse,
    QueryControlAcknowledgement, SchemaVersion, Severity, Subject, TransmissionWrapper,
};
use hl7v3_serde::{
    CodecError, CodecOptions, Result, Serializer, TimestampFormat, from_xml_str, to_xml_string,
};
use quick_xml::Writer;

fn write_into_buffer(
    serializer: &Serializer,
    wrapper: &TransmissionWrapper,
    local_name: &str,
) -> (Result<()>, Vec<u8>) {
    let mut writer = Writer::new(Vec::new());
    let result = serializer.write(&mut writer, wrapper, local_name);
    (result, writer.into_inner())
}

fn position_of(xml: &str, needle: &str) -> usize {
    xml.find(needle)
        .unwrap_or_else(|| panic!("{needle} not found in {xml}"))
}

#[test]
fn test_write_root_element() -> Result<()> {
    let xml = to_xml_string(&request(SchemaVersion::V2011), REQUEST_INTERACTION, SchemaVersion::V2011)?;
    assert!(xml.starts_with(
        r#"<hl7:PRPA_IN201305UV02 ITSVersion="XML_1.0" xmlns:hl7="urn:hl7-org:v3""#
    ));
    assert!(xml.ends_with("</hl7:PRPA_IN201305UV02>"));
    assert!(!xml.contains("<?xml"));
    Ok(())
}

#[test]
fn test_write_envelope_in_schema_order() -> Result<()> {
    let xml = to_xml_string(&request(SchemaVersion::V2011), REQUEST_INTERACTION, SchemaVersion::V2011)?;
    let order = [
        "<hl7:templateId ",
        "<hl7:id ",
        "<hl7:creationTime ",
        "<hl7:versionCode ",
        "<hl7:interactionId ",
        "<hl7:processingCode ",
        "<hl7:processingModeCode ",
        "<hl7:acceptAckCode ",
        "<hl7:sequenceNumber ",
        "<hl7:receiver ",
        "<hl7:sender ",
        "<hl7:attentionLine>",
        "<hl7:controlActProcess ",
    ];
    let positions: Vec<usize> = order.iter().map(|tag| position_of(&xml, tag)).collect();
    assert!(
        positions.windows(2).all(|pair| pair[0] < pair[1]),
        "out of order: {xml}"
    );
    assert!(xml.contains(r#"<hl7:sequenceNumber value="42"/>"#));
    assert!(xml.contains(
        r#"<hl7:receiver typeCode="RCV"><hl7:device classCode="DEV" determinerCode="INSTANCE"><hl7:id root="1.3.6.1.4.1.38760.3.2" extension="registry"/></hl7:device></hl7:receiver>"#
    ));
    assert!(xml.contains(
        r#"<hl7:attentionLine><hl7:keyWordText>Department</hl7:keyWordText><hl7:value xsi:type="ST">Cardiology</hl7:value></hl7:attentionLine>"#
    ));
    Ok(())
}

#[test]
fn test_write_control_act_participants() -> Result<()> {
    let xml = to_xml_string(&request(SchemaVersion::V2011), REQUEST_INTERACTION, SchemaVersion::V2011)?;
    assert!(xml.contains(r#"<hl7:controlActProcess classCode="CACT" moodCode="EVN">"#));
    assert!(xml.contains("<hl7:text>Patient registration &amp; update</hl7:text>"));
    assert!(xml.contains(r#"<hl7:overseer typeCode="VRF"><hl7:assignedPerson classCode="ASSIGNED">"#));
    assert!(xml.contains(r#"<hl7:assignedPerson classCode="PSN" determinerCode="INSTANCE">"#));
    assert!(xml.contains(
        "<hl7:name><hl7:given>Anna</hl7:given><hl7:family>Ozola</hl7:family><hl7:prefix>Dr.</hl7:prefix></hl7:name>"
    ));
    assert!(xml.contains(r#"<hl7:authorOrPerformer typeCode="AUT"><hl7:assignedDevice classCode="ASSIGNED">"#));
    assert!(xml.contains(r#"<hl7:dataEnterer typeCode="ENT">"#));
    assert!(xml.contains(r#"<hl7:informationRecipient typeCode="TRC">"#));
    assert!(xml.contains(r#"<hl7:asMember classCode="MBR">"#));
    assert!(xml.contains(r#"<hl7:group classCode="ORG" determinerCode="INSTANCE">"#));
    assert!(xml.contains(&format!(r#"<hl7:subject typeCode="SUBJ">{SUBJECT_CONTENT}</hl7:subject>"#)));
    Ok(())
}

#[test]
fn test_write_acknowledgement_type_by_dialect() -> Result<()> {
    let ack = acknowledgement(AcknowledgementType::ApplicationAccept);

    let modern = to_xml_string(
        &acknowledgement_response(SchemaVersion::V2011, ack.clone()),
        ACK_INTERACTION,
        SchemaVersion::V2011,
    )?;
    assert!(modern.contains(r#"<hl7:acknowledgement typeCode="AA"><hl7:targetMessage>"#));

    let legacy = to_xml_string(
        &acknowledgement_response(SchemaVersion::V2006, ack.clone()),
        ACK_INTERACTION,
        SchemaVersion::V2006,
    )?;
    assert!(legacy.contains(
        r#"<hl7:acknowledgement><hl7:typeCode code="AA"/><hl7:targetMessage>"#
    ));

    let from_modern = from_xml_str(&modern, SchemaVersion::V2011)?;
    let from_legacy = from_xml_str(&legacy, SchemaVersion::V2006)?;
    assert_eq!(from_modern.acknowledgement(), Some(&ack));
    assert_eq!(from_legacy.acknowledgement(), Some(&ack));
    Ok(())
}

#[test]
fn test_write_escalates_commit_accept_with_errors() -> Result<()> {
    let ack = acknowledgement(AcknowledgementType::CommitAccept).with_detail(error_detail());
    let wrapper = acknowledgement_response(SchemaVersion::V2011, ack);

    let xml = to_xml_string(&wrapper, ACK_INTERACTION, SchemaVersion::V2011)?;
    assert!(xml.contains(r#"<hl7:acknowledgement typeCode="CE">"#), "{xml}");
    assert!(!xml.contains(r#"typeCode="CA""#));

    let read = from_xml_str(&xml, SchemaVersion::V2011)?;
    let read_ack = read.acknowledgement().unwrap();
    assert_eq!(read_ack.type_code, AcknowledgementType::CommitError);
    assert_eq!(read_ack.details, vec![error_detail()]);
    Ok(())
}

#[test]
fn test_write_keeps_type_without_errors() -> Result<()> {
    let ack = acknowledgement(AcknowledgementType::CommitAccept)
        .with_detail(AcknowledgementDetail::new(Severity::Warning).with_text("late"));
    let xml = to_xml_string(
        &acknowledgement_response(SchemaVersion::V2011, ack),
        ACK_INTERACTION,
        SchemaVersion::V2011,
    )?;
    assert!(xml.contains(r#"<hl7:acknowledgement typeCode="CA">"#));
    assert!(xml.contains(r#"<hl7:acknowledgementDetail typeCode="W"><hl7:text>late</hl7:text>"#));
    Ok(())
}

#[test]
fn test_write_rejects_reject_type_with_errors() {
    for type_code in [AcknowledgementType::ApplicationReject, AcknowledgementType::CommitReject] {
        let ack = acknowledgement(type_code).with_detail(error_detail());
        let wrapper = acknowledgement_response(SchemaVersion::V2011, ack);

        let (result, output) =
            write_into_buffer(&Serializer::new(SchemaVersion::V2011), &wrapper, ACK_INTERACTION);
        match result {
            Err(CodecError::InvariantViolation { message, .. }) => {
                assert!(message.contains(type_code.code()), "{message}");
            }
            other => panic!("expected an invariant violation, got {other:?}"),
        }
        assert!(output.is_empty());
    }
}

#[test]
fn test_write_rejects_subject_with_query() {
    let wrapper: TransmissionWrapper = QueryApplicationResponse {
        envelope: envelope(QUERY_INTERACTION, SchemaVersion::V2011),
        acknowledgement: None,
        control_act: QueryControlAcknowledgement {
            details: ControlActDetails::default(),
            subject: Some(subject()),
            query_acknowledgement: None,
            query_by_parameter: Some(query_payload()),
            query_continuation: None,
        },
    }
    .into();

    let (result, output) =
        write_into_buffer(&Serializer::new(SchemaVersion::V2011), &wrapper, QUERY_INTERACTION);
    match result {
        Err(CodecError::InvariantViolation { message, position }) => {
            assert!(message.contains("mutually exclusive"), "{message}");
            assert_eq!(position, None);
        }
        other => panic!("expected an invariant violation, got {other:?}"),
    }
    assert!(output.is_empty());

    // Also nothing when a declaration was requested.
    let serializer = Serializer::with_options(CodecOptions {
        xml_declaration: true,
        ..CodecOptions::default()
    });
    let mut out = Vec::new();
    assert!(serializer.write_document(&mut out, &wrapper, QUERY_INTERACTION).is_err());
    assert!(out.is_empty());
}

#[test]
fn test_write_rejects_bad_root_name() {
    let (result, output) = write_into_buffer(
        &Serializer::default(),
        &request(SchemaVersion::V2011),
        "hl7:PRPA_IN201305UV02",
    );
    assert!(matches!(result, Err(CodecError::Structural { .. })), "{result:?}");
    assert!(output.is_empty());
}

#[test]
fn test_write_rejects_malformed_subject() {
    let mut wrapper = request(SchemaVersion::V2011);
    if let TransmissionWrapper::Request(request) = &mut wrapper {
        request.control_act.subject = Some(Subject::new("<hl7:open>").unwrap());
    }
    let (result, output) =
        write_into_buffer(&Serializer::default(), &wrapper, REQUEST_INTERACTION);
    match result {
        Err(CodecError::Structural { element, .. }) => assert_eq!(element, "subject"),
        other => panic!("expected a structural error, got {other:?}"),
    }
    assert!(output.is_empty());
}

#[test]
fn test_write_timestamp_formats() -> Result<()> {
    let wrapper = acknowledgement_response(
        SchemaVersion::V2011,
        acknowledgement(AcknowledgementType::ApplicationAccept),
    );

    let canonical = Serializer::default().write_to_string(&wrapper, ACK_INTERACTION)?;
    assert!(canonical.contains(r#"<hl7:creationTime value="20240301102030.0000+0200"/>"#));

    let legacy = Serializer::with_options(CodecOptions {
        timestamp_format: TimestampFormat::Legacy,
        ..CodecOptions::default()
    })
    .write_to_string(&wrapper, ACK_INTERACTION)?;
    assert!(legacy.contains(r#"<hl7:creationTime value="20240301082030.000"/>"#));

    // Both forms denote the same instant.
    assert_eq!(
        from_xml_str(&canonical, SchemaVersion::V2011)?.envelope().creation_time,
        from_xml_str(&legacy, SchemaVersion::V2011)?.envelope().creation_time,
    );
    Ok(())
}

#[test]
fn test_write_document_declaration_and_indent() -> Result<()> {
    let serializer = Serializer::with_options(CodecOptions {
        xml_declaration: true,
        indent: 2,
        ..CodecOptions::default()
    });
    let wrapper = request(SchemaVersion::V2011);
    let xml = serializer.write_to_string(&wrapper, REQUEST_INTERACTION)?;
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains("\n  <hl7:templateId "));

    // Layout does not change the content.
    assert_eq!(serializer.read_str(&xml)?, wrapper);
    Ok(())
}

#[test]
fn test_write_into_caller_writer_skips_declaration() -> Result<()> {
    let serializer = Serializer::with_options(CodecOptions {
        xml_declaration: true,
        ..CodecOptions::default()
    });
    let (result, output) =
        write_into_buffer(&serializer, &request(SchemaVersion::V2011), REQUEST_INTERACTION);
    result?;
    let xml = String::from_utf8(output).unwrap();
    assert!(xml.starts_with("<hl7:PRPA_IN201305UV02 "));
    Ok(())
}
