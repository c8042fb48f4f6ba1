//! `hl7v3`: inspect, normalize and acknowledge HL7 V3 messages.

mod config;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use hl7v3::{
    AcknowledgementDetail, AcknowledgementDetailCode, AcknowledgementResponse,
    AcknowledgementType, ControlActRef, InstanceIdentifier, InteractionName, ResponseContext,
    TransmissionWrapper,
};
use hl7v3_serde::json::to_json_string_pretty;
use hl7v3_serde::{ANY_INTERACTION, Serializer};
use quick_xml::NsReader;
use tracing::info;

use crate::config::{CliConfig, Command, parse_detail};

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hl7v3={level},hl7v3_serde={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn read_message(
    serializer: &Serializer,
    path: &Path,
    interaction_id: Option<&str>,
) -> anyhow::Result<TransmissionWrapper> {
    let mut reader = NsReader::from_reader(open_input(path)?);
    let wrapper = serializer
        .read(&mut reader, interaction_id.unwrap_or(ANY_INTERACTION))
        .with_context(|| format!("cannot read HL7 V3 message from {}", path.display()))?;
    Ok(wrapper)
}

fn write_message(
    serializer: &Serializer,
    wrapper: &TransmissionWrapper,
    output: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let root = wrapper.envelope().interaction_id.name().to_string();
    let mut out = open_output(output)?;
    serializer.write_document(&mut out, wrapper, &root)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn describe(wrapper: &TransmissionWrapper) -> String {
    let envelope = wrapper.envelope();
    let mut lines = vec![
        format!("kind:            {}", wrapper.kind()),
        format!("interaction:     {}", envelope.interaction_id.name()),
        format!("template:        {}", envelope.template_id.extension),
        format!("id:              {}", envelope.id),
        format!("created:         {}", envelope.creation_time.to_rfc3339()),
        format!("processing:      {}/{}", envelope.processing_code, envelope.processing_mode_code),
        format!("accept ack:      {}", envelope.accept_ack_code),
        format!("sender:          {}", envelope.sender.primary_id()),
        format!("receiver:        {}", envelope.receiver.primary_id()),
    ];
    if let Some(ack) = wrapper.acknowledgement() {
        lines.push(format!(
            "acknowledgement: {} for {} ({} detail(s))",
            ack.type_code,
            ack.target_message.extension(),
            ack.details.len()
        ));
        for detail in &ack.details {
            let code = detail.code.as_ref().map(|c| c.code()).unwrap_or("-");
            let text = detail.text.as_deref().unwrap_or("");
            lines.push(format!("  [{}] {code} {text}", detail.type_code));
        }
    }
    if let Some(act) = wrapper.control_act() {
        let details = act.details();
        if let Some(code) = &details.code {
            lines.push(format!("trigger event:   {}", code.code()));
        }
        lines.push(format!(
            "reason codes:    {} action, {} reason, {} other",
            details.action_codes().len(),
            details.reason_codes_only().len(),
            details.unclassified_reason_codes().len()
        ));
        if let ControlActRef::Query(query) = act {
            match query.shape() {
                Ok(shape) => lines.push(format!("query:           {shape:?}")),
                Err(e) => lines.push(format!("query:           {e}")),
            }
        }
    }
    lines.join("\n")
}

fn inspect(
    serializer: &Serializer,
    file: &Path,
    interaction_id: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let wrapper = read_message(serializer, file, interaction_id)?;
    info!(kind = %wrapper.kind(), "message read");
    if json {
        println!("{}", to_json_string_pretty(&wrapper)?);
    } else {
        println!("{}", describe(&wrapper));
    }
    Ok(())
}

fn acknowledge(
    serializer: &Serializer,
    file: &Path,
    type_code: &str,
    details: &[String],
    interaction: &str,
    output: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let TransmissionWrapper::Request(request) = read_message(serializer, file, None)? else {
        bail!("{} is not a request message", file.display());
    };

    let type_code: AcknowledgementType = type_code.parse()?;
    let mut ack_details = Vec::new();
    for detail in details {
        let Some((code, text)) = parse_detail(detail) else {
            bail!("detail '{detail}' is not in CODE:TEXT form");
        };
        ack_details.push(AcknowledgementDetail::error(
            AcknowledgementDetailCode::national(code)?,
            text,
        ));
    }

    let context = ResponseContext::for_interaction(
        serializer.schema_version(),
        InteractionName::new(interaction)?,
    );
    let response: TransmissionWrapper =
        AcknowledgementResponse::for_request(&request, context, type_code, ack_details).into();
    info!(
        target_message = %request.envelope.id,
        type_code = %type_code,
        "writing acknowledgement"
    );
    write_message(serializer, &response, output)
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(2);
    }

    let serializer = Serializer::with_options(config.codec_options());

    match &config.command {
        Command::Inspect {
            file,
            interaction_id,
            json,
        } => inspect(&serializer, file, interaction_id.as_deref(), *json),
        Command::Normalize { file, output } => {
            let wrapper = read_message(&serializer, file, None)?;
            write_message(&serializer, &wrapper, output.as_ref())
        }
        Command::Acknowledge {
            file,
            type_code,
            details,
            interaction,
            output,
        } => acknowledge(
            &serializer,
            file,
            type_code,
            details,
            interaction,
            output.as_ref(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"<PRPA_IN201305UV02 xmlns="urn:hl7-org:v3" ITSVersion="XML_1.0">
  <templateId root="1.3.6.1.4.1.38760.1.2" extension="URN:IVIS:100001:XSD-HL7V3-2011-multicacheschemas-PRPA_IN201305UV02"/>
  <id root="1.3.6.1.4.1.38760.1.1" extension="5c2a9d2e-1f0a-4b8e-9a57-0c7e1b3d2f11"/>
  <creationTime value="20240301102030"/>
  <versionCode code="V3-2011"/>
  <interactionId root="2.16.840.1.113883.1.6" extension="PRPA_IN201305UV02"/>
  <processingCode code="P"/>
  <processingModeCode code="T"/>
  <acceptAckCode code="AL"/>
  <receiver typeCode="RCV"><device classCode="DEV" determinerCode="INSTANCE"><id root="1.3.6.1.4.1.38760.3.2" extension="registry"/></device></receiver>
  <sender typeCode="SND"><device classCode="DEV" determinerCode="INSTANCE"><id root="1.3.6.1.4.1.38760.3.2" extension="clinic"/></device></sender>
  <controlActProcess classCode="CACT" moodCode="EVN">
    <reasonCode code="NEW" codeSystem="1.3.6.1.4.1.38760.2.1"/>
    <subject typeCode="SUBJ"><registrationEvent/></subject>
  </controlActProcess>
</PRPA_IN201305UV02>"#;

    #[test]
    fn test_describe_request() {
        let wrapper = Serializer::default().read_str(REQUEST).unwrap();
        let text = describe(&wrapper);
        assert!(text.contains("kind:            Request"));
        assert!(text.contains("interaction:     PRPA_IN201305UV02"));
        assert!(text.contains("reason codes:    1 action, 0 reason, 0 other"));
    }

    #[test]
    fn test_acknowledgement_swaps_devices() {
        let serializer = Serializer::default();
        let TransmissionWrapper::Request(request) = serializer.read_str(REQUEST).unwrap() else {
            panic!("expected a request");
        };
        let context = ResponseContext::for_interaction(
            serializer.schema_version(),
            InteractionName::new("MCCI_IN000002UV01").unwrap(),
        );
        let response: TransmissionWrapper = AcknowledgementResponse::for_request(
            &request,
            context,
            AcknowledgementType::ApplicationAccept,
            Vec::new(),
        )
        .into();

        let xml = serializer
            .write_to_string(&response, "MCCI_IN000002UV01")
            .unwrap();
        let back = serializer.read_str(&xml).unwrap();
        assert_eq!(back.envelope().sender, request.envelope.receiver);
        assert_eq!(back.envelope().receiver, request.envelope.sender);
        assert_eq!(
            back.acknowledgement().unwrap().target_message,
            request.envelope.id
        );
    }
}
