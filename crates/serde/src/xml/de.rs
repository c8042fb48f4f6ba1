//! Reading transmission wrappers from HL7 V3 XML.
//!
//! The reader is a strict recursive descent over quick-xml events: one method
//! per element type, each consuming exactly its own subtree. Optional elements
//! are read when the next start tag matches; repeating elements are read in a
//! loop while it does. Anything else at a position where a particular element
//! is required is a structural error.

use std::collections::VecDeque;
use std::io::{BufRead, Cursor};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use hl7v3::participants::{
    ASSIGNED_CLASS_CODE, DATA_ENTERER_TYPE_CODE, DEVICE_CLASS_CODE, INSTANCE_DETERMINER_CODE,
    LICENSED_ENTITY_CLASS_CODE, MEMBER_CLASS_CODE, ORGANIZATION_CLASS_CODE, PERSON_CLASS_CODE,
    RECEIVER_TYPE_CODE, SENDER_TYPE_CODE,
};
use hl7v3::control_act::{CONTROL_ACT_CLASS_CODE, CONTROL_ACT_MOOD_CODE, SUBJECT_TYPE_CODE};
use hl7v3::{
    AcceptAckCode, Acknowledgement, AcknowledgementDetail, AcknowledgementDetailCode,
    AcknowledgementType, AsLicensedEntity, AsMember, AssignedDevice, AssignedParty,
    AssignedPerson, AttentionLine, AuthorOrPerformer, AuthorTypeCode, ClassificatorId,
    ControlAct, ControlActDetails, DataEnterer, Device, Envelope, II, IdentificationId,
    InformationRecipient, InteractionId, MessageControlAct, NamePartKind, OId, Overseer,
    OverseerTypeCode, Person, PersonName, ProcessingCode, ProcessingModeCode,
    QueryAcknowledgement, QueryByParameterPayload, QueryContinuation,
    QueryControlAcknowledgement, QueryResponseCode, QueryStatusCode, RecipientTypeCode,
    RepresentedOrganization, SchemaVersion, Severity, Subject, TemplateId, TransmissionWrapper,
    WrapperParts, oids,
};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::{NsReader, Writer};
use tracing::{debug, trace};

use super::utils::{HL7_NAMESPACE, ITS_VERSION, XSI_NAMESPACE, qualified, unescape};
use crate::datetime::parse_datetime;
use crate::error::{CodecError, Result};

/// An event together with the namespace its name resolved to.
struct Token {
    namespace: Option<Vec<u8>>,
    event: Event<'static>,
}

impl Token {
    fn is_hl7(&self) -> bool {
        self.namespace.as_deref() == Some(HL7_NAMESPACE.as_bytes())
    }

    fn describe(&self) -> String {
        let ns = if self.is_hl7() { "" } else { " (not in the HL7 namespace)" };
        match &self.event {
            Event::Start(e) => format!("<{}>{ns}", String::from_utf8_lossy(e.name().as_ref())),
            Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
            Event::Text(t) => format!("text '{}'", String::from_utf8_lossy(t).trim()),
            Event::CData(_) => "CDATA section".to_string(),
            Event::GeneralRef(r) => format!("entity reference &{};", String::from_utf8_lossy(r)),
            Event::Eof => "end of input".to_string(),
            _ => "unexpected XML content".to_string(),
        }
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Renames an element in the HL7 namespace to use the `hl7` prefix, so a
/// captured fragment stays bound to the namespace the writer declares.
fn requalify(start: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    let qualified_name = qualified(&local_name(start));
    if start.name().as_ref() == qualified_name.as_bytes() {
        return Ok(start.clone().into_owned());
    }
    let mut renamed = BytesStart::new(qualified_name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        renamed.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
    }
    Ok(renamed)
}

fn is_blank(event: &Event<'_>) -> bool {
    matches!(event, Event::Text(text) if text.iter().all(u8::is_ascii_whitespace))
}

/// Takes a run of character data, or nothing if the run is only whitespace
/// between elements.
fn take_text_run(run: &mut Vec<Event<'static>>) -> Vec<Event<'static>> {
    let events = std::mem::take(run);
    if events.iter().all(is_blank) {
        Vec::new()
    } else {
        events
    }
}

/// Adds the namespace declarations a fragment root inherited from its
/// ancestors, unless the element declares the prefix itself.
fn declare_inherited(
    mut start: BytesStart<'static>,
    bindings: &[(String, String)],
) -> Result<BytesStart<'static>> {
    for (name, namespace) in bindings {
        let declared = start
            .try_get_attribute(name.as_str())
            .map_err(quick_xml::Error::from)?
            .is_some();
        if !declared {
            start.push_attribute((name.as_str(), namespace.as_str()));
        }
    }
    Ok(start)
}

/// Forward-only view over an [`NsReader`] with one element of lookahead.
///
/// Insignificant events (declaration, comments, processing instructions,
/// doctype) are dropped and empty elements are split into a start and an end
/// event. Whitespace-only text is kept in the stream; [`EventCursor::peek`]
/// and [`EventCursor::next`] step over it, text content is read through the
/// raw variants.
struct EventCursor<'r, R> {
    reader: &'r mut NsReader<R>,
    buf: Vec<u8>,
    buffered: VecDeque<Token>,
}

impl<'r, R: BufRead> EventCursor<'r, R> {
    fn new(reader: &'r mut NsReader<R>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            buffered: VecDeque::new(),
        }
    }

    fn position(&self) -> Option<u64> {
        Some(self.reader.buffer_position() as u64)
    }

    fn fill(&mut self) -> Result<()> {
        while self.buffered.is_empty() {
            self.buf.clear();
            let (resolved, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
            let namespace = match resolved {
                ResolveResult::Bound(ns) => Some(ns.as_ref().to_vec()),
                _ => None,
            };
            match event {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {
                    trace!("skipping insignificant XML event");
                }
                Event::Empty(start) => {
                    let end = Event::End(start.to_end().into_owned());
                    self.buffered.push_back(Token {
                        namespace: namespace.clone(),
                        event: Event::Start(start.into_owned()),
                    });
                    self.buffered.push_back(Token {
                        namespace,
                        event: end,
                    });
                }
                other => self.buffered.push_back(Token {
                    namespace,
                    event: other.into_owned(),
                }),
            }
        }
        Ok(())
    }

    /// Fills the lookahead, stepping over whitespace between elements.
    fn fill_significant(&mut self) -> Result<()> {
        loop {
            self.fill()?;
            let blank = self
                .buffered
                .front()
                .is_some_and(|token| is_blank(&token.event));
            if !blank {
                return Ok(());
            }
            self.buffered.pop_front();
        }
    }

    fn pop(&mut self) -> Result<Token> {
        let position = self.position();
        self.buffered
            .pop_front()
            .ok_or_else(|| CodecError::structural("document", "unexpected end of input", position))
    }

    fn peek(&mut self) -> Result<&Token> {
        self.fill_significant()?;
        let position = self.position();
        self.buffered
            .front()
            .ok_or_else(|| CodecError::structural("document", "unexpected end of input", position))
    }

    fn next(&mut self) -> Result<Token> {
        self.fill_significant()?;
        self.pop()
    }

    fn next_raw(&mut self) -> Result<Token> {
        self.fill()?;
        self.pop()
    }

    fn structural(&self, element: &str, message: impl Into<String>) -> CodecError {
        CodecError::structural(element, message, self.position())
    }

    /// Local name of the next event if it is a start tag in the HL7 namespace.
    fn peek_start(&mut self) -> Result<Option<String>> {
        let token = self.peek()?;
        Ok(match &token.event {
            Event::Start(e) if token.is_hl7() => Some(local_name(e)),
            _ => None,
        })
    }

    fn at_start(&mut self, local: &str) -> Result<bool> {
        let token = self.peek()?;
        Ok(match &token.event {
            Event::Start(e) => token.is_hl7() && e.local_name().as_ref() == local.as_bytes(),
            _ => false,
        })
    }

    /// Consumes the start tag of any HL7 element, e.g. the message root.
    fn expect_hl7_start(&mut self, context: &str) -> Result<BytesStart<'static>> {
        let token = self.next()?;
        let found = token.describe();
        let hl7 = token.is_hl7();
        match token.event {
            Event::Start(e) if hl7 => Ok(e),
            _ => Err(self.structural(
                context,
                format!("expected an element in namespace {HL7_NAMESPACE}, found {found}"),
            )),
        }
    }

    fn expect_start(&mut self, local: &str) -> Result<BytesStart<'static>> {
        let token = self.next()?;
        let found = token.describe();
        let hl7 = token.is_hl7();
        match token.event {
            Event::Start(e) if hl7 && e.local_name().as_ref() == local.as_bytes() => Ok(e),
            _ => Err(self.structural(local, format!("expected <{local}>, found {found}"))),
        }
    }

    fn expect_end(&mut self, local: &str) -> Result<()> {
        let token = self.next()?;
        match &token.event {
            Event::End(e) if e.local_name().as_ref() == local.as_bytes() => Ok(()),
            _ => Err(self.structural(local, format!("unexpected {}", token.describe()))),
        }
    }

    /// Reads text content up to and including the end tag of `element`.
    fn read_text(&mut self, element: &str) -> Result<String> {
        let mut value = String::new();
        loop {
            let token = self.next_raw()?;
            match &token.event {
                Event::Text(t) => value.push_str(&unescape(&String::from_utf8_lossy(t))),
                Event::CData(c) => value.push_str(&String::from_utf8_lossy(c)),
                Event::GeneralRef(r) => {
                    value.push_str(&unescape(&format!("&{};", String::from_utf8_lossy(r))))
                }
                Event::End(_) => return Ok(value),
                _ => {
                    return Err(self.structural(
                        element,
                        format!("expected text content, found {}", token.describe()),
                    ));
                }
            }
        }
    }

    /// Namespace declarations in scope that a captured fragment has to carry
    /// with it. The HL7 namespace is left out, its elements are requalified,
    /// and so is `xsi`, which the writer declares on the root.
    fn inherited_bindings(&self) -> Vec<(String, String)> {
        self.reader
            .resolver()
            .bindings()
            .filter_map(|(prefix, namespace)| {
                let namespace = String::from_utf8_lossy(namespace.0).into_owned();
                let name = match prefix {
                    PrefixDeclaration::Default => "xmlns".to_string(),
                    PrefixDeclaration::Named(name) => {
                        format!("xmlns:{}", String::from_utf8_lossy(name))
                    }
                };
                let declared_by_writer = namespace == HL7_NAMESPACE
                    || (name == "xmlns:xsi" && namespace == XSI_NAMESPACE);
                (!declared_by_writer).then_some((name, namespace))
            })
            .collect()
    }

    /// Copies everything up to the end tag of `element` into a string, then
    /// consumes that end tag.
    ///
    /// Whitespace-only text between elements is dropped; character data is
    /// kept as written.
    fn capture_inner(&mut self, element: &str) -> Result<String> {
        let bindings = self.inherited_bindings();
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let mut depth = 0usize;
        let mut open: Option<BytesStart<'static>> = None;
        let mut run: Vec<Event<'static>> = Vec::new();
        loop {
            let token = self.next_raw()?;
            let hl7 = token.is_hl7();
            match token.event {
                event @ (Event::Text(_) | Event::CData(_) | Event::GeneralRef(_)) => {
                    run.push(event);
                }
                Event::Start(start) => {
                    if let Some(parent) = open.take() {
                        writer.write_event(Event::Start(parent))?;
                    }
                    for event in take_text_run(&mut run) {
                        writer.write_event(event)?;
                    }
                    let start = if hl7 { requalify(&start)? } else { start };
                    let start = if depth == 0 {
                        declare_inherited(start, &bindings)?
                    } else {
                        start
                    };
                    open = Some(start);
                    depth += 1;
                }
                Event::End(end) => {
                    let text = take_text_run(&mut run);
                    match open.take() {
                        Some(start) if text.is_empty() => {
                            writer.write_event(Event::Empty(start))?;
                            depth -= 1;
                            continue;
                        }
                        Some(start) => writer.write_event(Event::Start(start))?,
                        None => {}
                    }
                    for event in text {
                        writer.write_event(event)?;
                    }
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    let end = if hl7 {
                        BytesEnd::new(qualified(&String::from_utf8_lossy(
                            end.local_name().as_ref(),
                        )))
                    } else {
                        end
                    };
                    writer.write_event(Event::End(end))?;
                }
                Event::Eof => {
                    return Err(self.structural(element, "unexpected end of input"));
                }
                other => {
                    if let Some(parent) = open.take() {
                        writer.write_event(Event::Start(parent))?;
                    }
                    for event in take_text_run(&mut run) {
                        writer.write_event(event)?;
                    }
                    writer.write_event(other)?;
                }
            }
        }
        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| self.structural(element, e.to_string()))
    }

    fn attribute(&self, start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.as_ref() == name.as_bytes() {
                return Ok(Some(
                    unescape(&String::from_utf8_lossy(&attr.value)).into_owned(),
                ));
            }
        }
        Ok(None)
    }
}

/// Recursive-descent reader for one message.
pub(crate) struct MessageReader<'r, R> {
    cursor: EventCursor<'r, R>,
    version: SchemaVersion,
}

impl<'r, R: BufRead> MessageReader<'r, R> {
    pub(crate) fn new(reader: &'r mut NsReader<R>, version: SchemaVersion) -> Self {
        Self {
            cursor: EventCursor::new(reader),
            version,
        }
    }

    /// Reads the message rooted at the next element, consuming its end tag.
    ///
    /// With `expected` set, the root name, `interactionId` and `templateId`
    /// must all name that interaction.
    pub(crate) fn read_message(mut self, expected: Option<&str>) -> Result<TransmissionWrapper> {
        let root = self.cursor.expect_hl7_start("message")?;
        let root_name = local_name(&root);
        debug!(
            root = %root_name,
            expected = expected.unwrap_or("*"),
            version = %self.version,
            "reading HL7 V3 message"
        );

        if let Some(expected) = expected
            && root_name != expected
        {
            return Err(self.cursor.structural(
                &root_name,
                format!("expected message <{expected}>, found <{root_name}>"),
            ));
        }
        if let Some(its) = self.cursor.attribute(&root, "ITSVersion")?
            && its != ITS_VERSION
        {
            return Err(self.invalid_attribute(
                &root_name,
                "ITSVersion",
                &its,
                format!("expected {ITS_VERSION}"),
            ));
        }

        let envelope = self.read_envelope(expected)?;
        let acknowledgement = if self.cursor.at_start("acknowledgement")? {
            Some(self.read_acknowledgement()?)
        } else {
            None
        };
        let control_act = if self.cursor.at_start("controlActProcess")? {
            Some(self.read_control_act()?)
        } else {
            None
        };
        self.cursor.expect_end(&root_name)?;

        let position = self.cursor.position();
        let wrapper = WrapperParts {
            envelope,
            acknowledgement,
            control_act,
        }
        .classify()
        .map_err(|e| CodecError::invariant(e.to_string(), position))?;
        debug!(kind = %wrapper.kind(), "classified message");
        Ok(wrapper)
    }

    fn invalid_attribute(
        &self,
        element: &str,
        attribute: &str,
        value: &str,
        message: impl Into<String>,
    ) -> CodecError {
        CodecError::InvalidAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            message: message.into(),
            position: self.cursor.position(),
        }
    }

    /// A mandatory, non-empty attribute.
    fn required_attribute(
        &self,
        start: &BytesStart<'_>,
        element: &str,
        name: &str,
    ) -> Result<String> {
        match self.cursor.attribute(start, name)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            Some(value) => Err(self.invalid_attribute(element, name, &value, "must not be empty")),
            None => Err(self.invalid_attribute(element, name, "", "missing mandatory attribute")),
        }
    }

    /// An attribute whose value is fixed for this element position.
    fn fixed_attribute(
        &self,
        start: &BytesStart<'_>,
        element: &str,
        name: &str,
        expected: &str,
    ) -> Result<()> {
        let value = self.required_attribute(start, element, name)?;
        if value == expected {
            Ok(())
        } else {
            Err(self.invalid_attribute(element, name, &value, format!("expected {expected}")))
        }
    }

    /// An attribute decoded through a vocabulary lookup.
    fn coded_attribute<T, E: std::fmt::Display>(
        &self,
        start: &BytesStart<'_>,
        element: &str,
        name: &str,
        decode: impl FnOnce(&str) -> std::result::Result<T, E>,
    ) -> Result<T> {
        let value = self.required_attribute(start, element, name)?;
        decode(&value).map_err(|e| self.invalid_attribute(element, name, &value, e.to_string()))
    }

    /// An element whose whole content is a single attribute, e.g.
    /// `<processingCode code="P"/>`.
    fn attribute_element(&mut self, element: &str, name: &str) -> Result<String> {
        let start = self.cursor.expect_start(element)?;
        let value = self.required_attribute(&start, element, name)?;
        self.cursor.expect_end(element)?;
        Ok(value)
    }

    fn optional_attribute_element(&mut self, element: &str, name: &str) -> Result<Option<String>> {
        if self.cursor.at_start(element)? {
            Ok(Some(self.attribute_element(element, name)?))
        } else {
            Ok(None)
        }
    }

    fn coded_element<T, E: std::fmt::Display>(
        &mut self,
        element: &str,
        decode: impl FnOnce(&str) -> std::result::Result<T, E>,
    ) -> Result<T> {
        let start = self.cursor.expect_start(element)?;
        let value = self.coded_attribute(&start, element, "code", decode)?;
        self.cursor.expect_end(element)?;
        Ok(value)
    }

    fn number_element<T>(&mut self, element: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let start = self.cursor.expect_start(element)?;
        let value = self.coded_attribute(&start, element, "value", |v| v.trim().parse::<T>())?;
        self.cursor.expect_end(element)?;
        Ok(value)
    }

    fn optional_number_element<T>(&mut self, element: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if self.cursor.at_start(element)? {
            Ok(Some(self.number_element(element)?))
        } else {
            Ok(None)
        }
    }

    fn timestamp_element(&mut self, element: &str) -> Result<DateTime<FixedOffset>> {
        let start = self.cursor.expect_start(element)?;
        let value = self.required_attribute(&start, element, "value")?;
        let parsed = parse_datetime(&value).ok_or_else(|| CodecError::InvalidDateTime {
            element: element.to_string(),
            value: value.clone(),
            position: self.cursor.position(),
        })?;
        self.cursor.expect_end(element)?;
        Ok(parsed)
    }

    fn optional_text_element(&mut self, element: &str) -> Result<Option<String>> {
        if self.cursor.at_start(element)? {
            self.cursor.expect_start(element)?;
            Ok(Some(self.cursor.read_text(element)?))
        } else {
            Ok(None)
        }
    }

    fn read_ii(&mut self, element: &str) -> Result<II> {
        let start = self.cursor.expect_start(element)?;
        let root = self.required_attribute(&start, element, "root")?;
        let root = OId::new(root.trim())
            .map_err(|e| self.invalid_attribute(element, "root", &root, e.to_string()))?;
        let extension = self.required_attribute(&start, element, "extension")?;
        let id = II::new(root, extension.clone())
            .map_err(|e| self.invalid_attribute(element, "extension", &extension, e.to_string()))?;
        self.cursor.expect_end(element)?;
        Ok(id)
    }

    fn optional_ii(&mut self, element: &str) -> Result<Option<II>> {
        if self.cursor.at_start(element)? {
            Ok(Some(self.read_ii(element)?))
        } else {
            Ok(None)
        }
    }

    fn read_ids(&mut self) -> Result<Vec<II>> {
        let mut ids = Vec::new();
        while self.cursor.at_start("id")? {
            ids.push(self.read_ii("id")?);
        }
        Ok(ids)
    }

    /// Narrows a generic identifier, reporting a rejected extension.
    fn narrow<T>(&self, element: &str, ii: II) -> Result<T>
    where
        T: TryFrom<II, Error = hl7v3::ModelError>,
    {
        let extension = ii.extension().to_string();
        T::try_from(ii)
            .map_err(|e| self.invalid_attribute(element, "extension", &extension, e.to_string()))
    }

    fn read_classificator(&mut self, element: &str) -> Result<ClassificatorId> {
        let start = self.cursor.expect_start(element)?;
        let code = self.required_attribute(&start, element, "code")?;
        let system = self.required_attribute(&start, element, "codeSystem")?;
        let system = OId::new(system.trim())
            .map_err(|e| self.invalid_attribute(element, "codeSystem", &system, e.to_string()))?;
        let display_name = self.cursor.attribute(&start, "displayName")?;
        let classificator = ClassificatorId::new(code.clone(), system)
            .map_err(|e| self.invalid_attribute(element, "code", &code, e.to_string()))?
            .with_display_name(display_name);
        self.cursor.expect_end(element)?;
        Ok(classificator)
    }

    fn optional_classificator(&mut self, element: &str) -> Result<Option<ClassificatorId>> {
        if self.cursor.at_start(element)? {
            Ok(Some(self.read_classificator(element)?))
        } else {
            Ok(None)
        }
    }

    /// A coded element whose code system is fixed for its position.
    fn optional_classificator_from(
        &mut self,
        element: &str,
        code_system: &OId,
    ) -> Result<Option<ClassificatorId>> {
        let Some(code) = self.optional_classificator(element)? else {
            return Ok(None);
        };
        if !code.is_from(code_system) {
            return Err(self.invalid_attribute(
                element,
                "codeSystem",
                code.code_system().as_str(),
                format!("expected code system {code_system}"),
            ));
        }
        Ok(Some(code))
    }

    fn optional_telecom(&mut self) -> Result<Option<String>> {
        self.optional_attribute_element("telecom", "value")
    }

    // Envelope

    fn read_envelope(&mut self, expected: Option<&str>) -> Result<Envelope> {
        let template_id = self.read_ii("templateId")?;
        let template_id: TemplateId = self.narrow("templateId", template_id)?;
        let id = self.read_ii("id")?;
        let id: IdentificationId = self.narrow("id", id)?;
        let creation_time = self.timestamp_element("creationTime")?;
        let version_code = self.attribute_element("versionCode", "code")?;
        let interaction_id = self.read_ii("interactionId")?;
        let interaction_id: InteractionId = self.narrow("interactionId", interaction_id)?;

        if let Some(expected) = expected {
            if interaction_id.name().as_str() != expected {
                return Err(self.invalid_attribute(
                    "interactionId",
                    "extension",
                    interaction_id.name().as_str(),
                    format!("expected interaction {expected}"),
                ));
            }
            if template_id.extension.interaction().as_str() != expected {
                return Err(self.invalid_attribute(
                    "templateId",
                    "extension",
                    template_id.extension.as_str(),
                    format!("expected a template for interaction {expected}"),
                ));
            }
        }

        let processing_code = self.coded_element("processingCode", ProcessingCode::from_code)?;
        let processing_mode_code =
            self.coded_element("processingModeCode", ProcessingModeCode::from_code)?;
        let accept_ack_code = self.coded_element("acceptAckCode", AcceptAckCode::from_code)?;
        let sequence_number = self.optional_number_element::<i64>("sequenceNumber")?;
        let receiver = self.read_transmission_party("receiver", RECEIVER_TYPE_CODE)?;
        let sender = self.read_transmission_party("sender", SENDER_TYPE_CODE)?;

        let mut attention_lines = Vec::new();
        while self.cursor.at_start("attentionLine")? {
            attention_lines.push(self.read_attention_line()?);
        }

        Ok(Envelope {
            template_id,
            id,
            creation_time,
            version_code,
            interaction_id,
            processing_code,
            processing_mode_code,
            accept_ack_code,
            sequence_number,
            receiver,
            sender,
            attention_lines,
        })
    }

    fn read_transmission_party(&mut self, element: &str, type_code: &str) -> Result<Device> {
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "typeCode", type_code)?;
        let device = self.read_device("device")?;
        self.cursor.expect_end(element)?;
        Ok(device)
    }

    fn read_device(&mut self, element: &str) -> Result<Device> {
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", DEVICE_CLASS_CODE)?;
        self.fixed_attribute(&start, element, "determinerCode", INSTANCE_DETERMINER_CODE)?;
        let ids = self.read_ids()?;
        let mut device = Device::new(ids)
            .map_err(|e| self.cursor.structural(element, e.to_string()))?;
        device.name = self.optional_text_element("name")?;
        device.telecom = self.optional_telecom()?;
        device.software_name = self.optional_text_element("softwareName")?;
        self.cursor.expect_end(element)?;
        Ok(device)
    }

    fn read_attention_line(&mut self) -> Result<AttentionLine> {
        self.cursor.expect_start("attentionLine")?;
        let key_word_text = self.optional_text_element("keyWordText")?;
        self.cursor.expect_start("value")?;
        let value = self.cursor.read_text("value")?;
        self.cursor.expect_end("attentionLine")?;
        Ok(AttentionLine {
            key_word_text,
            value,
        })
    }

    // Acknowledgement

    fn read_acknowledgement(&mut self) -> Result<Acknowledgement> {
        let start = self.cursor.expect_start("acknowledgement")?;
        let type_code = if self.version.ack_type_as_attribute() {
            self.coded_attribute(
                &start,
                "acknowledgement",
                "typeCode",
                AcknowledgementType::from_code,
            )?
        } else {
            self.coded_element("typeCode", AcknowledgementType::from_code)?
        };

        self.cursor.expect_start("targetMessage")?;
        let target = self.read_ii("id")?;
        let target_message: IdentificationId = self.narrow("id", target)?;
        self.cursor.expect_end("targetMessage")?;

        let mut details = Vec::new();
        while self.cursor.at_start("acknowledgementDetail")? {
            details.push(self.read_acknowledgement_detail()?);
        }
        self.cursor.expect_end("acknowledgement")?;

        let acknowledgement = Acknowledgement {
            type_code,
            target_message,
            details,
        };
        acknowledgement
            .validate()
            .map_err(|e| CodecError::invariant(e.to_string(), self.cursor.position()))?;
        Ok(acknowledgement)
    }

    fn read_acknowledgement_detail(&mut self) -> Result<AcknowledgementDetail> {
        let element = "acknowledgementDetail";
        let start = self.cursor.expect_start(element)?;
        let type_code = self.coded_attribute(&start, element, "typeCode", Severity::from_code)?;
        let code = match self.optional_classificator("code")? {
            Some(code) => {
                let system = code.code_system().to_string();
                Some(AcknowledgementDetailCode::try_from(code).map_err(|e| {
                    self.invalid_attribute("code", "codeSystem", &system, e.to_string())
                })?)
            }
            None => None,
        };
        let text = self.optional_text_element("text")?;
        let location = self.optional_text_element("location")?;
        self.cursor.expect_end(element)?;
        Ok(AcknowledgementDetail {
            type_code,
            code,
            text,
            location,
        })
    }

    // Control act

    fn read_control_act(&mut self) -> Result<ControlAct> {
        let element = "controlActProcess";
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", CONTROL_ACT_CLASS_CODE)?;
        self.fixed_attribute(&start, element, "moodCode", CONTROL_ACT_MOOD_CODE)?;

        let mut details = ControlActDetails {
            code: self.optional_classificator_from("code", &oids::trigger_event_code())?,
            text: self.optional_text_element("text")?,
            ..Default::default()
        };
        if self.cursor.at_start("effectiveTime")? {
            details.effective_time = Some(self.timestamp_element("effectiveTime")?);
        }
        details.priority_code =
            self.optional_classificator_from("priorityCode", &oids::act_priority())?;
        while self.cursor.at_start("reasonCode")? {
            details.reason_codes.push(self.read_classificator("reasonCode")?);
        }
        details.language_code = self.optional_attribute_element("languageCode", "code")?;
        while self.cursor.at_start("overseer")? {
            details.overseers.push(self.read_overseer()?);
        }
        while self.cursor.at_start("authorOrPerformer")? {
            details.authors.push(self.read_author_or_performer()?);
        }
        while self.cursor.at_start("dataEnterer")? {
            details.data_enterers.push(self.read_data_enterer()?);
        }
        while self.cursor.at_start("informationRecipient")? {
            details
                .information_recipients
                .push(self.read_information_recipient()?);
        }

        let subject = if self.cursor.at_start("subject")? {
            Some(self.read_subject()?)
        } else {
            None
        };
        let query_acknowledgement = if self.cursor.at_start("queryAck")? {
            Some(self.read_query_ack()?)
        } else {
            None
        };
        let query_by_parameter = if self.cursor.at_start("queryByParameter")? {
            Some(self.read_query_by_parameter()?)
        } else {
            None
        };
        let query_continuation = if self.cursor.at_start("queryContinuation")? {
            Some(self.read_query_continuation()?)
        } else {
            None
        };
        self.cursor.expect_end(element)?;

        if query_acknowledgement.is_none()
            && query_by_parameter.is_none()
            && query_continuation.is_none()
        {
            return Ok(ControlAct::Message(MessageControlAct { details, subject }));
        }
        let act = QueryControlAcknowledgement {
            details,
            subject,
            query_acknowledgement,
            query_by_parameter,
            query_continuation,
        };
        act.shape()
            .map_err(|e| CodecError::invariant(e.to_string(), self.cursor.position()))?;
        Ok(ControlAct::Query(act))
    }

    fn read_subject(&mut self) -> Result<Subject> {
        let start = self.cursor.expect_start("subject")?;
        self.fixed_attribute(&start, "subject", "typeCode", SUBJECT_TYPE_CODE)?;
        let content = self.cursor.capture_inner("subject")?;
        Subject::new(content).map_err(|e| self.cursor.structural("subject", e.to_string()))
    }

    fn read_query_ack(&mut self) -> Result<QueryAcknowledgement> {
        self.cursor.expect_start("queryAck")?;
        let query_id = self.optional_ii("queryId")?;
        let status_code = if self.cursor.at_start("statusCode")? {
            Some(self.coded_element("statusCode", QueryStatusCode::from_code)?)
        } else {
            None
        };
        let query_response_code =
            self.coded_element("queryResponseCode", QueryResponseCode::from_code)?;
        let result_total_quantity = self.optional_number_element("resultTotalQuantity")?;
        let result_current_quantity = self.optional_number_element("resultCurrentQuantity")?;
        let result_remaining_quantity = self.optional_number_element("resultRemainingQuantity")?;
        self.cursor.expect_end("queryAck")?;
        Ok(QueryAcknowledgement {
            query_id,
            status_code,
            query_response_code,
            result_total_quantity,
            result_current_quantity,
            result_remaining_quantity,
        })
    }

    fn read_query_by_parameter(&mut self) -> Result<QueryByParameterPayload> {
        self.cursor.expect_start("queryByParameter")?;
        let query_id = self.read_ii("queryId")?;
        let status_code = self.coded_element("statusCode", QueryStatusCode::from_code)?;
        let initial_quantity = self.optional_number_element("initialQuantity")?;
        let parameters = self.cursor.capture_inner("queryByParameter")?;
        Ok(QueryByParameterPayload {
            query_id,
            status_code,
            initial_quantity,
            parameters,
        })
    }

    fn read_query_continuation(&mut self) -> Result<QueryContinuation> {
        self.cursor.expect_start("queryContinuation")?;
        let query_id = self.read_ii("queryId")?;
        let start_result_number = self.number_element("startResultNumber")?;
        let continuation_quantity = self.number_element("continuationQuantity")?;
        let status_code = self.coded_element("statusCode", QueryStatusCode::from_code)?;
        self.cursor.expect_end("queryContinuation")?;
        Ok(QueryContinuation {
            query_id,
            start_result_number,
            continuation_quantity,
            status_code,
        })
    }

    // Participants

    fn read_overseer(&mut self) -> Result<Overseer> {
        let start = self.cursor.expect_start("overseer")?;
        let type_code =
            self.coded_attribute(&start, "overseer", "typeCode", OverseerTypeCode::from_code)?;
        let assigned_person = self.read_assigned_person()?;
        self.cursor.expect_end("overseer")?;
        Ok(Overseer {
            type_code,
            assigned_person,
        })
    }

    fn read_author_or_performer(&mut self) -> Result<AuthorOrPerformer> {
        let element = "authorOrPerformer";
        let start = self.cursor.expect_start(element)?;
        let type_code =
            self.coded_attribute(&start, element, "typeCode", AuthorTypeCode::from_code)?;
        let party = match self.cursor.peek_start()?.as_deref() {
            Some("assignedPerson") => AssignedParty::Person(self.read_assigned_person()?),
            Some("assignedDevice") => AssignedParty::Device(self.read_assigned_device()?),
            _ => {
                return Err(self
                    .cursor
                    .structural(element, "expected <assignedPerson> or <assignedDevice>"));
            }
        };
        self.cursor.expect_end(element)?;
        Ok(AuthorOrPerformer { type_code, party })
    }

    fn read_data_enterer(&mut self) -> Result<DataEnterer> {
        let start = self.cursor.expect_start("dataEnterer")?;
        self.fixed_attribute(&start, "dataEnterer", "typeCode", DATA_ENTERER_TYPE_CODE)?;
        let assigned_person = self.read_assigned_person()?;
        self.cursor.expect_end("dataEnterer")?;
        Ok(DataEnterer { assigned_person })
    }

    fn read_information_recipient(&mut self) -> Result<InformationRecipient> {
        let element = "informationRecipient";
        let start = self.cursor.expect_start(element)?;
        let type_code =
            self.coded_attribute(&start, element, "typeCode", RecipientTypeCode::from_code)?;
        let assigned_person = self.read_assigned_person()?;
        self.cursor.expect_end(element)?;
        Ok(InformationRecipient {
            type_code,
            assigned_person,
        })
    }

    fn read_assigned_person(&mut self) -> Result<AssignedPerson> {
        let element = "assignedPerson";
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", ASSIGNED_CLASS_CODE)?;
        let ids = self.read_ids()?;
        let code = self.optional_classificator("code")?;
        let telecom = self.optional_telecom()?;
        // The player element shares the role's name.
        let person = if self.cursor.at_start(element)? {
            Some(self.read_person()?)
        } else {
            None
        };
        let represented_organization = if self.cursor.at_start("representedOrganization")? {
            Some(self.read_organization("representedOrganization")?)
        } else {
            None
        };
        self.cursor.expect_end(element)?;
        Ok(AssignedPerson {
            ids,
            code,
            telecom,
            person,
            represented_organization,
        })
    }

    fn read_person(&mut self) -> Result<Person> {
        let element = "assignedPerson";
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", PERSON_CLASS_CODE)?;
        self.fixed_attribute(&start, element, "determinerCode", INSTANCE_DETERMINER_CODE)?;
        let mut person = Person {
            ids: self.read_ids()?,
            ..Default::default()
        };
        while self.cursor.at_start("name")? {
            person.names.push(self.read_person_name()?);
        }
        person.telecom = self.optional_telecom()?;
        while self.cursor.at_start("asLicensedEntity")? {
            person.as_licensed_entity.push(self.read_licensed_entity()?);
        }
        while self.cursor.at_start("asMember")? {
            person.as_member.push(self.read_member()?);
        }
        self.cursor.expect_end(element)?;
        Ok(person)
    }

    fn read_person_name(&mut self) -> Result<PersonName> {
        self.cursor.expect_start("name")?;
        let mut name = PersonName::default();
        while let Some(kind) = self
            .cursor
            .peek_start()?
            .as_deref()
            .and_then(NamePartKind::from_element_name)
        {
            let part = kind.element_name();
            self.cursor.expect_start(part)?;
            let value = self.cursor.read_text(part)?;
            name.push(kind, value);
        }
        self.cursor.expect_end("name")?;
        Ok(name)
    }

    fn read_licensed_entity(&mut self) -> Result<AsLicensedEntity> {
        let element = "asLicensedEntity";
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", LICENSED_ENTITY_CLASS_CODE)?;
        let ids = self.read_ids()?;
        let code = self.optional_classificator("code")?;
        self.cursor.expect_end(element)?;
        Ok(AsLicensedEntity { ids, code })
    }

    fn read_member(&mut self) -> Result<AsMember> {
        let element = "asMember";
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", MEMBER_CLASS_CODE)?;
        let ids = self.read_ids()?;
        let group = self.read_organization("group")?;
        self.cursor.expect_end(element)?;
        Ok(AsMember { ids, group })
    }

    fn read_organization(&mut self, element: &str) -> Result<RepresentedOrganization> {
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", ORGANIZATION_CLASS_CODE)?;
        self.fixed_attribute(&start, element, "determinerCode", INSTANCE_DETERMINER_CODE)?;
        let ids = self.read_ids()?;
        let name = self.optional_text_element("name")?;
        let telecom = self.optional_telecom()?;
        self.cursor.expect_end(element)?;
        Ok(RepresentedOrganization { ids, name, telecom })
    }

    fn read_assigned_device(&mut self) -> Result<AssignedDevice> {
        let element = "assignedDevice";
        let start = self.cursor.expect_start(element)?;
        self.fixed_attribute(&start, element, "classCode", ASSIGNED_CLASS_CODE)?;
        let ids = self.read_ids()?;
        let device = if self.cursor.at_start(element)? {
            Some(self.read_device(element)?)
        } else {
            None
        };
        let represented_organization = if self.cursor.at_start("representedOrganization")? {
            Some(self.read_organization("representedOrganization")?)
        } else {
            None
        };
        self.cursor.expect_end(element)?;
        Ok(AssignedDevice {
            ids,
            device,
            represented_organization,
        })
    }
}
