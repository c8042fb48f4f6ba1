//! HL7 V3 XML reading and writing.
//!
//! A [`Serializer`] is configured once with [`CodecOptions`] (the schema
//! dialect above all) and then reads or writes any number of messages. It holds
//! no other state; one instance can be shared across threads.
//!
//! ## Reading
//!
//! [`Serializer::read`] takes a quick-xml [`NsReader`] positioned at or before
//! the message root. The reader descends the envelope, the optional
//! acknowledgement and the optional control act in schema order, validates
//! every fixed structural attribute on the way and finally classifies the
//! message:
//!
//! | acknowledgement | control act | result |
//! |---|---|---|
//! | absent | message | `Request` |
//! | present | absent | `AcknowledgementResponse` |
//! | present | message | `ApplicationResponse` |
//! | any | query | `QueryApplicationResponse` |
//!
//! Exactly the root subtree is consumed. The first problem aborts the read
//! with a [`CodecError`] carrying the reader position.
//!
//! ## Writing
//!
//! [`Serializer::write`] emits the root element and everything under it into a
//! caller-supplied quick-xml [`Writer`]. Acknowledgements carrying error
//! details are written with the error form of their type code (`CA` becomes
//! `CE`); the reader rejects the same combination instead.
//!
//! ## Dialects
//!
//! | | 2011 | 2006 |
//! |---|---|---|
//! | acknowledgement type | `<acknowledgement typeCode="AA">` | `<acknowledgement><typeCode code="AA"/>` |

use std::io::{BufRead, Write};

use hl7v3::{SchemaVersion, TransmissionWrapper};
use quick_xml::{NsReader, Writer};

use crate::error::Result;
use crate::options::CodecOptions;

mod de;
mod ser;
mod utils;

pub use utils::{HL7_NAMESPACE, HL7_PREFIX, ITS_VERSION, XSI_NAMESPACE};

use de::MessageReader;
use ser::MessageWriter;

/// Interaction id accepted by [`Serializer::read`] to skip interaction checks.
pub const ANY_INTERACTION: &str = "*";

/// Version-aware HL7 V3 message codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Serializer {
    options: CodecOptions,
}

impl Serializer {
    pub fn new(schema_version: SchemaVersion) -> Self {
        Self::with_options(CodecOptions::for_version(schema_version))
    }

    pub fn with_options(options: CodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.options.schema_version
    }

    /// Reads one message, checking it against `interaction_id`.
    ///
    /// The root element name, the `interactionId` extension and the
    /// interaction named by the template URN must all equal `interaction_id`,
    /// unless it is [`ANY_INTERACTION`].
    pub fn read<R: BufRead>(
        &self,
        reader: &mut NsReader<R>,
        interaction_id: &str,
    ) -> Result<TransmissionWrapper> {
        let expected = (interaction_id != ANY_INTERACTION).then_some(interaction_id);
        MessageReader::new(reader, self.options.schema_version).read_message(expected)
    }

    /// Reads one message of any interaction.
    pub fn read_any<R: BufRead>(&self, reader: &mut NsReader<R>) -> Result<TransmissionWrapper> {
        MessageReader::new(reader, self.options.schema_version).read_message(None)
    }

    /// Reads one message of any interaction from a string.
    pub fn read_str(&self, xml: &str) -> Result<TransmissionWrapper> {
        let mut reader = NsReader::from_str(xml);
        self.read_any(&mut reader)
    }

    /// Writes `wrapper` as root element `local_name`.
    ///
    /// Nothing is written if the wrapper fails validation. The XML declaration
    /// and indentation options do not apply here: the caller owns the writer.
    pub fn write<W: Write>(
        &self,
        writer: &mut Writer<W>,
        wrapper: &TransmissionWrapper,
        local_name: &str,
    ) -> Result<()> {
        MessageWriter::new(writer, self.options).write_message(wrapper, local_name, false)
    }

    /// Writes `wrapper` as a complete document, honouring the declaration and
    /// indentation options.
    pub fn write_document<W: Write>(
        &self,
        out: W,
        wrapper: &TransmissionWrapper,
        local_name: &str,
    ) -> Result<()> {
        let mut writer = if self.options.indent > 0 {
            Writer::new_with_indent(out, b' ', self.options.indent)
        } else {
            Writer::new(out)
        };
        MessageWriter::new(&mut writer, self.options).write_message(
            wrapper,
            local_name,
            self.options.xml_declaration,
        )
    }

    /// Writes `wrapper` as a complete document into a string.
    pub fn write_to_string(&self, wrapper: &TransmissionWrapper, local_name: &str) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_document(&mut buffer, wrapper, local_name)?;
        String::from_utf8(buffer).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()
        })
    }
}

/// Reads one message of any interaction from an XML string.
///
/// # Examples
///
/// ```
/// use hl7v3::SchemaVersion;
/// use hl7v3_serde::from_xml_str;
///
/// let err = from_xml_str("<message/>", SchemaVersion::V2011).unwrap_err();
/// assert!(err.to_string().contains("message"));
/// ```
pub fn from_xml_str(xml: &str, schema_version: SchemaVersion) -> Result<TransmissionWrapper> {
    Serializer::new(schema_version).read_str(xml)
}

/// Reads one message of any interaction from a buffered reader.
pub fn from_xml_reader<R: BufRead>(
    reader: R,
    schema_version: SchemaVersion,
) -> Result<TransmissionWrapper> {
    let mut reader = NsReader::from_reader(reader);
    Serializer::new(schema_version).read_any(&mut reader)
}

/// Writes a message as root element `local_name` into a string.
pub fn to_xml_string(
    wrapper: &TransmissionWrapper,
    local_name: &str,
    schema_version: SchemaVersion,
) -> Result<String> {
    Serializer::new(schema_version).write_to_string(wrapper, local_name)
}

/// Writes a message as root element `local_name` into `writer`.
pub fn to_xml_writer<W: Write>(
    writer: W,
    wrapper: &TransmissionWrapper,
    local_name: &str,
    schema_version: SchemaVersion,
) -> Result<()> {
    Serializer::new(schema_version).write_document(writer, wrapper, local_name)
}
