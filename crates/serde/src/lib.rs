//! # HL7 V3 XML codec
//!
//! Reads and writes HL7 V3 transmission wrappers (the envelope, the optional
//! acknowledgement and the optional control act) in the `urn:hl7-org:v3`
//! namespace, on top of the model in the [`hl7v3`] crate.
//!
//! ## Features
//!
//! - **Streaming**: reads from a quick-xml `NsReader` and writes to a quick-xml
//!   `Writer` supplied by the caller. No document tree is built.
//! - **Version aware**: the 2006 and 2011 dialects differ in how the
//!   acknowledgement type is encoded; a [`Serializer`] is bound to one.
//! - **Strict**: fixed structural attributes, identifier grammars and
//!   timestamp formats are validated on read; a message decodes completely or
//!   not at all.
//! - **JSON view**: [`json`] renders decoded messages through the model's serde
//!   implementations.
//!
//! ## Examples
//!
//! ```
//! use hl7v3::{AcknowledgementType, MessageKind, SchemaVersion};
//! use hl7v3_serde::{from_xml_str, to_xml_string};
//!
//! let xml = r#"<MCCI_IN000002UV01 xmlns="urn:hl7-org:v3" ITSVersion="XML_1.0">
//!   <templateId root="1.3.6.1.4.1.38760.1.2" extension="URN:IVIS:100001:XSD-HL7V3-2011-multicacheschemas-MCCI_IN000002UV01"/>
//!   <id root="1.3.6.1.4.1.38760.1.1" extension="5c2a9d2e-1f0a-4b8e-9a57-0c7e1b3d2f11"/>
//!   <creationTime value="20240301102030.0000+0200"/>
//!   <versionCode code="V3-2011"/>
//!   <interactionId root="2.16.840.1.113883.1.6" extension="MCCI_IN000002UV01"/>
//!   <processingCode code="P"/>
//!   <processingModeCode code="T"/>
//!   <acceptAckCode code="NE"/>
//!   <receiver typeCode="RCV">
//!     <device classCode="DEV" determinerCode="INSTANCE">
//!       <id root="1.3.6.1.4.1.38760.3.2" extension="clinic"/>
//!     </device>
//!   </receiver>
//!   <sender typeCode="SND">
//!     <device classCode="DEV" determinerCode="INSTANCE">
//!       <id root="1.3.6.1.4.1.38760.3.2" extension="registry"/>
//!     </device>
//!   </sender>
//!   <acknowledgement typeCode="AA">
//!     <targetMessage>
//!       <id root="1.3.6.1.4.1.38760.1.1" extension="0b0e7a1c-4d2f-4e1b-8c3a-9f6d5e4c3b21"/>
//!     </targetMessage>
//!   </acknowledgement>
//! </MCCI_IN000002UV01>"#;
//!
//! let wrapper = from_xml_str(xml, SchemaVersion::V2011)?;
//! assert_eq!(wrapper.kind(), MessageKind::AcknowledgementResponse);
//! assert_eq!(
//!     wrapper.acknowledgement().map(|ack| ack.type_code),
//!     Some(AcknowledgementType::ApplicationAccept)
//! );
//!
//! let written = to_xml_string(&wrapper, "MCCI_IN000002UV01", SchemaVersion::V2011)?;
//! assert!(written.starts_with("<hl7:MCCI_IN000002UV01"));
//! assert_eq!(from_xml_str(&written, SchemaVersion::V2011)?, wrapper);
//! # Ok::<(), hl7v3_serde::CodecError>(())
//! ```

pub mod datetime;
pub mod error;
pub mod json;
pub mod options;
pub mod xml;

pub use error::{CodecError, Result};
pub use options::{CodecOptions, TimestampFormat};
pub use xml::{
    ANY_INTERACTION, Serializer, from_xml_reader, from_xml_str, to_xml_string, to_xml_writer,
};
