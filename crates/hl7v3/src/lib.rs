//! # HL7 V3 Transmission Wrapper Model
//!
//! Strongly-typed model of HL7 Version 3 messages as exchanged in the 2006 and
//! 2011 schema releases, including the Latvian national extension (`lvext`)
//! dialect.
//!
//! ## Layers
//!
//! - **Identifiers**: [`OId`], [`UrnType`], [`InteractionName`] and the
//!   [`II`] family ([`IdentificationId`], [`InteractionId`], [`TemplateId`]).
//!   Construction is the only validation point; a value that exists is valid.
//! - **Coded values**: [`ClassificatorId`], [`AcknowledgementDetailCode`] and
//!   the closed HL7 vocabularies in [`codes`].
//! - **Participants**: devices, assigned persons and devices, and the
//!   participations of a control act.
//! - **Control acts**: [`MessageControlAct`] and [`QueryControlAcknowledgement`]
//!   sharing [`ControlActDetails`].
//! - **Transmission wrappers**: an [`Envelope`] plus optional acknowledgement
//!   and control act, classified into a [`TransmissionWrapper`] variant by
//!   [`WrapperParts::classify`].
//!
//! The XML wire encoding lives in the `hl7v3-serde` crate.
//!
//! ## Example
//!
//! ```
//! use hl7v3::{OId, UrnType, SchemaFamily};
//!
//! assert!(OId::new("1.3.6.1.4.1.38760").is_ok());
//! assert!(OId::new("abc").is_err());
//!
//! let urn = UrnType::new("URN:IVIS:100001:XSD-HL7V3-2011-lvext-LVAU_IN000001UV01").unwrap();
//! assert_eq!(urn.family(), SchemaFamily::LvExt);
//! ```

pub mod acknowledgement;
pub mod codes;
pub mod control_act;
pub mod error;
pub mod identifiers;
pub mod ii;
pub mod oids;
pub mod participants;
pub mod response;
pub mod wrapper;

pub use acknowledgement::{Acknowledgement, AcknowledgementDetail};
pub use codes::{
    AcceptAckCode, AcknowledgementDetailCode, AcknowledgementType, ClassificatorId,
    ProcessingCode, ProcessingModeCode, QueryResponseCode, QueryStatusCode, Severity,
};
pub use control_act::{
    ControlAct, ControlActDetails, MessageControlAct, QueryAcknowledgement,
    QueryByParameterPayload, QueryContinuation, QueryControlAcknowledgement, QueryShape,
    ReasonCodeKind, Subject,
};
pub use error::{ModelError, Result};
pub use identifiers::{InteractionName, OId, SchemaFamily, SchemaVersion, UrnType};
pub use ii::{IdentificationId, II, InstanceIdentifier, InteractionId, TemplateId};
pub use participants::{
    AsLicensedEntity, AsMember, AssignedDevice, AssignedParty, AssignedPerson, AttentionLine,
    AuthorOrPerformer, AuthorTypeCode, DataEnterer, Device, InformationRecipient,
    NamePart, NamePartKind, Overseer, OverseerTypeCode, Person, PersonName, RecipientTypeCode,
    RepresentedOrganization,
};
pub use response::ResponseContext;
pub use wrapper::{
    AcknowledgementResponse, ApplicationResponse, ControlActRef, Envelope, MessageKind,
    QueryApplicationResponse, Request, TransmissionWrapper, WrapperParts,
};

/// XML namespace of HL7 V3 messages.
pub const HL7_NAMESPACE: &str = "urn:hl7-org:v3";

/// Conventional namespace prefix.
pub const HL7_PREFIX: &str = "hl7";

/// Value of the root element's `ITSVersion` attribute.
pub const ITS_VERSION: &str = "XML_1.0";
