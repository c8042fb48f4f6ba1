//! Participants: the devices that send and receive a message and the people
//! (or devices) attached to a control act as authors, overseers, data enterers
//! and information recipients.
//!
//! The fixed structural codes each slot carries on the wire (`typeCode`,
//! `classCode`, `determinerCode`) live next to the types as constants so the
//! reader and writer agree on them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codes::ClassificatorId;
use crate::error::{ModelError, Result};
use crate::ii::II;

/// `classCode` of a device entity.
pub const DEVICE_CLASS_CODE: &str = "DEV";
/// `classCode` of a person entity.
pub const PERSON_CLASS_CODE: &str = "PSN";
/// `classCode` of an organization entity.
pub const ORGANIZATION_CLASS_CODE: &str = "ORG";
/// `determinerCode` of every entity: a specific instance.
pub const INSTANCE_DETERMINER_CODE: &str = "INSTANCE";
/// `classCode` of an assigned role.
pub const ASSIGNED_CLASS_CODE: &str = "ASSIGNED";
/// `classCode` of a group membership role.
pub const MEMBER_CLASS_CODE: &str = "MBR";
/// `classCode` of a licensed entity role.
pub const LICENSED_ENTITY_CLASS_CODE: &str = "LIC";
/// `typeCode` of the receiver participation.
pub const RECEIVER_TYPE_CODE: &str = "RCV";
/// `typeCode` of the sender participation.
pub const SENDER_TYPE_CODE: &str = "SND";
/// `typeCode` of the data enterer participation.
pub const DATA_ENTERER_TYPE_CODE: &str = "ENT";

/// A messaging device (application instance) identified by one or more ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDevice")]
pub struct Device {
    ids: Vec<II>,
    /// Device name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Telecommunication address (URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telecom: Option<String>,
    /// Name of the software running on the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_name: Option<String>,
}

#[derive(Deserialize)]
struct RawDevice {
    ids: Vec<II>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    telecom: Option<String>,
    #[serde(default)]
    software_name: Option<String>,
}

impl TryFrom<RawDevice> for Device {
    type Error = ModelError;

    fn try_from(raw: RawDevice) -> Result<Self> {
        let mut device = Device::new(raw.ids)?;
        device.name = raw.name;
        device.telecom = raw.telecom;
        device.software_name = raw.software_name;
        Ok(device)
    }
}

impl Device {
    /// Creates a device. At least one identifier is required.
    pub fn new(ids: Vec<II>) -> Result<Self> {
        if ids.is_empty() {
            return Err(ModelError::Empty { field: "device ids" });
        }
        Ok(Self {
            ids,
            name: None,
            telecom: None,
            software_name: None,
        })
    }

    /// A device with a single identifier.
    pub fn with_id(id: II) -> Self {
        Self {
            ids: vec![id],
            name: None,
            telecom: None,
            software_name: None,
        }
    }

    /// Sets the device name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// All identifiers, in document order. Never empty.
    pub fn ids(&self) -> &[II] {
        &self.ids
    }

    /// The first (primary) identifier.
    pub fn primary_id(&self) -> &II {
        &self.ids[0]
    }
}

/// The kind of a person name part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamePartKind {
    Family,
    Given,
    Prefix,
    Suffix,
}

impl NamePartKind {
    /// The element name the part is written as.
    pub fn element_name(self) -> &'static str {
        match self {
            NamePartKind::Family => "family",
            NamePartKind::Given => "given",
            NamePartKind::Prefix => "prefix",
            NamePartKind::Suffix => "suffix",
        }
    }

    /// Maps an element name back to a part kind.
    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "family" => Some(NamePartKind::Family),
            "given" => Some(NamePartKind::Given),
            "prefix" => Some(NamePartKind::Prefix),
            "suffix" => Some(NamePartKind::Suffix),
            _ => None,
        }
    }
}

/// One part of a person name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePart {
    pub kind: NamePartKind,
    pub value: String,
}

/// A person name as an ordered sequence of parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub parts: Vec<NamePart>,
}

impl PersonName {
    /// Builds a name from given names followed by a family name.
    pub fn from_given_family<I, S>(given: I, family: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts: Vec<NamePart> = given
            .into_iter()
            .map(|value| NamePart {
                kind: NamePartKind::Given,
                value: value.into(),
            })
            .collect();
        parts.push(NamePart {
            kind: NamePartKind::Family,
            value: family.into(),
        });
        Self { parts }
    }

    /// Appends a part.
    pub fn push(&mut self, kind: NamePartKind, value: impl Into<String>) {
        self.parts.push(NamePart {
            kind,
            value: value.into(),
        });
    }

    /// Values of all parts of one kind, in order.
    pub fn parts_of(&self, kind: NamePartKind) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .filter(move |part| part.kind == kind)
            .map(|part| part.value.as_str())
    }

    /// Given names joined with spaces.
    pub fn given(&self) -> String {
        self.parts_of(NamePartKind::Given)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Family names joined with spaces.
    pub fn family(&self) -> String {
        self.parts_of(NamePartKind::Family)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .parts
            .iter()
            .map(|part| part.value.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&text)
    }
}

/// An organization represented by a role, or the group of a membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentedOrganization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<II>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telecom: Option<String>,
}

/// Membership of a person in a group (organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsMember {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<II>,
    pub group: RepresentedOrganization,
}

/// A licence held by a person, e.g. a practitioner registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsLicensedEntity {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<II>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ClassificatorId>,
}

/// A person playing an assigned role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<II>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<PersonName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telecom: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub as_licensed_entity: Vec<AsLicensedEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub as_member: Vec<AsMember>,
}

/// A person in an assigned role (`classCode="ASSIGNED"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedPerson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<II>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ClassificatorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telecom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub represented_organization: Option<RepresentedOrganization>,
}

/// A device in an assigned role (`classCode="ASSIGNED"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedDevice {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<II>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub represented_organization: Option<RepresentedOrganization>,
}

/// `typeCode` of an author-or-performer participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthorTypeCode {
    #[default]
    #[serde(rename = "AUT")]
    Author,
    #[serde(rename = "PRF")]
    Performer,
}

impl AuthorTypeCode {
    pub fn code(self) -> &'static str {
        match self {
            AuthorTypeCode::Author => "AUT",
            AuthorTypeCode::Performer => "PRF",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "AUT" => Ok(AuthorTypeCode::Author),
            "PRF" => Ok(AuthorTypeCode::Performer),
            _ => Err(ModelError::UnknownCode {
                vocabulary: "author type code",
                code: code.to_string(),
            }),
        }
    }
}

/// The party acting as author or performer: a person or a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedParty {
    Person(AssignedPerson),
    Device(AssignedDevice),
}

/// Author or performer of a control act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorOrPerformer {
    pub type_code: AuthorTypeCode,
    pub party: AssignedParty,
}

impl AuthorOrPerformer {
    /// An author played by a person.
    pub fn person(assigned: AssignedPerson) -> Self {
        Self {
            type_code: AuthorTypeCode::Author,
            party: AssignedParty::Person(assigned),
        }
    }

    /// An author played by a device.
    pub fn device(assigned: AssignedDevice) -> Self {
        Self {
            type_code: AuthorTypeCode::Author,
            party: AssignedParty::Device(assigned),
        }
    }
}

/// `typeCode` of an overseer participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverseerTypeCode {
    #[default]
    #[serde(rename = "RESP")]
    Responsible,
    #[serde(rename = "VRF")]
    Verifier,
}

impl OverseerTypeCode {
    pub fn code(self) -> &'static str {
        match self {
            OverseerTypeCode::Responsible => "RESP",
            OverseerTypeCode::Verifier => "VRF",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "RESP" => Ok(OverseerTypeCode::Responsible),
            "VRF" => Ok(OverseerTypeCode::Verifier),
            _ => Err(ModelError::UnknownCode {
                vocabulary: "overseer type code",
                code: code.to_string(),
            }),
        }
    }
}

/// The person responsible for (or verifying) a control act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overseer {
    pub type_code: OverseerTypeCode,
    pub assigned_person: AssignedPerson,
}

/// The person who entered the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnterer {
    pub assigned_person: AssignedPerson,
}

/// `typeCode` of an information recipient participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecipientTypeCode {
    #[default]
    #[serde(rename = "PRCP")]
    Primary,
    #[serde(rename = "TRC")]
    Tracker,
}

impl RecipientTypeCode {
    pub fn code(self) -> &'static str {
        match self {
            RecipientTypeCode::Primary => "PRCP",
            RecipientTypeCode::Tracker => "TRC",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "PRCP" => Ok(RecipientTypeCode::Primary),
            "TRC" => Ok(RecipientTypeCode::Tracker),
            _ => Err(ModelError::UnknownCode {
                vocabulary: "information recipient type code",
                code: code.to_string(),
            }),
        }
    }
}

/// A person the control act's information is intended for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationRecipient {
    pub type_code: RecipientTypeCode,
    pub assigned_person: AssignedPerson,
}

/// A routing hint in the transmission wrapper (`attentionLine`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_word_text: Option<String>,
    pub value: String,
}
