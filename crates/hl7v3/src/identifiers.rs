//! Identifier primitives: object identifiers, interaction names and template URNs.
//!
//! These are validated value types. Construction is the only validation point:
//! once an [`OId`], [`InteractionName`] or [`UrnType`] exists it is known to
//! match its grammar, and it never changes afterwards.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Dotted-decimal object identifier grammar: a root arc of 0, 1 or 2 followed by
/// at least two further numeric arcs.
static OID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-2]\.[0-9]+(\.[0-9]+)+$").expect("OID pattern compiles"));

/// HL7 artifact identifier, e.g. `MCCI_IN000002UV01` or `LVAU_IN000001UV01`.
static INTERACTION_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{4}_[A-Z]{2}[0-9]{6}[A-Z]{2}[0-9]{2}$")
        .expect("interaction name pattern compiles")
});

/// Template URN grammar: fixed prefix, schema version, schema family, interaction.
static URN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^URN:IVIS:100001:XSD-HL7V3-(2006|2011)-(multicacheschemas|lvext)-([A-Z]{4}_[A-Z]{2}[0-9]{6}[A-Z]{2}[0-9]{2})$",
    )
    .expect("URN pattern compiles")
});

/// Fixed prefix shared by every template URN.
pub const URN_PREFIX: &str = "URN:IVIS:100001:XSD-HL7V3";

/// A dotted-decimal object identifier such as `2.16.840.1.113883.1.6`.
///
/// Equality, ordering and hashing are case-insensitive over the string form.
///
/// # Examples
///
/// ```
/// use hl7v3::OId;
///
/// let oid = OId::new("1.3.6.1.4.1.38760").unwrap();
/// assert_eq!(oid.as_str(), "1.3.6.1.4.1.38760");
/// assert!(OId::new("abc").is_err());
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OId(String);

impl OId {
    /// Creates an object identifier, failing if `value` is not dotted-decimal.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if OID_PATTERN.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(ModelError::InvalidOid(value))
        }
    }

    /// Wraps one of the crate's well-known OID constants.
    pub(crate) fn well_known(value: &'static str) -> Self {
        debug_assert!(OID_PATTERN.is_match(value), "{value} is not an OID");
        Self(value.to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric arcs of the identifier.
    pub fn arcs(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Returns `true` if `self` is `other` or lies underneath it.
    pub fn is_under(&self, other: &OId) -> bool {
        let this = self.0.to_ascii_lowercase();
        let prefix = other.0.to_ascii_lowercase();
        this == prefix || this.strip_prefix(&prefix).is_some_and(|rest| rest.starts_with('.'))
    }
}

impl PartialEq for OId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for OId {}

impl Hash for OId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl PartialOrd for OId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .to_ascii_lowercase()
            .cmp(&other.0.to_ascii_lowercase())
    }
}

impl fmt::Debug for OId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OId({})", self.0)
    }
}

impl fmt::Display for OId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for OId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OId> for String {
    fn from(oid: OId) -> Self {
        oid.0
    }
}

impl AsRef<str> for OId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The HL7 V3 schema release a message is written against.
///
/// The release decides the one dialect difference the codec knows about: how
/// the acknowledgement type is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Normative edition 2006: acknowledgement type as a nested `typeCode` element.
    #[serde(rename = "2006")]
    V2006,
    /// Normative edition 2011: acknowledgement type as a `typeCode` attribute.
    #[default]
    #[serde(rename = "2011")]
    V2011,
}

impl SchemaVersion {
    /// The version token used in template URNs.
    pub fn token(self) -> &'static str {
        match self {
            SchemaVersion::V2006 => "2006",
            SchemaVersion::V2011 => "2011",
        }
    }

    /// Returns `true` if acknowledgement types are carried as attributes.
    pub fn ack_type_as_attribute(self) -> bool {
        matches!(self, SchemaVersion::V2011)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SchemaVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches(['V', 'v']) {
            "2006" => Ok(SchemaVersion::V2006),
            "2011" => Ok(SchemaVersion::V2011),
            _ => Err(ModelError::UnknownCode {
                vocabulary: "schema version",
                code: s.to_string(),
            }),
        }
    }
}

/// The schema family an interaction's XSD lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaFamily {
    /// The stock HL7 multicache schemas.
    #[serde(rename = "multicacheschemas")]
    MultiCacheSchemas,
    /// The Latvian national extension schemas.
    #[serde(rename = "lvext")]
    LvExt,
}

impl SchemaFamily {
    /// The family token used in template URNs.
    pub fn token(self) -> &'static str {
        match self {
            SchemaFamily::MultiCacheSchemas => "multicacheschemas",
            SchemaFamily::LvExt => "lvext",
        }
    }

    /// Derives the family from the interaction name.
    pub fn for_interaction(interaction: &InteractionName) -> Self {
        if interaction.is_latvian_extension() {
            SchemaFamily::LvExt
        } else {
            SchemaFamily::MultiCacheSchemas
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "multicacheschemas" => Some(SchemaFamily::MultiCacheSchemas),
            "lvext" => Some(SchemaFamily::LvExt),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// An HL7 artifact name identifying an interaction, e.g. `MCCI_IN000002UV01`.
///
/// The name doubles as the local name of the message root element and as the
/// extension of the `interactionId` element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InteractionName(String);

impl InteractionName {
    /// Creates an interaction name, failing if it is not an HL7 artifact id.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if INTERACTION_NAME_PATTERN.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(ModelError::InvalidInteractionName(value))
        }
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Four letter domain prefix, e.g. `MCCI`.
    pub fn domain(&self) -> &str {
        &self.0[..4]
    }

    /// Two letter realm code before the release number, e.g. `UV` or `LV`.
    pub fn realm(&self) -> &str {
        &self.0[13..15]
    }

    /// Returns `true` for interactions defined by the Latvian national
    /// extension: either an `LV` domain prefix or an `LV` realm suffix.
    pub fn is_latvian_extension(&self) -> bool {
        self.domain().starts_with("LV") || self.realm() == "LV"
    }
}

impl fmt::Display for InteractionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InteractionName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for InteractionName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<InteractionName> for String {
    fn from(name: InteractionName) -> Self {
        name.0
    }
}

/// Composite template URN combining schema version, schema family and
/// interaction name.
///
/// # Examples
///
/// ```
/// use hl7v3::{SchemaFamily, SchemaVersion, UrnType};
///
/// let urn = UrnType::new("URN:IVIS:100001:XSD-HL7V3-2011-lvext-LVAU_IN000001UV01").unwrap();
/// assert_eq!(urn.version(), SchemaVersion::V2011);
/// assert_eq!(urn.family(), SchemaFamily::LvExt);
/// assert_eq!(urn.interaction().as_str(), "LVAU_IN000001UV01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrnType {
    value: String,
    version: SchemaVersion,
    family: SchemaFamily,
    interaction: InteractionName,
}

impl UrnType {
    /// Parses a template URN, failing if it does not match the grammar.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let Some(captures) = URN_PATTERN.captures(&value) else {
            return Err(ModelError::InvalidUrn(value));
        };
        let version = captures[1].parse()?;
        let family = SchemaFamily::from_token(&captures[2])
            .ok_or_else(|| ModelError::InvalidUrn(value.clone()))?;
        let interaction = InteractionName::new(&captures[3])?;
        Ok(Self {
            value,
            version,
            family,
            interaction,
        })
    }

    /// Builds the URN for an interaction, deriving the schema family from the
    /// interaction name.
    pub fn for_interaction(version: SchemaVersion, interaction: InteractionName) -> Self {
        let family = SchemaFamily::for_interaction(&interaction);
        let value = format!(
            "{URN_PREFIX}-{}-{}-{}",
            version.token(),
            family.token(),
            interaction
        );
        Self {
            value,
            version,
            family,
            interaction,
        }
    }

    /// Returns the URN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The schema version token.
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// The schema family token.
    pub fn family(&self) -> SchemaFamily {
        self.family
    }

    /// The interaction the template describes.
    pub fn interaction(&self) -> &InteractionName {
        &self.interaction
    }
}

impl fmt::Display for UrnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for UrnType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for UrnType {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UrnType> for String {
    fn from(urn: UrnType) -> Self {
        urn.value
    }
}
