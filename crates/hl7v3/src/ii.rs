//! The instance identifier (`II`) family.
//!
//! An HL7 instance identifier is a root [`OId`] naming the issuing namespace
//! plus an extension unique within it. The specializations in this module
//! narrow the extension's type, so an invalid extension is rejected when the
//! identifier is built rather than when it is used.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, Result};
use crate::identifiers::{InteractionName, OId, SchemaVersion, UrnType};
use crate::oids;

/// Common view over every identifier that serializes as an `II` element.
pub trait InstanceIdentifier {
    /// The issuing namespace.
    fn root(&self) -> &OId;

    /// The extension exactly as written on the wire.
    fn extension(&self) -> String;

    /// Converts into a plain [`II`].
    fn to_ii(&self) -> II {
        II {
            root: self.root().clone(),
            extension: self.extension(),
        }
    }
}

/// A generic instance identifier: root OID plus a non-empty extension.
///
/// # Examples
///
/// ```
/// use hl7v3::{II, OId};
///
/// let root = OId::new("1.3.6.1.4.1.38760.3.1").unwrap();
/// let id = II::new(root.clone(), "PK-010101").unwrap();
/// assert_eq!(id.extension(), "PK-010101");
/// assert!(II::new(root, "").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawII")]
pub struct II {
    root: OId,
    extension: String,
}

#[derive(Deserialize)]
struct RawII {
    root: OId,
    extension: String,
}

impl TryFrom<RawII> for II {
    type Error = ModelError;

    fn try_from(raw: RawII) -> Result<Self> {
        II::new(raw.root, raw.extension)
    }
}

impl II {
    /// Creates an identifier. The extension is mandatory and must not be empty.
    pub fn new(root: OId, extension: impl Into<String>) -> Result<Self> {
        let extension = extension.into();
        if extension.is_empty() {
            return Err(ModelError::Empty {
                field: "II extension",
            });
        }
        Ok(Self { root, extension })
    }

    /// The issuing namespace.
    pub fn root(&self) -> &OId {
        &self.root
    }

    /// The extension.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl InstanceIdentifier for II {
    fn root(&self) -> &OId {
        &self.root
    }

    fn extension(&self) -> String {
        self.extension.clone()
    }

    fn to_ii(&self) -> II {
        self.clone()
    }
}

impl fmt::Display for II {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.root, self.extension)
    }
}

/// Message identification: the extension is a GUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentificationId {
    /// Issuing namespace.
    pub root: OId,
    /// Message GUID.
    pub extension: Uuid,
}

impl IdentificationId {
    /// Creates an identification id from an already parsed GUID.
    pub fn new(root: OId, extension: Uuid) -> Self {
        Self { root, extension }
    }

    /// Parses the extension as a GUID. Braced, simple and hyphenated forms are
    /// accepted.
    pub fn parse(root: OId, extension: &str) -> Result<Self> {
        let guid = Uuid::parse_str(extension.trim()).map_err(|e| ModelError::InvalidGuid {
            value: extension.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(root, guid))
    }

    /// A fresh random identification under the national message id root.
    pub fn generate() -> Self {
        Self::new(oids::message_id_root(), Uuid::new_v4())
    }
}

impl InstanceIdentifier for IdentificationId {
    fn root(&self) -> &OId {
        &self.root
    }

    fn extension(&self) -> String {
        self.extension.to_string()
    }
}

impl TryFrom<II> for IdentificationId {
    type Error = ModelError;

    fn try_from(ii: II) -> Result<Self> {
        IdentificationId::parse(ii.root, &ii.extension)
    }
}

impl fmt::Display for IdentificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}^{}", self.root, self.extension)
    }
}

/// Interaction identification: the extension is the interaction's schema name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionId {
    /// Issuing namespace, normally [`oids::INTERACTION_ID_ROOT`].
    pub root: OId,
    /// Interaction (schema element) name.
    pub extension: InteractionName,
}

impl InteractionId {
    /// Creates an interaction id with an explicit root.
    pub fn new(root: OId, extension: InteractionName) -> Self {
        Self { root, extension }
    }

    /// Creates an interaction id under the standard HL7 interaction root.
    pub fn hl7(extension: InteractionName) -> Self {
        Self::new(oids::interaction_id_root(), extension)
    }

    /// Parses the extension as an interaction name.
    pub fn parse(root: OId, extension: &str) -> Result<Self> {
        Ok(Self::new(root, InteractionName::new(extension)?))
    }

    /// The interaction name.
    pub fn name(&self) -> &InteractionName {
        &self.extension
    }
}

impl InstanceIdentifier for InteractionId {
    fn root(&self) -> &OId {
        &self.root
    }

    fn extension(&self) -> String {
        self.extension.to_string()
    }
}

impl TryFrom<II> for InteractionId {
    type Error = ModelError;

    fn try_from(ii: II) -> Result<Self> {
        InteractionId::parse(ii.root, &ii.extension)
    }
}

/// Template identification: the extension is a template URN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId {
    /// Issuing namespace, normally [`oids::TEMPLATE_ID_ROOT`].
    pub root: OId,
    /// Template URN.
    pub extension: UrnType,
}

impl TemplateId {
    /// Creates a template id with an explicit root.
    pub fn new(root: OId, extension: UrnType) -> Self {
        Self { root, extension }
    }

    /// Template id for an interaction under the national template root.
    pub fn for_interaction(version: SchemaVersion, interaction: InteractionName) -> Self {
        Self::new(
            oids::template_id_root(),
            UrnType::for_interaction(version, interaction),
        )
    }

    /// Parses the extension as a template URN.
    pub fn parse(root: OId, extension: &str) -> Result<Self> {
        Ok(Self::new(root, UrnType::new(extension)?))
    }
}

impl InstanceIdentifier for TemplateId {
    fn root(&self) -> &OId {
        &self.root
    }

    fn extension(&self) -> String {
        self.extension.to_string()
    }
}

impl TryFrom<II> for TemplateId {
    type Error = ModelError;

    fn try_from(ii: II) -> Result<Self> {
        TemplateId::parse(ii.root, &ii.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> OId {
        OId::new("1.3.6.1.4.1.38760.1.1").unwrap()
    }

    #[test]
    fn test_ii_requires_extension() {
        assert!(matches!(
            II::new(root(), ""),
            Err(ModelError::Empty { .. })
        ));
        let ii = II::new(root(), "abc").unwrap();
        assert_eq!(ii.to_string(), "1.3.6.1.4.1.38760.1.1^abc");
    }

    #[test]
    fn test_ii_deserialize_validates() {
        let ok: II =
            serde_json::from_str(r#"{"root":"1.3.6.1.4.1.38760.1.1","extension":"x"}"#).unwrap();
        assert_eq!(ok.extension(), "x");
        assert!(
            serde_json::from_str::<II>(r#"{"root":"1.3.6.1.4.1.38760.1.1","extension":""}"#)
                .is_err()
        );
        assert!(serde_json::from_str::<II>(r#"{"root":"nope","extension":"x"}"#).is_err());
    }

    #[test]
    fn test_identification_id_parses_guid_forms() {
        let plain = IdentificationId::parse(root(), "6f1c0c1e-3b7c-4f4e-9f59-4cbb1d6f6d12").unwrap();
        let braced =
            IdentificationId::parse(root(), "{6F1C0C1E-3B7C-4F4E-9F59-4CBB1D6F6D12}").unwrap();
        assert_eq!(plain, braced);
        assert_eq!(
            plain.extension(),
            "6f1c0c1e-3b7c-4f4e-9f59-4cbb1d6f6d12"
        );
    }

    #[test]
    fn test_identification_id_rejects_non_guid() {
        let err = IdentificationId::parse(root(), "not-a-guid").unwrap_err();
        assert!(matches!(err, ModelError::InvalidGuid { .. }));
        let ii = II::new(root(), "12345").unwrap();
        assert!(IdentificationId::try_from(ii).is_err());
    }

    #[test]
    fn test_interaction_and_template_ids() {
        let interaction = InteractionId::hl7(InteractionName::new("MCCI_IN000002UV01").unwrap());
        assert_eq!(interaction.root.as_str(), oids::INTERACTION_ID_ROOT);
        assert_eq!(interaction.to_ii().extension(), "MCCI_IN000002UV01");
        assert!(InteractionId::parse(root(), "bad name").is_err());

        let template = TemplateId::for_interaction(
            SchemaVersion::V2011,
            InteractionName::new("MCCI_IN000002UV01").unwrap(),
        );
        assert_eq!(
            template.extension(),
            "URN:IVIS:100001:XSD-HL7V3-2011-multicacheschemas-MCCI_IN000002UV01"
        );
        let ii = template.to_ii();
        assert_eq!(TemplateId::try_from(ii).unwrap(), template);
    }
}
