//! JSON view of decoded messages.
//!
//! Thin wrappers around `serde_json` over the model's own `Serialize` and
//! `Deserialize` implementations. Identifier values are validated on the way
//! in by the model types; the query payload combination is checked here since
//! serde alone cannot express it.

use hl7v3::{ControlActRef, TransmissionWrapper};

use crate::error::{CodecError, Result};

/// Parses a wrapper from its JSON form.
///
/// # Examples
///
/// ```
/// use hl7v3_serde::json::from_json_str;
///
/// assert!(from_json_str(r#"{"type": "Request"}"#).is_err());
/// ```
pub fn from_json_str(s: &str) -> Result<TransmissionWrapper> {
    let wrapper: TransmissionWrapper = serde_json::from_str(s)?;
    if let Some(ControlActRef::Query(act)) = wrapper.control_act() {
        act.shape()
            .map_err(|e| CodecError::invariant(e.to_string(), None))?;
    }
    Ok(wrapper)
}

/// Serializes a wrapper to compact JSON.
pub fn to_json_string(wrapper: &TransmissionWrapper) -> Result<String> {
    Ok(serde_json::to_string(wrapper)?)
}

/// Serializes a wrapper to pretty-printed JSON.
pub fn to_json_string_pretty(wrapper: &TransmissionWrapper) -> Result<String> {
    Ok(serde_json::to_string_pretty(wrapper)?)
}

/// Converts a wrapper to a `serde_json::Value`.
pub fn to_json_value(wrapper: &TransmissionWrapper) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(wrapper)?)
}
