//! Well-known object identifiers used by the transmission wrapper.
//!
//! The string constants are the wire values; the functions return them as
//! validated [`OId`] values.

use crate::identifiers::OId;

/// Root of HL7 interaction identifiers (`interactionId/@root`).
pub const INTERACTION_ID_ROOT: &str = "2.16.840.1.113883.1.6";

/// HL7 trigger event code system (`controlActProcess/code/@codeSystem`).
pub const TRIGGER_EVENT_CODE: &str = "2.16.840.1.113883.1.18";

/// HL7 ActPriority code system (`controlActProcess/priorityCode/@codeSystem`).
pub const ACT_PRIORITY: &str = "2.16.840.1.113883.5.7";

/// HL7 AcknowledgementDetailCode code system.
pub const ACKNOWLEDGEMENT_DETAIL_CODE: &str = "2.16.840.1.113883.5.1100";

/// Latvian e-health arc all national identifiers live under.
pub const NATIONAL_ROOT: &str = "1.3.6.1.4.1.38760";

/// Root of message identification ids issued by the national integration platform.
pub const MESSAGE_ID_ROOT: &str = "1.3.6.1.4.1.38760.1.1";

/// Root of transmission wrapper template ids.
pub const TEMPLATE_ID_ROOT: &str = "1.3.6.1.4.1.38760.1.2";

/// National application error codes used in acknowledgement details.
pub const NATIONAL_ERROR_CODE: &str = "1.3.6.1.4.1.38760.2.3";

/// Code system of control act reason codes that name an action.
pub const ACTION_CODE_ID: &str = "1.3.6.1.4.1.38760.2.1";

/// Code system of control act reason codes that name a reason.
pub const REASON_CODE_ID: &str = "1.3.6.1.4.1.38760.2.2";

/// Returns the HL7 interaction id root.
pub fn interaction_id_root() -> OId {
    OId::well_known(INTERACTION_ID_ROOT)
}

/// Returns the trigger event code system.
pub fn trigger_event_code() -> OId {
    OId::well_known(TRIGGER_EVENT_CODE)
}

/// Returns the ActPriority code system.
pub fn act_priority() -> OId {
    OId::well_known(ACT_PRIORITY)
}

/// Returns the HL7 AcknowledgementDetailCode code system.
pub fn acknowledgement_detail_code() -> OId {
    OId::well_known(ACKNOWLEDGEMENT_DETAIL_CODE)
}

/// Returns the national error code system.
pub fn national_error_code() -> OId {
    OId::well_known(NATIONAL_ERROR_CODE)
}

/// Returns the message identification root.
pub fn message_id_root() -> OId {
    OId::well_known(MESSAGE_ID_ROOT)
}

/// Returns the template id root.
pub fn template_id_root() -> OId {
    OId::well_known(TEMPLATE_ID_ROOT)
}

/// Returns the action code system.
pub fn action_code_id() -> OId {
    OId::well_known(ACTION_CODE_ID)
}

/// Returns the reason code system.
pub fn reason_code_id() -> OId {
    OId::well_known(REASON_CODE_ID)
}
