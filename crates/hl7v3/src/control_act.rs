//! Control acts: the business content of a message, and the subject and query
//! payloads they carry.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::codes::{ClassificatorId, QueryResponseCode, QueryStatusCode};
use crate::error::{ModelError, Result};
use crate::ii::II;
use crate::oids;
use crate::participants::{AuthorOrPerformer, DataEnterer, InformationRecipient, Overseer};

/// `classCode` of a control act.
pub const CONTROL_ACT_CLASS_CODE: &str = "CACT";
/// `moodCode` of a control act.
pub const CONTROL_ACT_MOOD_CODE: &str = "EVN";
/// `typeCode` of the subject relationship.
pub const SUBJECT_TYPE_CODE: &str = "SUBJ";

/// The business payload of a control act, kept as an embedded XML fragment.
///
/// The codec does not interpret the payload; it is copied verbatim between the
/// `subject` element's tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub content: String,
}

impl Subject {
    /// Wraps a payload fragment. The fragment must contain something other
    /// than whitespace.
    pub fn new(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ModelError::Empty {
                field: "subject payload",
            });
        }
        Ok(Self { content })
    }
}

/// A query request (`queryByParameter`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryByParameterPayload {
    pub query_id: II,
    pub status_code: QueryStatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_quantity: Option<u32>,
    /// Parameter elements following the fixed header, as an XML fragment.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameters: String,
}

/// A request for the next batch of an earlier query (`queryContinuation`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContinuation {
    pub query_id: II,
    pub start_result_number: u32,
    pub continuation_quantity: u32,
    pub status_code: QueryStatusCode,
}

/// The outcome of a query and its result counts (`queryAck`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAcknowledgement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<II>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<QueryStatusCode>,
    pub query_response_code: QueryResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_total_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_current_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_remaining_quantity: Option<u32>,
}

impl QueryAcknowledgement {
    /// An acknowledgement with only a response code.
    pub fn new(query_response_code: QueryResponseCode) -> Self {
        Self {
            query_id: None,
            status_code: None,
            query_response_code,
            result_total_quantity: None,
            result_current_quantity: None,
            result_remaining_quantity: None,
        }
    }
}

/// How a control act reason code should be interpreted, decided by its code
/// system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCodeKind {
    /// The code names an action to perform.
    Action,
    /// The code names a reason.
    Reason,
    /// The code system is neither of the two known ones.
    Unclassified,
}

impl ReasonCodeKind {
    /// Classifies a reason code by comparing its code system with
    /// [`oids::ACTION_CODE_ID`] and [`oids::REASON_CODE_ID`].
    pub fn of(code: &ClassificatorId) -> Self {
        if code.is_from(&oids::action_code_id()) {
            ReasonCodeKind::Action
        } else if code.is_from(&oids::reason_code_id()) {
            ReasonCodeKind::Reason
        } else {
            ReasonCodeKind::Unclassified
        }
    }
}

/// Fields shared by both kinds of control act.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlActDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ClassificatorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_code: Option<ClassificatorId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_codes: Vec<ClassificatorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overseers: Vec<Overseer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<AuthorOrPerformer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_enterers: Vec<DataEnterer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub information_recipients: Vec<InformationRecipient>,
}

impl ControlActDetails {
    /// Reason codes of one kind, in document order.
    pub fn reason_codes_of(&self, kind: ReasonCodeKind) -> impl Iterator<Item = &ClassificatorId> {
        self.reason_codes
            .iter()
            .filter(move |code| ReasonCodeKind::of(code) == kind)
    }

    /// Reason codes from the action code system.
    pub fn action_codes(&self) -> Vec<&ClassificatorId> {
        self.reason_codes_of(ReasonCodeKind::Action).collect()
    }

    /// Reason codes from the reason code system.
    pub fn reason_codes_only(&self) -> Vec<&ClassificatorId> {
        self.reason_codes_of(ReasonCodeKind::Reason).collect()
    }

    /// Reason codes from any other code system.
    pub fn unclassified_reason_codes(&self) -> Vec<&ClassificatorId> {
        self.reason_codes_of(ReasonCodeKind::Unclassified).collect()
    }
}

/// A control act carrying a business payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageControlAct {
    #[serde(flatten)]
    pub details: ControlActDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
}

impl MessageControlAct {
    /// A control act with a subject payload.
    pub fn new(details: ControlActDetails, subject: Subject) -> Self {
        Self {
            details,
            subject: Some(subject),
        }
    }
}

/// The allowed combinations of query control act payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryShape {
    /// `queryByParameter` alone: a query request.
    Query,
    /// `queryContinuation` alone: a request for the next batch.
    Continuation,
    /// `queryAck` alone: a response without results.
    Acknowledgement,
    /// `subject` and `queryAck`: a response with results.
    Results,
    /// `subject`, `queryAck` and `queryContinuation`: a partial response.
    ResultsWithContinuation,
}

impl QueryShape {
    /// Returns `true` for the request shapes.
    pub fn is_request(self) -> bool {
        matches!(self, QueryShape::Query | QueryShape::Continuation)
    }
}

/// A control act carrying a query, a query response or a continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryControlAcknowledgement {
    #[serde(flatten)]
    pub details: ControlActDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_acknowledgement: Option<QueryAcknowledgement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_by_parameter: Option<QueryByParameterPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_continuation: Option<QueryContinuation>,
}

impl QueryControlAcknowledgement {
    /// Builds a query control act, rejecting payload combinations that are not
    /// allowed.
    pub fn try_new(
        details: ControlActDetails,
        subject: Option<Subject>,
        query_acknowledgement: Option<QueryAcknowledgement>,
        query_by_parameter: Option<QueryByParameterPayload>,
        query_continuation: Option<QueryContinuation>,
    ) -> Result<Self> {
        let act = Self {
            details,
            subject,
            query_acknowledgement,
            query_by_parameter,
            query_continuation,
        };
        act.shape()?;
        Ok(act)
    }

    /// A query request.
    pub fn query(details: ControlActDetails, query: QueryByParameterPayload) -> Self {
        Self {
            details,
            subject: None,
            query_acknowledgement: None,
            query_by_parameter: Some(query),
            query_continuation: None,
        }
    }

    /// A query response, with results when `subject` is present.
    pub fn response(
        details: ControlActDetails,
        acknowledgement: QueryAcknowledgement,
        subject: Option<Subject>,
    ) -> Self {
        Self {
            details,
            subject,
            query_acknowledgement: Some(acknowledgement),
            query_by_parameter: None,
            query_continuation: None,
        }
    }

    /// Determines which allowed payload combination is populated.
    pub fn shape(&self) -> Result<QueryShape> {
        let subject = self.subject.is_some();
        let ack = self.query_acknowledgement.is_some();
        let query = self.query_by_parameter.is_some();
        let continuation = self.query_continuation.is_some();

        if query && subject {
            return Err(ModelError::InvalidQueryPayload(
                "queryByParameter and subject are mutually exclusive".to_string(),
            ));
        }
        if query && ack {
            return Err(ModelError::InvalidQueryPayload(
                "queryByParameter and queryAck are mutually exclusive".to_string(),
            ));
        }

        match (subject, ack, query, continuation) {
            (false, false, true, false) => Ok(QueryShape::Query),
            (false, false, false, true) => Ok(QueryShape::Continuation),
            (false, true, false, false) => Ok(QueryShape::Acknowledgement),
            (true, true, false, false) => Ok(QueryShape::Results),
            (true, true, false, true) => Ok(QueryShape::ResultsWithContinuation),
            _ => Err(ModelError::InvalidQueryPayload(format!(
                "subject={subject}, queryAck={ack}, queryByParameter={query}, queryContinuation={continuation}"
            ))),
        }
    }
}

/// A control act of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlAct {
    Message(MessageControlAct),
    Query(QueryControlAcknowledgement),
}

impl ControlAct {
    /// The shared control act fields.
    pub fn details(&self) -> &ControlActDetails {
        match self {
            ControlAct::Message(act) => &act.details,
            ControlAct::Query(act) => &act.details,
        }
    }

    /// The subject payload, whichever kind of act carries it.
    pub fn subject(&self) -> Option<&Subject> {
        match self {
            ControlAct::Message(act) => act.subject.as_ref(),
            ControlAct::Query(act) => act.subject.as_ref(),
        }
    }

    pub fn action_codes(&self) -> Vec<&ClassificatorId> {
        self.details().action_codes()
    }

    pub fn reason_codes_only(&self) -> Vec<&ClassificatorId> {
        self.details().reason_codes_only()
    }

    pub fn unclassified_reason_codes(&self) -> Vec<&ClassificatorId> {
        self.details().unclassified_reason_codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::OId;

    fn query_id() -> II {
        II::new(OId::new("1.3.6.1.4.1.38760.4.1").unwrap(), "q-1").unwrap()
    }

    fn qbp() -> QueryByParameterPayload {
        QueryByParameterPayload {
            query_id: query_id(),
            status_code: QueryStatusCode::New,
            initial_quantity: Some(10),
            parameters: String::new(),
        }
    }

    fn continuation() -> QueryContinuation {
        QueryContinuation {
            query_id: query_id(),
            start_result_number: 11,
            continuation_quantity: 10,
            status_code: QueryStatusCode::WaitContinuedQueryResponse,
        }
    }

    fn subject() -> Subject {
        Subject::new("<hl7:patient/>").unwrap()
    }

    #[test]
    fn test_subject_must_not_be_blank() {
        assert!(Subject::new("  \n ").is_err());
    }

    #[test]
    fn test_reason_code_partition() {
        let details = ControlActDetails {
            reason_codes: vec![
                ClassificatorId::new("ADD", oids::action_code_id()).unwrap(),
                ClassificatorId::new("R01", oids::reason_code_id()).unwrap(),
                ClassificatorId::new("X", OId::new("1.2.3").unwrap()).unwrap(),
                ClassificatorId::new("DEL", oids::action_code_id()).unwrap(),
            ],
            ..Default::default()
        };
        let actions: Vec<_> = details.action_codes().iter().map(|c| c.code()).collect();
        assert_eq!(actions, ["ADD", "DEL"]);
        assert_eq!(details.reason_codes_only().len(), 1);
        assert_eq!(details.unclassified_reason_codes()[0].code(), "X");
    }

    #[test]
    fn test_query_shapes_allowed() {
        let details = ControlActDetails::default;
        let ack = || QueryAcknowledgement::new(QueryResponseCode::Ok);

        let cases = [
            (None, None, Some(qbp()), None, QueryShape::Query),
            (None, None, None, Some(continuation()), QueryShape::Continuation),
            (None, Some(ack()), None, None, QueryShape::Acknowledgement),
            (Some(subject()), Some(ack()), None, None, QueryShape::Results),
            (
                Some(subject()),
                Some(ack()),
                None,
                Some(continuation()),
                QueryShape::ResultsWithContinuation,
            ),
        ];
        for (subject, ack, query, cont, expected) in cases {
            let act =
                QueryControlAcknowledgement::try_new(details(), subject, ack, query, cont).unwrap();
            assert_eq!(act.shape().unwrap(), expected);
        }
    }

    #[test]
    fn test_query_shapes_rejected() {
        let details = ControlActDetails::default;
        let ack = || QueryAcknowledgement::new(QueryResponseCode::Ok);

        let err = QueryControlAcknowledgement::try_new(details(), Some(subject()), None, Some(qbp()), None)
            .unwrap_err();
        assert!(err.to_string().contains("subject"));

        let err = QueryControlAcknowledgement::try_new(details(), None, Some(ack()), Some(qbp()), None)
            .unwrap_err();
        assert!(err.to_string().contains("queryAck"));

        for (subject, ack, query, cont) in [
            (None, None, None, None),
            (Some(subject()), None, None, None),
            (None, None, Some(qbp()), Some(continuation())),
            (None, Some(ack()), None, Some(continuation())),
        ] {
            assert!(matches!(
                QueryControlAcknowledgement::try_new(details(), subject, ack, query, cont),
                Err(ModelError::InvalidQueryPayload(_))
            ));
        }
    }

    #[test]
    fn test_control_act_accessors() {
        let act = ControlAct::Message(MessageControlAct::new(
            ControlActDetails {
                text: Some("hello".into()),
                ..Default::default()
            },
            subject(),
        ));
        assert_eq!(act.details().text.as_deref(), Some("hello"));
        assert!(act.subject().is_some());
        assert!(QueryShape::Query.is_request());
        assert!(!QueryShape::Results.is_request());
    }
}
