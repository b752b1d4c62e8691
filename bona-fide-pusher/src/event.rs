//! REMS event notification parsing.
//!
//! REMS pushes events as JSON objects with namespaced keys:
//!
//! ```text
//! {
//!   "event/id": 42,
//!   "event/type": "application.event/approved",
//!   "event/application": {"application/applicant": {"userid": "elixir123"}}
//! }
//! ```
//!
//! Only approval events carry an applicant that gets forwarded. Every other
//! event type is parsed but rejected by the handler.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Event type that triggers a bona fide push.
pub const APPROVED_EVENT: &str = "application.event/approved";

const EVENT_ID: &str = "event/id";
const EVENT_TYPE: &str = "event/type";
const APPLICANT_PATH: [&str; 3] = ["event/application", "application/applicant", "userid"];

/// Reasons an inbound payload cannot be used.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("payload is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing field {0}")]
    MissingField(String),

    #[error("field {0} is not a string")]
    InvalidField(String),
}

/// Correlation id taken from `event/id`, only used in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventId(Option<String>);

impl EventId {
    /// Id used when the payload has none.
    pub fn unknown() -> Self {
        EventId(None)
    }

    /// Read the id from a parsed payload.
    pub fn from_payload(payload: &Value) -> Self {
        match payload.get(EVENT_ID) {
            None | Some(Value::Null) => EventId(None),
            Some(Value::String(s)) => EventId(Some(s.clone())),
            Some(other) => EventId(Some(other.to_string())),
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or("unknown"))
    }
}

/// What the event asks the relay to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Application approved; the applicant should get bona fide status.
    Approved { applicant: String },
    /// Any other event type, carried for logging.
    Other(String),
}

/// A validated REMS event notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub id: EventId,
    pub kind: EventKind,
}

impl InboundEvent {
    /// Validate an already parsed payload.
    pub fn from_value(payload: &Value) -> Result<Self, ValidationError> {
        let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;

        let event_type = match object.get(EVENT_TYPE) {
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(ValidationError::InvalidField(EVENT_TYPE.to_string())),
            None => return Err(ValidationError::MissingField(EVENT_TYPE.to_string())),
        };

        let kind = if event_type == APPROVED_EVENT {
            EventKind::Approved {
                applicant: extract_applicant(payload)?,
            }
        } else {
            EventKind::Other(event_type.to_string())
        };

        Ok(InboundEvent {
            id: EventId::from_payload(payload),
            kind,
        })
    }
}

/// Parse raw body bytes into JSON.
///
/// Kept separate from [`InboundEvent::from_value`] so the caller can still read
/// the event id of a structurally invalid payload.
pub fn parse_payload(body: &[u8]) -> Result<Value, ValidationError> {
    Ok(serde_json::from_slice(body)?)
}

/// Walk `event/application → application/applicant → userid`.
fn extract_applicant(payload: &Value) -> Result<String, ValidationError> {
    let mut current = payload;
    for (depth, key) in APPLICANT_PATH.iter().enumerate() {
        current = current
            .get(key)
            .ok_or_else(|| ValidationError::MissingField(APPLICANT_PATH[..=depth].join(".")))?;
    }

    current
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::InvalidField(APPLICANT_PATH.join(".")))
}
