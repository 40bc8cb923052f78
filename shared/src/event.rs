//! Normalized inbound platform events.
//!
//! The platform adapter decodes the wire envelope into an [`InboundEvent`]
//! once per invocation; handlers only ever see this shape.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

/// What kind of platform event arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The user opened the skill without a specific request
    Launch,
    /// A recognized intent, see [`InboundEvent::intent_name`]
    Intent,
    /// The platform closed the session
    SessionEnded,
    /// A message sent by the web app to the skill backend
    HostMessage,
    /// Any request type this core has no name for
    Other(String),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Launch => f.write_str("Launch"),
            EventKind::Intent => f.write_str("Intent"),
            EventKind::SessionEnded => f.write_str("SessionEnded"),
            EventKind::HostMessage => f.write_str("HostMessage"),
            EventKind::Other(name) => write!(f, "Other({})", name),
        }
    }
}

/// Why the platform ended a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEnd {
    /// Platform reason, e.g. `USER_INITIATED` or `ERROR`
    pub reason: String,
    /// Error detail supplied with an `ERROR` reason
    pub error: Option<Value>,
}

impl SessionEnd {
    pub fn is_error(&self) -> bool {
        self.reason == "ERROR"
    }
}

/// An inbound platform event. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    kind: EventKind,
    intent_name: Option<String>,
    slots: BTreeMap<String, String>,
    session_active: bool,
    capabilities: Option<BTreeSet<String>>,
    message: Option<Value>,
    session_end: Option<SessionEnd>,
    raw: Value,
}

impl InboundEvent {
    /// Start building an event of the given kind.
    pub fn builder(kind: EventKind) -> InboundEventBuilder {
        InboundEventBuilder {
            event: InboundEvent {
                kind,
                intent_name: None,
                slots: BTreeMap::new(),
                session_active: false,
                capabilities: None,
                message: None,
                session_end: None,
                raw: Value::Null,
            },
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn intent_name(&self) -> Option<&str> {
        self.intent_name.as_deref()
    }

    /// Value of a filled slot.
    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }

    pub fn slots(&self) -> &BTreeMap<String, String> {
        &self.slots
    }

    pub fn session_active(&self) -> bool {
        self.session_active
    }

    /// Capabilities advertised by the device, `None` when the platform sent no device info.
    pub fn capabilities(&self) -> Option<&BTreeSet<String>> {
        self.capabilities.as_ref()
    }

    /// Payload carried by a [`EventKind::HostMessage`] event.
    pub fn message(&self) -> Option<&Value> {
        self.message.as_ref()
    }

    pub fn session_end(&self) -> Option<&SessionEnd> {
        self.session_end.as_ref()
    }

    /// The undecoded platform payload.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Builder for [`InboundEvent`], used by platform adapters and tests.
#[derive(Debug)]
pub struct InboundEventBuilder {
    event: InboundEvent,
}

impl InboundEventBuilder {
    pub fn intent(mut self, name: impl Into<String>) -> Self {
        self.event.intent_name = Some(name.into());
        self
    }

    pub fn slot(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.event.slots.insert(name.into(), value.into());
        self
    }

    pub fn session_active(mut self, active: bool) -> Self {
        self.event.session_active = active;
        self
    }

    /// Record the device's capability set. Calling this with an empty
    /// iterator still marks capability info as present.
    pub fn capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event.capabilities = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn message(mut self, message: Value) -> Self {
        self.event.message = Some(message);
        self
    }

    pub fn session_end(mut self, end: SessionEnd) -> Self {
        self.event.session_end = Some(end);
        self
    }

    pub fn raw(mut self, raw: Value) -> Self {
        self.event.raw = raw;
        self
    }

    pub fn build(self) -> InboundEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_slots() {
        let event = InboundEvent::builder(EventKind::Intent)
            .intent("RepeatAfterMeIntent")
            .slot("message", "hello")
            .session_active(true)
            .build();

        assert_eq!(event.kind(), &EventKind::Intent);
        assert_eq!(event.intent_name(), Some("RepeatAfterMeIntent"));
        assert_eq!(event.slot("message"), Some("hello"));
        assert_eq!(event.slot("missing"), None);
        assert!(event.capabilities().is_none());
    }

    #[test]
    fn test_session_end_error_reason() {
        let end = SessionEnd {
            reason: "ERROR".to_string(),
            error: None,
        };
        assert!(end.is_error());
    }
}
