//! Outbound responses and the builder that assembles them.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Session continuation after a response.
///
/// `Unspecified` is distinct from `Continue`: the session stays open but the
/// microphone is not reopened, which is what an active web app needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionControl {
    /// End the session
    End,
    /// Keep the session and listen for the user
    Continue,
    /// Leave the decision to the platform
    #[default]
    Unspecified,
}

impl SessionControl {
    /// Wire value of the end-session flag, `None` when it must be omitted.
    pub fn should_end_session(self) -> Option<bool> {
        match self {
            SessionControl::End => Some(true),
            SessionControl::Continue => Some(false),
            SessionControl::Unspecified => None,
        }
    }
}

/// How the web surface is fetched on start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartRequest {
    pub uri: String,
    pub method: String,
}

/// Start options for the web surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConfiguration {
    pub timeout_in_seconds: u32,
}

/// Platform-side transform applied to the start data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformer {
    pub input_path: String,
    pub output_name: String,
    pub transformer: String,
}

/// One-way instruction for the client surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Directive {
    /// Load the web app on the device
    Start {
        data: Value,
        request: StartRequest,
        configuration: StartConfiguration,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        transformers: Vec<Transformer>,
    },
    /// Deliver an application payload to the running web app
    HandleMessage { message: Value },
}

impl Directive {
    /// Directives addressed to a live web app are torn down with the session.
    pub fn requires_open_session(&self) -> bool {
        match self {
            Directive::Start { .. } | Directive::HandleMessage { .. } => true,
        }
    }
}

/// A finished response. Immutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundResponse {
    speech_text: String,
    reprompt: Option<String>,
    directive: Option<Directive>,
    session: SessionControl,
}

impl OutboundResponse {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Spoken text, empty when nothing is said.
    pub fn speech_text(&self) -> &str {
        &self.speech_text
    }

    pub fn reprompt(&self) -> Option<&str> {
        self.reprompt.as_deref()
    }

    pub fn directive(&self) -> Option<&Directive> {
        self.directive.as_ref()
    }

    pub fn session(&self) -> SessionControl {
        self.session
    }
}

/// Accumulates speech, an optional directive and the session flag.
///
/// `build` consumes the builder, so it cannot be reused after finalizing.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    speech: Vec<String>,
    reprompt: Option<String>,
    directive: Option<Directive>,
    session: SessionControl,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a speech fragment. Fragments are joined with a single space.
    pub fn add_speech(&mut self, text: impl Into<String>) -> &mut Self {
        self.speech.push(text.into());
        self
    }

    pub fn reprompt(&mut self, text: impl Into<String>) -> &mut Self {
        self.reprompt = Some(text.into());
        self
    }

    /// Attach a directive, replacing any previous one.
    pub fn set_directive(&mut self, directive: Directive) -> &mut Self {
        if self.directive.is_some() {
            debug!("Replacing previously attached directive");
        }
        self.directive = Some(directive);
        self
    }

    pub fn set_session(&mut self, session: SessionControl) -> &mut Self {
        self.session = session;
        self
    }

    /// Finalize the response.
    ///
    /// A directive that needs a live surface forces the session flag to
    /// `Unspecified`; combined with `End` the directive is dropped instead.
    pub fn build(self) -> OutboundResponse {
        let mut directive = self.directive;
        let mut session = self.session;

        if let Some(d) = &directive {
            if d.requires_open_session() {
                match session {
                    SessionControl::End => {
                        warn!("Dropping directive attached to a session-ending response");
                        directive = None;
                    }
                    SessionControl::Continue => {
                        debug!("Directive needs an open surface, leaving session unspecified");
                        session = SessionControl::Unspecified;
                    }
                    SessionControl::Unspecified => {}
                }
            }
        }

        OutboundResponse {
            speech_text: self.speech.join(" "),
            reprompt: self.reprompt,
            directive,
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_speech_joined_in_order() {
        let mut builder = ResponseBuilder::new();
        builder.add_speech("You said:").add_speech("hello");
        assert_eq!(builder.build().speech_text(), "You said: hello");
    }

    #[test]
    fn test_empty_builder() {
        let response = ResponseBuilder::new().build();
        assert_eq!(response.speech_text(), "");
        assert!(response.directive().is_none());
        assert_eq!(response.session(), SessionControl::Unspecified);
    }

    #[test]
    fn test_last_directive_wins() {
        let mut builder = ResponseBuilder::new();
        builder
            .set_directive(Directive::HandleMessage { message: json!({"n": 1}) })
            .set_directive(Directive::HandleMessage { message: json!({"n": 2}) });
        let response = builder.build();
        assert_eq!(
            response.directive(),
            Some(&Directive::HandleMessage { message: json!({"n": 2}) })
        );
    }

    #[test]
    fn test_directive_forces_unspecified_session() {
        let mut builder = ResponseBuilder::new();
        builder
            .set_directive(Directive::HandleMessage { message: json!({}) })
            .set_session(SessionControl::Continue);
        assert_eq!(builder.build().session(), SessionControl::Unspecified);
    }

    #[test]
    fn test_ending_session_drops_directive() {
        let mut builder = ResponseBuilder::new();
        builder
            .add_speech("Goodbye!")
            .set_directive(Directive::HandleMessage { message: json!({}) })
            .set_session(SessionControl::End);
        let response = builder.build();
        assert!(response.directive().is_none());
        assert_eq!(response.session(), SessionControl::End);
    }

    #[test]
    fn test_directive_serializes_with_type_tag() {
        let directive = Directive::HandleMessage {
            message: json!({"event": "HelloWorldIntentReceived"}),
        };
        assert_eq!(
            serde_json::to_value(&directive).unwrap(),
            json!({"type": "HandleMessage", "message": {"event": "HelloWorldIntentReceived"}})
        );
    }

    #[test]
    fn test_should_end_session_tri_state() {
        assert_eq!(SessionControl::End.should_end_session(), Some(true));
        assert_eq!(SessionControl::Continue.should_end_session(), Some(false));
        assert_eq!(SessionControl::Unspecified.should_end_session(), None);
    }
}
