//! JSON message relay between the skill backend and the web app.
//!
//! Host to client messages ride on a `HandleMessage` directive. Client to
//! host messages arrive as [`EventKind::HostMessage`] events.
//!
//! [`EventKind::HostMessage`]: crate::event::EventKind::HostMessage

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::event::InboundEvent;
use crate::response::{Directive, OutboundResponse, ResponseBuilder, SessionControl};
use crate::{Error, Result};

/// Payload marker sent back to the web app when its message was unreadable.
pub const MALFORMED_MESSAGE: &str = "MALFORMED_MESSAGE";

/// Lags above this are spoken in seconds.
const SECONDS_THRESHOLD_MS: i64 = 1000;

/// Wrap a serializable payload for delivery to the web app.
pub fn to_client<T: Serialize>(message: &T) -> Result<Directive> {
    Ok(Directive::HandleMessage {
        message: serde_json::to_value(message)?,
    })
}

/// Message the web app sends to the skill.
///
/// Only "a JSON object" is enforced. `time` and `speech` are picked out when
/// they hold a usable value and ignored otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    /// Client clock when the message was sent, epoch milliseconds
    pub time: Option<i64>,
    /// Text the skill should speak
    pub speech: Option<String>,
    pub extra: Map<String, Value>,
}

impl ClientMessage {
    /// Decode a client payload. A JSON string is parsed as encoded JSON;
    /// anything other than an object is rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        let decoded;
        let object = match value {
            Value::Object(object) => object,
            Value::String(encoded) => {
                decoded = serde_json::from_str::<Value>(encoded)
                    .map_err(|e| Error::MalformedClientPayload(e.to_string()))?;
                decoded.as_object().ok_or_else(|| {
                    Error::MalformedClientPayload("expected a JSON object".to_string())
                })?
            }
            other => {
                return Err(Error::MalformedClientPayload(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        let mut extra = object.clone();
        let time = extra.remove("time").as_ref().and_then(epoch_millis);
        let speech = extra.remove("speech").as_ref().and_then(spoken_text);

        Ok(Self {
            time,
            speech,
            extra,
        })
    }
}

// Zero and non-numeric timestamps carry no age.
fn epoch_millis(value: &Value) -> Option<i64> {
    let millis = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
    })?;
    (millis != 0).then_some(millis)
}

// Scalars are spoken as written; empty strings, zero, false, null and
// containers are not spoken.
fn spoken_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Human-readable age of a message, e.g. `sent 500 milliseconds ago,`.
pub fn age_phrase(lag_ms: i64) -> String {
    if lag_ms > SECONDS_THRESHOLD_MS {
        format!("sent {} seconds ago,", lag_ms / 1000)
    } else {
        format!("sent {} milliseconds ago,", lag_ms)
    }
}

/// React to a message from the web app, as of `now`.
///
/// Never fails: unreadable payloads become a spoken notice and an error
/// marker sent back to the web app.
pub fn handle_client_message(event: &InboundEvent, now: DateTime<Utc>) -> OutboundResponse {
    let mut response = ResponseBuilder::new();
    response.set_session(SessionControl::Unspecified);

    let parsed = event
        .message()
        .ok_or_else(|| Error::MalformedClientPayload("message missing".to_string()))
        .and_then(ClientMessage::from_value);

    match parsed {
        Ok(message) => {
            if let Some(time) = message.time {
                match now.timestamp_millis().checked_sub(time) {
                    Some(lag) => {
                        info!(lag_ms = lag, "Message received from web app");
                        response.add_speech(age_phrase(lag));
                    }
                    None => warn!(time, "Web app timestamp out of range"),
                }
            }
            if let Some(speech) = message.speech {
                response.add_speech(speech);
            }
        }
        Err(e) => {
            warn!(error = %e, "Discarding unreadable web app message");
            response
                .add_speech("Hmm, I couldn't read the message from the web app.")
                .set_directive(Directive::HandleMessage {
                    message: json!({ "error": MALFORMED_MESSAGE }),
                });
        }
    }

    response.build()
}

/// Handler action for client messages, using the current time.
pub fn client_message_action(event: &InboundEvent) -> Result<OutboundResponse> {
    Ok(handle_client_message(event, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use chrono::TimeZone;

    fn message_event(message: Value) -> InboundEvent {
        InboundEvent::builder(EventKind::HostMessage)
            .message(message)
            .build()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_age_phrase_threshold() {
        assert_eq!(age_phrase(500), "sent 500 milliseconds ago,");
        assert_eq!(age_phrase(1000), "sent 1000 milliseconds ago,");
        assert_eq!(age_phrase(1500), "sent 1 seconds ago,");
        assert_eq!(age_phrase(2999), "sent 2 seconds ago,");
    }

    #[test]
    fn test_message_with_time_and_speech() {
        let t = 1_700_000_000_000;
        let event = message_event(json!({"speech": "Hello world", "time": t}));

        let response = handle_client_message(&event, at(t + 1500));
        assert_eq!(response.speech_text(), "sent 1 seconds ago, Hello world");

        let response = handle_client_message(&event, at(t + 500));
        assert_eq!(response.speech_text(), "sent 500 milliseconds ago, Hello world");
        assert_eq!(response.session(), SessionControl::Unspecified);
    }

    #[test]
    fn test_encoded_message_is_parsed() {
        let event = message_event(Value::String(r#"{"speech":"hi"}"#.to_string()));
        let response = handle_client_message(&event, at(0));
        assert_eq!(response.speech_text(), "hi");
    }

    #[test]
    fn test_malformed_message_is_answered() {
        let event = message_event(Value::String("{not json".to_string()));
        let response = handle_client_message(&event, at(0));

        assert!(!response.speech_text().is_empty());
        assert_eq!(
            response.directive(),
            Some(&Directive::HandleMessage {
                message: json!({"error": MALFORMED_MESSAGE})
            })
        );
    }

    #[test]
    fn test_non_object_message_is_malformed() {
        assert!(matches!(
            ClientMessage::from_value(&json!([1, 2])),
            Err(Error::MalformedClientPayload(_))
        ));
        assert!(matches!(
            ClientMessage::from_value(&Value::String("42".to_string())),
            Err(Error::MalformedClientPayload(_))
        ));
    }

    #[test]
    fn test_extra_fields_are_kept() {
        let message = ClientMessage::from_value(&json!({"speech": "x", "button": "hello"})).unwrap();
        assert_eq!(message.extra.get("button"), Some(&json!("hello")));
    }

    #[test]
    fn test_extreme_timestamps_are_answered() {
        let now = at(1_700_000_000_000);
        for time in [i64::MIN, i64::MAX] {
            let event = message_event(json!({"time": time, "speech": "Hello world"}));
            let response = handle_client_message(&event, now);
            assert!(response.speech_text().ends_with("Hello world"));
            assert!(response.directive().is_none());
        }

        let event = message_event(json!({"time": i64::MIN, "speech": "Hello world"}));
        assert_eq!(handle_client_message(&event, now).speech_text(), "Hello world");
    }

    #[test]
    fn test_float_time_is_accepted() {
        let t = 1_700_000_000_000_i64;
        let event = message_event(json!({"time": 1_700_000_000_000.0, "speech": "Hello world"}));
        let response = handle_client_message(&event, at(t + 500));
        assert_eq!(response.speech_text(), "sent 500 milliseconds ago, Hello world");
        assert!(response.directive().is_none());
    }

    #[test]
    fn test_mistyped_fields_are_ignored() {
        let response = handle_client_message(&message_event(json!({"speech": 42})), at(0));
        assert_eq!(response.speech_text(), "42");
        assert!(response.directive().is_none());

        let event = message_event(json!({"time": "yesterday", "speech": ["a"]}));
        let response = handle_client_message(&event, at(0));
        assert_eq!(response.speech_text(), "");
        assert!(response.directive().is_none());
    }

    #[test]
    fn test_to_client_wraps_payload() {
        let directive = to_client(&json!({"userSpeech": "hello"})).unwrap();
        assert_eq!(
            directive,
            Directive::HandleMessage {
                message: json!({"userSpeech": "hello"})
            }
        );
    }
}
