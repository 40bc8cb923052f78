//! Alexa request/response envelopes and their mapping to the dispatch core.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{Directive, Error, EventKind, InboundEvent, OutboundResponse, Result, SessionEnd};

/// Namespace prefixed to directive types on the wire.
pub const HTML_NAMESPACE: &str = "Alexa.Presentation.HTML";

/// Reported back to the platform with every response.
pub const USER_AGENT: &str = "sample/hello-world/v1.2";

const RESPONSE_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
struct AlexaRequest {
    request: RequestBody,
    session: Option<Session>,
    context: Option<Context>,
}

#[derive(Debug, Deserialize)]
struct RequestBody {
    #[serde(rename = "type")]
    request_type: String,
    intent: Option<Intent>,
    reason: Option<String>,
    error: Option<Value>,
    message: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Intent {
    name: String,
    #[serde(default)]
    slots: HashMap<String, Slot>,
}

#[derive(Debug, Deserialize)]
struct Slot {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Session {
    #[serde(default)]
    attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Context {
    #[serde(rename = "System")]
    system: Option<SystemContext>,
}

#[derive(Debug, Deserialize)]
struct SystemContext {
    device: Option<Device>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Device {
    #[serde(default)]
    supported_interfaces: Map<String, Value>,
}

/// A decoded request plus the session state to hand back untouched.
#[derive(Debug)]
pub struct Invocation {
    pub event: InboundEvent,
    pub session_attributes: Option<Map<String, Value>>,
}

/// Decode a raw Alexa request envelope.
pub fn parse(raw: Value) -> Result<Invocation> {
    let request: AlexaRequest =
        serde_json::from_value(raw.clone()).map_err(|e| Error::Envelope(e.to_string()))?;
    let body = request.request;

    let kind = match body.request_type.as_str() {
        "LaunchRequest" => EventKind::Launch,
        "IntentRequest" => EventKind::Intent,
        "SessionEndedRequest" => EventKind::SessionEnded,
        "Alexa.Presentation.HTML.Message" => EventKind::HostMessage,
        other => EventKind::Other(other.to_string()),
    };

    let mut builder = InboundEvent::builder(kind).session_active(request.session.is_some());

    if let Some(intent) = body.intent {
        builder = builder.intent(intent.name);
        for (name, slot) in intent.slots {
            if let Some(value) = slot.value {
                builder = builder.slot(name, value);
            }
        }
    }

    if let Some(device) = request
        .context
        .and_then(|c| c.system)
        .and_then(|s| s.device)
    {
        let supported = device
            .supported_interfaces
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, _)| k);
        builder = builder.capabilities(supported);
    }

    if let Some(message) = body.message {
        builder = builder.message(message);
    }

    if let Some(reason) = body.reason {
        builder = builder.session_end(SessionEnd {
            reason,
            error: body.error,
        });
    }

    Ok(Invocation {
        event: builder.raw(raw).build(),
        session_attributes: request.session.and_then(|s| s.attributes),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlexaResponse {
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_attributes: Option<Map<String, Value>>,
    user_agent: String,
    response: AlexaResponseBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlexaResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reprompt: Option<Reprompt>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    directives: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    should_end_session: Option<bool>,
}

#[derive(Debug, Serialize)]
struct OutputSpeech {
    #[serde(rename = "type")]
    speech_type: String,
    ssml: String,
}

impl OutputSpeech {
    fn ssml(text: &str) -> Self {
        Self {
            speech_type: "SSML".to_string(),
            ssml: format!("<speak>{}</speak>", escape_ssml(text)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reprompt {
    output_speech: OutputSpeech,
}

/// Encode a finished response as an Alexa response envelope.
pub fn render(
    response: &OutboundResponse,
    session_attributes: Option<Map<String, Value>>,
) -> Result<AlexaResponse> {
    let output_speech =
        (!response.speech_text().is_empty()).then(|| OutputSpeech::ssml(response.speech_text()));

    let reprompt = response.reprompt().map(|text| Reprompt {
        output_speech: OutputSpeech::ssml(text),
    });

    let directives = response
        .directive()
        .map(render_directive)
        .transpose()?
        .into_iter()
        .collect();

    Ok(AlexaResponse {
        version: RESPONSE_VERSION.to_string(),
        session_attributes,
        user_agent: USER_AGENT.to_string(),
        response: AlexaResponseBody {
            output_speech,
            reprompt,
            directives,
            should_end_session: response.session().should_end_session(),
        },
    })
}

fn render_directive(directive: &Directive) -> Result<Value> {
    let mut value = serde_json::to_value(directive)?;
    if let Some(Value::String(kind)) = value.get_mut("type") {
        *kind = format!("{}.{}", HTML_NAMESPACE, kind);
    }
    Ok(value)
}

fn escape_ssml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
