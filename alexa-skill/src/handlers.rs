//! The skill's handler table.
//!
//! Order matters: handlers are tried top to bottom and the first match wins.

use std::sync::Arc;

use serde_json::json;
use shared::capability::HTML;
use shared::response::{StartConfiguration, StartRequest, Transformer};
use shared::{
    client_message_action, has_capability, is_any_intent, is_intent, is_kind, to_client, Config,
    Directive, Dispatcher, EventKind, HandlerRegistry, InboundEvent, OutboundResponse, Result,
    ResponseBuilder, SessionControl,
};
use tracing::{error, info};

const HELP_SPEECH: &str = "You can say hello to me! Try it now.";
const FALLBACK_SPEECH: &str = "Sorry, I don't know about that. Please try again.";

/// Build the dispatcher for this skill.
pub fn dispatcher(config: Arc<Config>) -> Dispatcher {
    HandlerRegistry::new()
        .intercept_request(|event| {
            info!(request = %event.raw(), "Inbound request");
        })
        .intercept_response(|_, response| {
            info!(
                speech = response.speech_text(),
                directive = ?response.directive(),
                session = ?response.session(),
                "Outbound response"
            );
        })
        .register("Launch", is_kind(EventKind::Launch), move |event| {
            launch(event, &config)
        })
        .register("HelloWorld", is_intent("HelloWorldIntent"), hello_world)
        .register("Help", is_intent("AMAZON.HelpIntent"), help)
        .register(
            "CancelAndStop",
            is_any_intent(&["AMAZON.CancelIntent", "AMAZON.StopIntent"]),
            cancel_and_stop,
        )
        .register("Fallback", is_intent("AMAZON.FallbackIntent"), fallback)
        .register(
            "ProcessHTMLMessage",
            is_kind(EventKind::HostMessage),
            client_message_action,
        )
        .register("RepeatAfterMe", is_intent("RepeatAfterMeIntent"), repeat_after_me)
        .register("SessionEnded", is_kind(EventKind::SessionEnded), session_ended)
        .build()
}

fn launch(event: &InboundEvent, config: &Config) -> Result<OutboundResponse> {
    let mut response = ResponseBuilder::new();
    response.add_speech("Welcome.");

    // Devices without a screen or without Web API get a spoken refusal.
    if !has_capability(event, HTML) {
        response
            .add_speech(
                "This device does not support Web API, so the Web API Hello World won't work on it.",
            )
            .add_speech("Please try a different one.")
            .set_session(SessionControl::End);
        return Ok(response.build());
    }

    response
        .add_speech("Loading the web app.")
        .set_directive(start_directive(config))
        .set_session(SessionControl::Unspecified);
    Ok(response.build())
}

fn start_directive(config: &Config) -> Directive {
    Directive::Start {
        data: json!({
            "someKey": "Initial start up information",
            "hintSource": "hello"
        }),
        request: StartRequest {
            uri: config.webapp_index_uri(),
            method: "GET".to_string(),
        },
        configuration: StartConfiguration {
            timeout_in_seconds: config.webapp_timeout_seconds,
        },
        transformers: vec![Transformer {
            input_path: "hintSource".to_string(),
            output_name: "hint".to_string(),
            transformer: "textToHint".to_string(),
        }],
    }
}

fn hello_world(_event: &InboundEvent) -> Result<OutboundResponse> {
    let mut response = ResponseBuilder::new();
    response
        .add_speech("Hello You! And Hello Web")
        .set_directive(to_client(&json!({ "event": "HelloWorldIntentReceived" }))?)
        .set_session(SessionControl::Unspecified);
    Ok(response.build())
}

fn help(_event: &InboundEvent) -> Result<OutboundResponse> {
    let mut response = ResponseBuilder::new();
    response
        .add_speech(HELP_SPEECH)
        .reprompt(HELP_SPEECH)
        .set_session(SessionControl::Continue);
    Ok(response.build())
}

// No web app directives here: the web app is torn down with the session.
fn cancel_and_stop(_event: &InboundEvent) -> Result<OutboundResponse> {
    let mut response = ResponseBuilder::new();
    response
        .add_speech("Goodbye!")
        .set_session(SessionControl::End);
    Ok(response.build())
}

fn fallback(_event: &InboundEvent) -> Result<OutboundResponse> {
    let mut response = ResponseBuilder::new();
    response
        .add_speech(FALLBACK_SPEECH)
        .reprompt(FALLBACK_SPEECH)
        .set_session(SessionControl::Unspecified);
    Ok(response.build())
}

fn repeat_after_me(event: &InboundEvent) -> Result<OutboundResponse> {
    let mut response = ResponseBuilder::new();

    let message = match event.slot("message") {
        Some(said) => {
            response.add_speech("You said:").add_speech(said);
            json!({ "userSpeech": said })
        }
        None => {
            response.add_speech("Hmm, I'm not sure what you said.");
            json!({ "error": "NO_SPEECH" })
        }
    };

    response
        .set_directive(to_client(&message)?)
        .set_session(SessionControl::Unspecified);
    Ok(response.build())
}

fn session_ended(event: &InboundEvent) -> Result<OutboundResponse> {
    if let Some(end) = event.session_end() {
        if end.is_error() {
            error!(error = ?end.error, "Session ended with an error");
        } else {
            info!(reason = %end.reason, "Session ended");
        }
    }
    Ok(ResponseBuilder::new().build())
}
