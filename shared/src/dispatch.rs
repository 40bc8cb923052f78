//! Ordered handler registry and the dispatcher that walks it.
//!
//! Handlers are `(predicate, action)` pairs checked in registration order;
//! the first predicate that accepts the event wins. Unmatched events and
//! failed actions go to the error handler, which always answers.

use std::fmt;

use tracing::{debug, error, info};

use crate::event::{EventKind, InboundEvent};
use crate::response::{OutboundResponse, ResponseBuilder, SessionControl};
use crate::{Error, Result};

/// Decides whether a handler accepts an event.
pub type Predicate = Box<dyn Fn(&InboundEvent) -> bool + Send + Sync>;

/// Produces the response for an accepted event.
pub type Action = Box<dyn Fn(&InboundEvent) -> Result<OutboundResponse> + Send + Sync>;

/// Terminal handler for unmatched events and failed actions. Cannot fail.
pub type ErrorAction = Box<dyn Fn(&InboundEvent, &Error) -> OutboundResponse + Send + Sync>;

/// Observes every inbound event before dispatch.
pub type RequestInterceptor = Box<dyn Fn(&InboundEvent) + Send + Sync>;

/// Observes every outbound response after dispatch.
pub type ResponseInterceptor = Box<dyn Fn(&InboundEvent, &OutboundResponse) + Send + Sync>;

/// Spoken by the default error handler.
pub const APOLOGY: &str = "Sorry, I had trouble doing what you asked. Please ask again.";

struct HandlerEntry {
    name: String,
    predicate: Predicate,
    action: Action,
}

/// Collects handlers at startup. Consumed by [`HandlerRegistry::build`].
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
    error_action: Option<ErrorAction>,
    request_interceptors: Vec<RequestInterceptor>,
    response_interceptors: Vec<ResponseInterceptor>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            error_action: None,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// Append a handler. Earlier registrations take precedence.
    pub fn register<P, A>(mut self, name: impl Into<String>, predicate: P, action: A) -> Self
    where
        P: Fn(&InboundEvent) -> bool + Send + Sync + 'static,
        A: Fn(&InboundEvent) -> Result<OutboundResponse> + Send + Sync + 'static,
    {
        self.entries.push(HandlerEntry {
            name: name.into(),
            predicate: Box::new(predicate),
            action: Box::new(action),
        });
        self
    }

    /// Replace the catch-all error handler. Defaults to [`apologize`].
    pub fn on_error<E>(mut self, action: E) -> Self
    where
        E: Fn(&InboundEvent, &Error) -> OutboundResponse + Send + Sync + 'static,
    {
        self.error_action = Some(Box::new(action));
        self
    }

    pub fn intercept_request<F>(mut self, interceptor: F) -> Self
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        self.request_interceptors.push(Box::new(interceptor));
        self
    }

    pub fn intercept_response<F>(mut self, interceptor: F) -> Self
    where
        F: Fn(&InboundEvent, &OutboundResponse) + Send + Sync + 'static,
    {
        self.response_interceptors.push(Box::new(interceptor));
        self
    }

    /// Freeze the registry into a dispatcher.
    pub fn build(self) -> Dispatcher {
        info!(handlers = self.entries.len(), "Handler registry built");
        Dispatcher {
            entries: self.entries,
            error_action: self
                .error_action
                .unwrap_or_else(|| Box::new(apologize) as ErrorAction),
            request_interceptors: self.request_interceptors,
            response_interceptors: self.response_interceptors,
        }
    }
}

/// Read-only dispatcher; safe to share across concurrent invocations.
pub struct Dispatcher {
    entries: Vec<HandlerEntry>,
    error_action: ErrorAction,
    request_interceptors: Vec<RequestInterceptor>,
    response_interceptors: Vec<ResponseInterceptor>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
        f.debug_struct("Dispatcher").field("handlers", &names).finish()
    }
}

impl Dispatcher {
    /// Route an event to the first matching handler.
    ///
    /// Always returns exactly one response: the matched action's, or the
    /// error handler's when nothing matched or the action failed.
    pub fn dispatch(&self, event: &InboundEvent) -> OutboundResponse {
        for interceptor in &self.request_interceptors {
            interceptor(event);
        }

        let response = match self.route(event) {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, code = e.code(), kind = %event.kind(), "Dispatch failed");
                (self.error_action)(event, &e)
            }
        };

        for interceptor in &self.response_interceptors {
            interceptor(event, &response);
        }

        response
    }

    fn route(&self, event: &InboundEvent) -> Result<OutboundResponse> {
        let entry = self
            .entries
            .iter()
            .find(|entry| (entry.predicate)(event))
            .ok_or_else(|| Error::UnmatchedEvent {
                kind: event.kind().to_string(),
                intent: event.intent_name().unwrap_or("none").to_string(),
            })?;

        debug!(handler = %entry.name, "Handler matched");
        (entry.action)(event)
    }

    /// Names of the registered handlers, in precedence order.
    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

/// Default error handler: apologize and keep the session open.
pub fn apologize(_event: &InboundEvent, _error: &Error) -> OutboundResponse {
    let mut response = ResponseBuilder::new();
    response
        .add_speech(APOLOGY)
        .reprompt(APOLOGY)
        .set_session(SessionControl::Continue);
    response.build()
}

/// Matches events of one kind.
pub fn is_kind(kind: EventKind) -> impl Fn(&InboundEvent) -> bool + Send + Sync + 'static {
    move |event: &InboundEvent| event.kind() == &kind
}

/// Matches intent events with the given name.
pub fn is_intent(name: &'static str) -> impl Fn(&InboundEvent) -> bool + Send + Sync + 'static {
    move |event: &InboundEvent| {
        event.kind() == &EventKind::Intent && event.intent_name() == Some(name)
    }
}

/// Matches intent events with any of the given names.
pub fn is_any_intent(
    names: &'static [&'static str],
) -> impl Fn(&InboundEvent) -> bool + Send + Sync + 'static {
    move |event: &InboundEvent| {
        event.kind() == &EventKind::Intent
            && event.intent_name().is_some_and(|n| names.contains(&n))
    }
}
