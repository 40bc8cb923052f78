//! Shared library for the Web API Hello World skill.
//!
//! This crate provides the platform-neutral dispatch core: the inbound event
//! model, the ordered handler registry, the response builder, capability
//! checks and the JSON message relay between the skill and its web app.

pub mod capability;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod relay;
pub mod response;
pub mod webapp;

pub use capability::has_capability;
pub use config::Config;
pub use dispatch::{apologize, is_any_intent, is_intent, is_kind, Dispatcher, HandlerRegistry};
pub use error::{Error, Result};
pub use event::{EventKind, InboundEvent, SessionEnd};
pub use relay::{age_phrase, client_message_action, handle_client_message, to_client, ClientMessage};
pub use response::{Directive, OutboundResponse, ResponseBuilder, SessionControl};
pub use webapp::{ClientState, SkillTransport, WebAppClient};
