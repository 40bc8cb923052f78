//! Web app side of the message relay.
//!
//! The web app gets its skill connection asynchronously after load. Until
//! then it must not send anything; [`WebAppClient`] makes that state
//! explicit instead of relying on a global handle.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{Error, Result};

/// Outcome of delivering a message to the skill backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSendResult {
    pub status_code: u16,
    pub reason: Option<String>,
}

impl MessageSendResult {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Connection to the skill, as handed out by the device runtime.
pub trait SkillTransport {
    /// Send a JSON message to the skill backend.
    fn send_message(&self, message: &Value) -> MessageSendResult;

    /// Ask the device to open the microphone.
    fn request_microphone_open(&self) -> Result<()>;
}

/// Initialization state of the web app's skill connection.
#[derive(Debug)]
pub enum ClientState<T> {
    /// Waiting for the device runtime
    NotReady,
    Ready(T),
    /// The device refused to create a connection
    Failed { code: String },
}

/// Web app state passed to UI event handlers.
#[derive(Debug)]
pub struct WebAppClient<T> {
    state: ClientState<T>,
    initial_data: Option<Value>,
    received: Vec<Value>,
}

impl<T: SkillTransport> Default for WebAppClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SkillTransport> WebAppClient<T> {
    pub fn new() -> Self {
        Self {
            state: ClientState::NotReady,
            initial_data: None,
            received: Vec::new(),
        }
    }

    pub fn state(&self) -> &ClientState<T> {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ClientState::Ready(_))
    }

    /// Start data delivered with the connection.
    pub fn initial_data(&self) -> Option<&Value> {
        self.initial_data.as_ref()
    }

    /// Record the result of connecting to the device runtime. Only the
    /// first call has an effect.
    pub fn initialize(
        &mut self,
        outcome: std::result::Result<(T, Value), String>,
    ) -> Result<()> {
        if !matches!(self.state, ClientState::NotReady) {
            return Err(Error::AlreadyInitialized);
        }

        self.state = match outcome {
            Ok((transport, initial_data)) => {
                info!("Skill connection ready");
                self.initial_data = Some(initial_data);
                ClientState::Ready(transport)
            }
            Err(code) => {
                warn!(code = %code, "Skill connection failed to initialize");
                ClientState::Failed { code }
            }
        };
        Ok(())
    }

    fn transport(&self, action: &str) -> Result<&T> {
        match &self.state {
            ClientState::Ready(transport) => Ok(transport),
            ClientState::NotReady => {
                warn!(action, "Skill connection not ready");
                Err(Error::ClientNotReady(format!("cannot {}, still initializing", action)))
            }
            ClientState::Failed { code } => {
                warn!(action, code = %code, "Skill connection unavailable");
                Err(Error::ClientNotReady(format!(
                    "cannot {}, initialization failed with {}",
                    action, code
                )))
            }
        }
    }

    /// Send a message to the skill backend.
    pub fn send_message(&self, message: &Value) -> Result<MessageSendResult> {
        let transport = self.transport("send message")?;
        let result = transport.send_message(message);
        if result.is_success() {
            info!("Message sent to skill backend");
        } else {
            warn!(
                status = result.status_code,
                reason = ?result.reason,
                "Failed to send message to skill backend"
            );
        }
        Ok(result)
    }

    /// Handler for the hello button.
    pub fn say_hello(&self, now: DateTime<Utc>) -> Result<MessageSendResult> {
        self.send_message(&hello_message(now))
    }

    /// Handler for the microphone button.
    pub fn open_microphone(&self) -> Result<()> {
        self.transport("open the microphone")?.request_microphone_open()
    }

    /// Callback for messages pushed by the skill.
    pub fn on_message(&mut self, message: Value) {
        info!(message = %message, "Received a message from the skill endpoint");
        self.received.push(message);
    }

    /// Messages received from the skill, oldest first.
    pub fn received(&self) -> &[Value] {
        &self.received
    }
}

/// Payload sent by the hello button.
pub fn hello_message(now: DateTime<Utc>) -> Value {
    json!({ "speech": "Hello world", "time": now.timestamp_millis() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<Value>>,
        mic_requests: RefCell<u32>,
    }

    impl SkillTransport for RecordingTransport {
        fn send_message(&self, message: &Value) -> MessageSendResult {
            self.sent.borrow_mut().push(message.clone());
            MessageSendResult {
                status_code: 200,
                reason: None,
            }
        }

        fn request_microphone_open(&self) -> Result<()> {
            *self.mic_requests.borrow_mut() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_send_before_ready_is_refused() {
        let client: WebAppClient<RecordingTransport> = WebAppClient::new();
        assert!(matches!(
            client.send_message(&json!({})),
            Err(Error::ClientNotReady(_))
        ));
        assert!(client.open_microphone().is_err());
    }

    #[test]
    fn test_ready_client_sends_hello() {
        let mut client = WebAppClient::new();
        client
            .initialize(Ok((RecordingTransport::default(), json!({"someKey": "x"}))))
            .unwrap();

        let now = Utc::now();
        let result = client.say_hello(now).unwrap();
        assert!(result.is_success());
        assert_eq!(client.initial_data(), Some(&json!({"someKey": "x"})));

        let ClientState::Ready(transport) = client.state() else {
            panic!("client should be ready");
        };
        assert_eq!(transport.sent.borrow().as_slice(), &[hello_message(now)]);
    }

    #[test]
    fn test_initialize_only_once() {
        let mut client: WebAppClient<RecordingTransport> = WebAppClient::new();
        client.initialize(Err("SKILL_NOT_FOUND".to_string())).unwrap();
        assert!(matches!(client.state(), ClientState::Failed { .. }));
        assert!(matches!(
            client.initialize(Ok((RecordingTransport::default(), Value::Null))),
            Err(Error::AlreadyInitialized)
        ));
        assert!(!client.is_ready());
    }

    #[test]
    fn test_microphone_and_incoming_messages() {
        let mut client = WebAppClient::new();
        client
            .initialize(Ok((RecordingTransport::default(), Value::Null)))
            .unwrap();
        client.open_microphone().unwrap();
        client.on_message(json!({"event": "HelloWorldIntentReceived"}));

        assert_eq!(client.received(), &[json!({"event": "HelloWorldIntentReceived"})]);
        let ClientState::Ready(transport) = client.state() else {
            panic!("client should be ready");
        };
        assert_eq!(*transport.mic_requests.borrow(), 1);
    }
}
