//! Alexa Skill Lambda - Routes Alexa requests and relays messages to the web app.

mod envelope;
mod handlers;

use std::sync::Arc;

use envelope::AlexaResponse;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::{Config, Dispatcher};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn handler(
    dispatcher: Arc<Dispatcher>,
    event: LambdaEvent<Value>,
) -> Result<AlexaResponse, Error> {
    let (payload, context) = event.into_parts();

    let invocation = envelope::parse(payload).map_err(|e| {
        error!(request_id = %context.request_id, error = %e, "Rejecting request envelope");
        e
    })?;

    let response = dispatcher.dispatch(&invocation.event);

    Ok(envelope::render(&response, invocation.session_attributes)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Cannot start skill");
        e
    })?;
    info!(webapp_root = %config.webapp_root, "Will start HTML web app");

    let dispatcher = Arc::new(handlers::dispatcher(Arc::new(config)));

    run(service_fn(move |event| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handler(dispatcher, event).await }
    }))
    .await
}
