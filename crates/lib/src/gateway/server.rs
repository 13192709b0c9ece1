//! Gateway HTTP server: Messenger webhook verification and event delivery.

use crate::agent::Persona;
use crate::channels::signature::{self, SIGNATURE_HEADER};
use crate::channels::{MessengerChannel, MessengerWebhook, OutboundChannel};
use crate::config::Config;
use crate::llm::{CompletionBackend, GeminiClient};
use crate::routing::{MessageRouter, RouteOutcome};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

const INDEX_TEXT: &str = "This is a Facebook Messenger bot webhook.";
const OK_TEXT: &str = "OK";
const FORBIDDEN_TEXT: &str = "Forbidden";

/// Shared, immutable state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub router: Arc<MessageRouter>,
}

impl GatewayState {
    /// State wired to the real Gemini and Graph API clients.
    pub fn from_config(config: Config) -> Self {
        let backend: Arc<dyn CompletionBackend> = Arc::new(GeminiClient::new(
            config.completion.api_key.clone(),
            config.completion.model.clone(),
            config.completion.base_url.clone(),
        ));
        let channel: Arc<dyn OutboundChannel> = Arc::new(MessengerChannel::new(
            config.messenger.page_access_token.clone(),
            config.messenger.graph_api_base.clone(),
        ));
        Self::new(config, backend, channel)
    }

    /// State with explicit backends (used by tests to substitute fakes).
    pub fn new(
        config: Config,
        backend: Arc<dyn CompletionBackend>,
        channel: Arc<dyn OutboundChannel>,
    ) -> Self {
        let persona = Persona::from_config(&config.completion);
        Self {
            config: Arc::new(config),
            router: Arc::new(MessageRouter::new(backend, channel, persona)),
        }
    }
}

/// Build the axum app: `GET /`, `GET /webhook`, `POST /webhook`.
pub fn app(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/webhook", get(verify_webhook).post(handle_webhook))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (SIGINT or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    for name in config.missing_secrets() {
        log::warn!("{} is not set; the routes that need it will reject or fail", name);
    }
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let state = GatewayState::from_config(config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM. If a handler cannot be installed, that signal is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / — static liveness text.
async fn index() -> &'static str {
    INDEX_TEXT
}

#[derive(Debug, Default, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Returns the challenge when mode is "subscribe" and the token matches the configured one.
/// An unconfigured token never matches.
fn verify_subscription(params: &VerifyParams, expected_token: Option<&str>) -> Option<String> {
    let expected = expected_token?;
    let subscribing = params.mode.as_deref() == Some("subscribe");
    if subscribing && params.verify_token.as_deref() == Some(expected) {
        Some(params.challenge.clone().unwrap_or_default())
    } else {
        None
    }
}

/// GET /webhook — subscription handshake.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    match verify_subscription(&params, state.config.messenger.verify_token.as_deref()) {
        Some(challenge) => {
            log::info!("webhook verified successfully");
            (StatusCode::OK, challenge)
        }
        None => {
            log::warn!("webhook verification failed");
            (StatusCode::FORBIDDEN, FORBIDDEN_TEXT.to_string())
        }
    }
}

/// POST /webhook — verifies X-Hub-Signature, then routes each genuine text message in order.
/// Once the signature passes the platform always gets 200 OK, whatever happened downstream.
async fn handle_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !signature::verify_signature(
        &body,
        provided,
        state.config.messenger.app_secret.as_deref(),
    ) {
        log::warn!("invalid signature, request rejected");
        return (StatusCode::FORBIDDEN, FORBIDDEN_TEXT);
    }

    let webhook: MessengerWebhook = match serde_json::from_slice(&body) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("webhook body is not a valid event envelope: {}", e);
            return (StatusCode::OK, OK_TEXT);
        }
    };
    let page_id = state.config.messenger.page_id.as_deref();
    for msg in webhook.inbound_messages(page_id) {
        let outcome = state.router.route(&msg).await;
        if outcome != RouteOutcome::Dropped {
            log::debug!("message from {} handled: {:?}", msg.sender_id, outcome);
        }
    }
    (StatusCode::OK, OK_TEXT)
}
