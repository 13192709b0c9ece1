//! Message routing: decide whether an inbound message deserves a reply, then run the agent
//! turn and deliver the result back to the sender.
//!
//! The filter is a noise heuristic, not a classifier: greetings, questions and anything longer
//! than one word get a reply; single-word chatter ("ok", "lol") is dropped.

use crate::agent::{self, AgentReply, Persona};
use crate::channels::{InboundMessage, OutboundChannel};
use crate::llm::CompletionBackend;
use std::sync::Arc;

/// Single-word messages that still get a reply.
pub const GREETINGS: [&str; 4] = ["hi", "hello", "hey", "yo"];

/// True if `text` warrants a completion: a greeting (case-insensitive), contains '?', or has
/// more than one whitespace-separated token.
pub fn should_respond(text: &str) -> bool {
    let lower = text.to_lowercase();
    GREETINGS.contains(&lower.as_str())
        || lower.contains('?')
        || text.split_whitespace().nth(1).is_some()
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Filtered out; no completion, no delivery.
    Dropped,
    /// Generated reply delivered.
    Replied,
    /// Completion failed; the fallback reply was delivered.
    RepliedWithFallback,
    /// A reply was produced but the send API call failed.
    DeliveryFailed,
}

/// Routes inbound messages to the completion backend and delivers replies.
pub struct MessageRouter {
    backend: Arc<dyn CompletionBackend>,
    channel: Arc<dyn OutboundChannel>,
    persona: Persona,
}

impl MessageRouter {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        channel: Arc<dyn OutboundChannel>,
        persona: Persona,
    ) -> Self {
        Self {
            backend,
            channel,
            persona,
        }
    }

    /// Handle one message end to end. Errors are logged, never returned.
    pub async fn route(&self, msg: &InboundMessage) -> RouteOutcome {
        if !should_respond(&msg.text) {
            log::info!("message too short, not sending to {}", self.backend.name());
            return RouteOutcome::Dropped;
        }
        let reply = agent::run_turn(&*self.backend, &self.persona, &msg.text).await;
        if let Err(e) = self
            .channel
            .send_message(&msg.sender_id, reply.text())
            .await
        {
            log::error!("error sending message via {}: {}", self.channel.id(), e);
            return RouteOutcome::DeliveryFailed;
        }
        match reply {
            AgentReply::Generated(_) => RouteOutcome::Replied,
            AgentReply::Fallback(_) => RouteOutcome::RepliedWithFallback,
        }
    }
}
