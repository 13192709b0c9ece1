//! Inbound message from a channel: delivered to the router for filtering and reply.

/// A user text message extracted from a webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub text: String,
}
