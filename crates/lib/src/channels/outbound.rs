//! Outbound side of a channel: deliver a reply to a recipient.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel not configured: {0}")]
    NotConfigured(&'static str),
    #[error("send request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("send api error: {0}")]
    Api(String),
}

/// A channel that can send a text message to a recipient (e.g. a Messenger PSID).
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Channel id (e.g. "messenger").
    fn id(&self) -> &str;
    /// Send `text` to `recipient_id`. One attempt, no retry.
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), ChannelError>;
}
