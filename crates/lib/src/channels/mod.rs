//! Communication channels (Messenger).
//!
//! Inbound webhook payloads are parsed into `InboundMessage`s for the router; replies go out
//! through an `OutboundChannel`.

mod inbound;
mod messenger;
mod outbound;
pub mod signature;

pub use inbound::InboundMessage;
pub use messenger::{
    MessengerChannel, MessengerEvent, MessengerMessage, MessengerParticipant, MessengerWebhook,
    DEFAULT_GRAPH_API_BASE,
};
pub use outbound::{ChannelError, OutboundChannel};
