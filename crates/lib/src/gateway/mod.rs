//! Gateway: HTTP endpoint for the Messenger webhook.
//!
//! `GET /webhook` answers the subscription handshake, `POST /webhook` receives signed event
//! batches and routes each message synchronously before acknowledging.

mod server;

pub use server::{app, run_gateway, GatewayState};
