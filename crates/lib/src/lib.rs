//! Relay core library: Messenger webhook handling, message routing, and Gemini completions
//! used by the `relay` binary.

pub mod agent;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod routing;
