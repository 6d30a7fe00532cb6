//! LINE Messaging API: inbound webhook payloads and the outbound client

mod client;
mod types;

pub use client::{LineClient, LineError};
pub use types::WebhookBody;
