//! Outbound calls to player bots

pub mod transport;

pub use transport::{fetch_decisions, BotError, BotTransport, HttpBotTransport};
