//! Application state shared across routes

use std::sync::Arc;

use crate::bot::transport::{BotError, BotTransport, HttpBotTransport};
use crate::config::Config;
use crate::game::MatchRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub transport: Arc<dyn BotTransport>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, BotError> {
        // One HTTP client for every match so connections are pooled
        let transport = HttpBotTransport::new(config.bot_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn BotTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            match_registry: Arc::new(MatchRegistry::new()),
        }
    }
}
