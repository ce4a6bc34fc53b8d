//! Bot transport: one request per live bot per tick

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::game::decision::{validate_decisions, Decision, ValidationError};
use crate::game::snapshot::BotRequest;

/// Default per-request budget
pub const DEFAULT_BOT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Failures surfaced to the engine. Either one eliminates the bot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BotError {
    /// Network failure, timeout, non-2xx status or unparsable body
    #[error("connection error")]
    Connection { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl BotError {
    pub fn connection(reason: impl Into<String>) -> Self {
        BotError::Connection {
            reason: reason.into(),
        }
    }

    /// Underlying detail for logs
    pub fn detail(&self) -> String {
        match self {
            BotError::Connection { reason } => reason.clone(),
            BotError::Validation(e) => e.to_string(),
        }
    }
}

/// Something that can ask a bot for its raw decision payload.
///
/// Implementations return the parsed JSON body; validation against the
/// task budget happens in [`fetch_decisions`].
pub trait BotTransport: Send + Sync {
    fn request_decisions<'a>(
        &'a self,
        request: &'a BotRequest<'a>,
    ) -> BoxFuture<'a, Result<Value, BotError>>;
}

impl<T: BotTransport + ?Sized> BotTransport for std::sync::Arc<T> {
    fn request_decisions<'a>(
        &'a self,
        request: &'a BotRequest<'a>,
    ) -> BoxFuture<'a, Result<Value, BotError>> {
        (**self).request_decisions(request)
    }
}

/// Query a bot and validate its answer
pub async fn fetch_decisions<T: BotTransport + ?Sized>(
    transport: &T,
    request: &BotRequest<'_>,
) -> Result<Vec<Decision>, BotError> {
    let payload = transport.request_decisions(request).await?;
    Ok(validate_decisions(&payload, request.tasks_per_tick())?)
}

/// POSTs the tick snapshot as JSON to `currentPlayer.endpoint`
#[derive(Clone)]
pub struct HttpBotTransport {
    client: Client,
    timeout: Duration,
}

impl HttpBotTransport {
    pub fn new(timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::connection(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    async fn post(&self, request: &BotRequest<'_>) -> Result<Value, BotError> {
        let endpoint = &request.current_player.endpoint;

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BotError::connection(format!("timed out after {:?}", self.timeout))
                } else {
                    BotError::connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::connection(format!("bot answered with status {status}")));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| BotError::connection(format!("unreadable response: {e}")))?;

        debug!(player = %request.current_player.name, "Bot responded");
        Ok(payload)
    }
}

impl BotTransport for HttpBotTransport {
    fn request_decisions<'a>(
        &'a self,
        request: &'a BotRequest<'a>,
    ) -> BoxFuture<'a, Result<Value, BotError>> {
        self.post(request).boxed()
    }
}
