//! Bridge client
//!
//! Outbound sends are best-effort: three attempts with exponential backoff
//! capped at ten seconds, then the message is dropped with an error log.
//! Delivery state never depends on a confirmation reaching the group.

use crate::types::OutboundMessage;
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Bridge endpoint configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the bridge process, e.g. `http://127.0.0.1:3030`.
    pub base_url: String,
    /// Optional bearer token the bridge expects.
    pub token: Option<String>,
}

/// HTTP client for the outbound side of the bridge
#[derive(Debug, Clone)]
pub struct BridgeClient {
    config: BridgeConfig,
    http_client: HttpClient,
}

impl BridgeClient {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let http_client = HttpClient::builder()
            .user_agent(concat!("kargo-whatsapp/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Send one message, retrying transient failures.
    pub async fn send(&self, message: &OutboundMessage) -> Result<(), BridgeError> {
        let mut delay = Duration::from_secs(1);
        let mut last_error = BridgeError::Client("no attempt made".to_string());

        for attempt in 1..=MAX_ATTEMPTS {
            match self.send_once(message).await {
                Ok(()) => {
                    debug!(to = %message.to, attempt, "outbound message accepted by bridge");
                    return Ok(());
                }
                Err(error) if error.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        to = %message.to,
                        attempt,
                        %error,
                        "outbound send failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(BACKOFF_CAP);
                    last_error = error;
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_error)
    }

    async fn send_once(&self, message: &OutboundMessage) -> Result<(), BridgeError> {
        let url = format!("{}/send", self.config.base_url.trim_end_matches('/'));
        let mut request = self.http_client.post(&url).json(message);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(BridgeError::Http)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BridgeError::Status(status.as_u16()))
        }
    }
}

/// Bridge communication errors
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge client setup failed: {0}")]
    Client(String),

    #[error("bridge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bridge returned status {0}")]
    Status(u16),
}

impl BridgeError {
    /// Connection problems and server-side errors are worth retrying;
    /// client-side rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Client(_) => false,
            BridgeError::Http(error) => error.is_timeout() || error.is_connect(),
            BridgeError::Status(status) => *status >= 500,
        }
    }
}
