use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::api::TransportError;
use crate::update::Update;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Source of inbound update batches. `Ok(None)` means the feed has closed
/// and the runner should stop; the live HTTP feed never closes on its own.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    async fn next_updates(&self, offset: i64) -> Result<Option<Vec<Update>>, TransportError>;
}

/// Processes one update. An error here is logged and the loop continues:
/// the offset advance is the single acknowledgement per update.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle_update(&self, update: &Update) -> Result<()>;
}

/// Long-poll transport over the Bot HTTP API `getUpdates` method.
pub struct HttpUpdateTransport {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
    poll_timeout_secs: u64,
}

impl HttpUpdateTransport {
    pub fn new(
        base_url: impl Into<String>,
        bot_token: SecretString,
        poll_timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        // The request must outlive the server-side long-poll window.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs.max(1) + 10))
            .build()
            .map_err(|err| TransportError::Request(err.to_string()))?;

        Ok(Self { http, base_url: base_url.into(), bot_token, poll_timeout_secs })
    }
}

#[async_trait]
impl UpdateTransport for HttpUpdateTransport {
    async fn next_updates(&self, offset: i64) -> Result<Option<Vec<Update>>, TransportError> {
        let url = format!(
            "{}/bot{}/getUpdates",
            self.base_url.trim_end_matches('/'),
            self.bot_token.expose_secret()
        );

        let response = self
            .http
            .get(url)
            .query(&[("timeout", self.poll_timeout_secs as i64), ("offset", offset)])
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        if !status.is_success() || body.get("ok").and_then(serde_json::Value::as_bool) != Some(true)
        {
            let detail = body
                .get("description")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("http status {status}"));
            return Err(TransportError::Api { method: "getUpdates".to_string(), detail });
        }

        let updates = body
            .get("result")
            .cloned()
            .map(serde_json::from_value::<Vec<Update>>)
            .transpose()
            .map_err(|err| TransportError::Request(err.to_string()))?
            .unwrap_or_default();

        Ok(Some(updates))
    }
}

pub struct PollRunner {
    transport: Arc<dyn UpdateTransport>,
    handler: Arc<dyn UpdateHandler>,
    reconnect_policy: ReconnectPolicy,
}

impl PollRunner {
    pub fn new(
        transport: Arc<dyn UpdateTransport>,
        handler: Arc<dyn UpdateHandler>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, handler, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        let mut offset = 0_i64;
        let mut attempt = 0_u32;

        loop {
            match self.transport.next_updates(offset).await {
                Ok(None) => {
                    info!(offset, "update feed closed");
                    return Ok(());
                }
                Ok(Some(updates)) => {
                    attempt = 0;
                    offset = self.dispatch_batch(updates, offset).await;
                }
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "update poll failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "update poll retries exhausted; stopping runner"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    attempt += 1;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    /// Hands each update to the handler exactly once and advances the
    /// offset regardless of the handler outcome; this is the single
    /// process-boundary acknowledgement per update.
    async fn dispatch_batch(&self, updates: Vec<Update>, current_offset: i64) -> i64 {
        let mut next_offset = current_offset;

        for update in updates {
            debug!(
                event_name = "ingress.telegram.update_received",
                update_id = update.update_id,
                "received update"
            );

            if let Err(error) = self.handler.handle_update(&update).await {
                warn!(
                    update_id = update.update_id,
                    error = %error,
                    "update handler failed; continuing poll loop"
                );
            }

            next_offset = next_offset.max(update.update_id + 1);
        }

        next_offset
    }
}
