use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::commands::CommandSpec;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(String),
    #[error("chat platform rejected `{method}`: {detail}")]
    Api { method: String, detail: String },
}

/// Outbound chat surface. One `send_message` per logical reply; the command
/// menu registration happens once per successful start/authentication.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError>;
    async fn set_command_menu(&self, commands: &[CommandSpec]) -> Result<(), TransportError>;
}

/// Bot HTTP API client. Every call carries the client-level timeout; sends
/// are not idempotent and are never retried here.
pub struct HttpChatApi {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl HttpChatApi {
    pub fn new(
        base_url: impl Into<String>,
        bot_token: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| TransportError::Request(err.to_string()))?;

        Ok(Self { http, base_url: base_url.into(), bot_token })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.base_url.trim_end_matches('/'),
            self.bot_token.expose_secret()
        )
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<(), TransportError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&payload)
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
            return Err(TransportError::Api { method: method.to_string(), detail });
        }

        Ok(())
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }),
        )
        .await
    }

    async fn set_command_menu(&self, commands: &[CommandSpec]) -> Result<(), TransportError> {
        self.call("setMyCommands", json!({ "commands": commands })).await
    }
}

/// Test double capturing everything the pipeline tries to send.
#[derive(Default)]
pub struct RecordingChatApi {
    sent: Mutex<Vec<(i64, String)>>,
    menu_registrations: AtomicUsize,
}

impl RecordingChatApi {
    pub async fn sent_messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn menu_registrations(&self) -> usize {
        self.menu_registrations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for RecordingChatApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.sent.lock().await.push((chat_id, text.to_string()));
        Ok(())
    }

    async fn set_command_menu(&self, _commands: &[CommandSpec]) -> Result<(), TransportError> {
        self.menu_registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
