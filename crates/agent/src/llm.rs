use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("completion service returned status {0}")]
    Status(u16),
    #[error("completion response was malformed: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Classification calls have no side effects, so transport failures and
    /// server-side errors are safe to retry. Client errors are not.
    fn retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status(status) => *status >= 500 || *status == 429,
            Self::MalformedResponse(_) => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl<T> LlmClient for std::sync::Arc<T>
where
    T: LlmClient + ?Sized,
{
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        (**self).complete(request).await
    }
}

/// Chat-completion client for any OpenAI-compatible endpoint (including a
/// local Ollama server). Bounded timeout per call, bounded retry count.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    max_retries: u32,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|err| LlmError::Request(err.to_string()))?;

        Ok(Self { http, base_url: base_url.into(), api_key, model: model.into(), max_retries })
    }

    async fn try_complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        });

        let mut builder = self.http.post(url).json(&payload);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response =
            builder.send().await.map_err(|err| LlmError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        let body: serde_json::Value =
            response.json().await.map_err(|err| LlmError::Request(err.to_string()))?;

        body.pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                LlmError::MalformedResponse("missing choices[0].message.content".to_string())
            })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.try_complete(request).await {
                Ok(content) => return Ok(content),
                Err(error) if error.retryable() && attempt < self.max_retries => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %error,
                        "completion call failed; retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Deterministic test double replaying canned completions in order.
#[derive(Default)]
pub struct ScriptedLlmClient {
    outputs: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlmClient {
    pub fn replying(outputs: impl IntoIterator<Item = &'static str>) -> Self {
        let client = Self::default();
        for output in outputs {
            client.push_ok(output);
        }
        client
    }

    pub fn push_ok(&self, output: &str) {
        self.outputs.lock().expect("lock").push_back(Ok(output.to_string()));
    }

    pub fn push_err(&self, error: LlmError) {
        self.outputs.lock().expect("lock").push_back(Err(error));
    }

    pub fn seen_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().expect("lock").push(request.clone());
        self.outputs
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("scripted client exhausted".to_string())))
    }
}
