//! Ollama provider: talks to a local Ollama server over its native API.
//!
//! Uses `/api/generate` rather than the OpenAI-compatible shim: prompts
//! arrive here fully assembled, so the single-prompt generate endpoint is
//! the direct fit. Thinking is disabled on every request; the contract
//! layer expects plain JSON output, not reasoning traces.
//!
//! Streaming responses are NDJSON: one JSON object per line, the last one
//! carrying `"done": true`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use patchsmith_core::{LlmClient, ProviderError};

/// A client for one Ollama server and model.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for `model` at `base_url` (e.g.
    /// `http://localhost:11434`).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str, stream: bool) -> GenerateRequest<'_> {
        GenerateRequest {
            model: &self.model,
            prompt: prompt.to_string(),
            stream,
            think: false,
        }
    }

    async fn post_generate(
        &self,
        prompt: &str,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(model = %self.model, stream, "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt, stream))
            .send()
            .await
            .map_err(map_transport_err)?;

        let status = response.status().as_u16();

        if status == 404 {
            return Err(ProviderError::ModelNotFound(self.model.clone()));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }

    /// Check whether the server is reachable.
    pub async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_err)?;
        Ok(response.status().is_success())
    }

    /// List the models the server has pulled.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_err)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(body.models.into_iter().map(|m| m.name).collect())
    }
}

fn map_transport_err(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self.post_generate(prompt, false).await?;

        let body: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(body.response)
    }

    async fn chat_stream(
        &self,
        prompt: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<String, ProviderError>>, ProviderError> {
        let response = self.post_generate(prompt, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the NDJSON byte stream line by line and forward text chunks.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<GenerateResponse>(&line) {
                        Ok(chunk) => {
                            if !chunk.response.is_empty()
                                && tx.send(Ok(chunk.response)).await.is_err()
                            {
                                return; // receiver dropped
                            }
                            if chunk.done {
                                return;
                            }
                        }
                        Err(e) => {
                            debug!(line = %line, error = %e, "Ignoring unparseable stream line");
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    think: bool,
}

/// One `/api/generate` response object. In streaming mode each NDJSON line
/// is one of these; `done: true` marks the last.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
