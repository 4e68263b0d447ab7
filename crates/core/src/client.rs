//! LlmClient trait: the abstraction over LLM backends.
//!
//! A client knows how to send one fully-built prompt to a model and get text
//! back, either as a complete string or as a stream of chunks. The pipeline
//! calls `chat()` without knowing which backend is behind it.
//!
//! The retry/validation protocol is defined only over fully-assembled
//! responses, so streaming callers must buffer every chunk into one string
//! before handing the text to the extraction/validation layer.

use crate::error::ProviderError;
use async_trait::async_trait;

/// The core LLM client trait.
///
/// Implementations: Ollama (native API). Stub clients in tests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// A human-readable name for this backend (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a prompt and get the complete response text.
    async fn chat(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Send a prompt and get a stream of response chunks.
    ///
    /// Default implementation calls `chat()` and wraps the result as a
    /// single chunk.
    async fn chat_stream(
        &self,
        prompt: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<String, ProviderError>>, ProviderError> {
        let response = self.chat(prompt).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(response)).await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, prompt: &str) -> Result<String, ProviderError> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_complete_response() {
        let client = EchoClient;
        let mut rx = client.chat_stream("hello").await.unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk, "hello");
        assert!(rx.recv().await.is_none());
    }
}
