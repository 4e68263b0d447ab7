//! LLM backend implementations.
//!
//! One backend today: [`OllamaClient`], speaking Ollama's native
//! `/api/generate` protocol. Anything implementing
//! [`patchsmith_core::LlmClient`] can stand in for it.

pub mod ollama;

pub use ollama::OllamaClient;
