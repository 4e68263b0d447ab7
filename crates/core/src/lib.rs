//! # Patchsmith Core
//!
//! Domain types, traits, and error definitions for the patchsmith agent
//! pipeline. This crate has **zero framework dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The LLM backend is defined as a trait here (`LlmClient`); implementations
//! live in `patchsmith-providers`. The pipeline session is an explicit value
//! constructed at startup and threaded through calls; there is no global
//! mutable state anywhere in the workspace.

pub mod client;
pub mod error;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use client::LlmClient;
pub use error::ProviderError;
pub use session::{ChatMode, Session, Stage};
