//! Pipeline session state.
//!
//! One `Session` is active per process. The original design kept this in a
//! global singleton; here it is an explicit value constructed by the config
//! layer and passed by mutable reference through the pipeline, which
//! preserves the "one active session" semantics without hidden state.
//! Reconfiguring means building a new `Session`, never a second concurrent
//! one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a user request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Single LLM round-trip, no contracts, no file access.
    Ask,
    /// The full Plan → Read → Write pipeline.
    Agent,
}

/// One phase of the agent pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Reading,
    Writing,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Planning => "planning",
            Stage::Reading => "reading",
            Stage::Writing => "writing",
        }
    }
}

/// Process-wide session state for one pipeline user.
///
/// Holds the work-directory root all file operations are confined to, the
/// security mode, and the raw text of the last accepted Planning and Writing
/// responses. Raw responses are kept verbatim (not re-serialized) so later
/// stages parse exactly what the model produced and was accepted.
#[derive(Debug, Clone)]
pub struct Session {
    work_dir: PathBuf,
    strict_security: bool,
    chat_mode: ChatMode,
    model: String,
    plan_raw: Option<String>,
    write_raw: Option<String>,
}

impl Session {
    /// Create a fresh session rooted at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            strict_security: true,
            chat_mode: ChatMode::Agent,
            model: model.into(),
            plan_raw: None,
            write_raw: None,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn strict_security(&self) -> bool {
        self.strict_security
    }

    /// Relax or re-enable the work-directory containment check. The
    /// denylists stay active in both modes.
    pub fn set_security_mode(&mut self, strict: bool) {
        self.strict_security = strict;
    }

    pub fn chat_mode(&self) -> ChatMode {
        self.chat_mode
    }

    pub fn set_chat_mode(&mut self, mode: ChatMode) {
        self.chat_mode = mode;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Record the raw text of an accepted Planning response.
    pub fn record_plan(&mut self, raw: impl Into<String>) {
        self.plan_raw = Some(raw.into());
    }

    /// Record the raw text of an accepted Writing response.
    pub fn record_write(&mut self, raw: impl Into<String>) {
        self.write_raw = Some(raw.into());
    }

    /// The last accepted Planning response, if any stage has been accepted.
    pub fn plan_raw(&self) -> Option<&str> {
        self.plan_raw.as_deref()
    }

    pub fn write_raw(&self) -> Option<&str> {
        self.write_raw.as_deref()
    }

    /// Drop accepted stage results, returning the session to its idle state.
    pub fn reset(&mut self) {
        self.plan_raw = None;
        self.write_raw = None;
    }
}
