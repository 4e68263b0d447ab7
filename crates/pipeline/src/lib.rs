//! The agent pipeline: Plan → Read → Write.
//!
//! [`orchestrator::Orchestrator`] drives the stages. Each stage sends a
//! prompt from [`prompt`], runs the bounded parse-validate-retry protocol
//! over the model's output, and renders its accepted result with
//! [`report`]. Between Planning and Writing, [`reader`] pulls the planned
//! files into the Writer's context.

pub mod orchestrator;
pub mod prompt;
pub mod reader;
pub mod report;

pub use orchestrator::{Orchestrator, PipelineError, RunReport, StageReport};
