//! The pipeline orchestrator and its retry protocol.
//!
//! A stage attempt is: send the prompt, extract a JSON candidate from the
//! response, parse it, validate the shape. Parse and contract failures are
//! retried with the identical prompt, up to three total attempts, with no
//! feedback injected between attempts. Transport errors are terminal for
//! the request.
//!
//! Exhaustion is not an error: it produces a failure report embedding the
//! last raw response, so the user always sees what the model said.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use patchsmith_contracts::{
    extract_json, is_plan_result, is_write_result, PlanResult, WriteResult,
};
use patchsmith_core::{LlmClient, ProviderError, Session, Stage};
use patchsmith_security::PathGuard;

use crate::{prompt, reader, report};

const MAX_ATTEMPTS: usize = 3;

/// Pipeline-level failures. Contract violations and malformed responses are
/// not here: those are retry outcomes, surfaced as failure reports.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No planning result available. Please run planning first.")]
    NoPlanAvailable,

    #[error("No writer result available. Please run writing first.")]
    NoWriteAvailable,

    #[error("Invalid stored stage result. Cannot parse JSON.")]
    InvalidStageState,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// The outcome of one stage: either an accepted result rendered to
/// Markdown, or the failure report after retry exhaustion.
#[derive(Debug)]
pub struct StageReport {
    pub accepted: bool,
    pub markdown: String,
}

/// The outcome of a full agent run. Later sections are `None` when an
/// earlier stage exhausted its attempts.
#[derive(Debug)]
pub struct RunReport {
    pub planning: StageReport,
    pub writing: Option<StageReport>,
    pub execution: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.execution.is_some()
    }

    /// Join the per-stage sections into one document.
    pub fn to_markdown(&self) -> String {
        let mut sections = vec![self.planning.markdown.clone()];
        if let Some(writing) = &self.writing {
            sections.push(writing.markdown.clone());
        }
        if let Some(execution) = &self.execution {
            sections.push(execution.clone());
        }
        sections.join("\n\n")
    }
}

enum StageOutcome {
    Accepted { raw: String, value: Value },
    Exhausted { raw: String, reason: RejectReason },
}

#[derive(Clone, Copy)]
enum RejectReason {
    MalformedJson,
    ContractViolation,
}

/// Drives the Plan → Read → Write sequence against one LLM backend.
pub struct Orchestrator {
    client: Arc<dyn LlmClient>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Single round-trip, no contract, no file access.
    pub async fn ask(&self, request: &str) -> Result<String, ProviderError> {
        self.client.chat(&prompt::ask_prompt(request)).await
    }

    /// Streaming variant of [`ask`](Self::ask).
    pub async fn ask_stream(
        &self,
        request: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<String, ProviderError>>, ProviderError> {
        self.client.chat_stream(&prompt::ask_prompt(request)).await
    }

    /// Run the full agent pipeline for one request. Stale stage results
    /// from a previous run are dropped first.
    pub async fn run(
        &self,
        session: &mut Session,
        request: &str,
    ) -> Result<RunReport, PipelineError> {
        session.reset();

        let planning = self.plan(session, request).await?;
        if !planning.accepted {
            return Ok(RunReport {
                planning,
                writing: None,
                execution: None,
            });
        }

        let writing = self.write(session, request).await?;
        if !writing.accepted {
            return Ok(RunReport {
                planning,
                writing: Some(writing),
                execution: None,
            });
        }

        let execution = self.execute(session)?;
        Ok(RunReport {
            planning,
            writing: Some(writing),
            execution: Some(execution),
        })
    }

    /// Run the Planning stage and record the accepted raw response.
    pub async fn plan(
        &self,
        session: &mut Session,
        request: &str,
    ) -> Result<StageReport, PipelineError> {
        let stage_prompt = prompt::planning_prompt(request, session.work_dir());

        match self
            .run_stage(&stage_prompt, Stage::Planning, is_plan_result)
            .await?
        {
            StageOutcome::Accepted { raw, value } => {
                session.record_plan(raw);
                let plan: PlanResult = serde_json::from_value(value)
                    .map_err(|_| PipelineError::InvalidStageState)?;
                info!(
                    to_read = plan.files_to_read.len(),
                    to_create = plan.files_to_create.len(),
                    to_modify = plan.files_to_modify.len(),
                    "planning accepted"
                );
                Ok(StageReport {
                    accepted: true,
                    markdown: report::planning_markdown(&plan),
                })
            }
            StageOutcome::Exhausted { raw, reason } => Ok(StageReport {
                accepted: false,
                markdown: failure_report(Stage::Planning, reason, &raw),
            }),
        }
    }

    /// Run the Reading and Writing stages against the stored plan, and
    /// record the accepted raw response.
    pub async fn write(
        &self,
        session: &mut Session,
        request: &str,
    ) -> Result<StageReport, PipelineError> {
        let plan = stored_plan(session)?;
        let guard = PathGuard::new(session.work_dir(), session.strict_security());
        let contents = reader::read_planned_files(&plan, &guard);
        let stage_prompt = prompt::writing_prompt(request, &plan, &contents);

        match self
            .run_stage(&stage_prompt, Stage::Writing, is_write_result)
            .await?
        {
            StageOutcome::Accepted { raw, value } => {
                session.record_write(raw);
                let result: WriteResult = serde_json::from_value(value)
                    .map_err(|_| PipelineError::InvalidStageState)?;
                info!(files = result.files.len(), "writing accepted");
                Ok(StageReport {
                    accepted: true,
                    markdown: report::writer_markdown(&result),
                })
            }
            StageOutcome::Exhausted { raw, reason } => Ok(StageReport {
                accepted: false,
                markdown: failure_report(Stage::Writing, reason, &raw),
            }),
        }
    }

    /// Apply the stored Writer result's file operations, best effort and
    /// in list order. One failure never blocks the remaining files.
    pub fn execute(&self, session: &Session) -> Result<String, PipelineError> {
        let result = stored_write(session)?;

        let outcomes: Vec<(bool, String)> = result
            .files
            .iter()
            .map(|op| {
                match patchsmith_fsops::apply(op, session.work_dir(), session.strict_security()) {
                    Ok(applied) => (
                        true,
                        format!(
                            "File {} successfully: {}",
                            applied.action.past_tense(),
                            op.path
                        ),
                    ),
                    Err(e) => (false, e.to_string()),
                }
            })
            .collect();

        Ok(report::execution_markdown(&result.summary, &outcomes))
    }

    /// The bounded parse-validate-retry loop shared by Planning and
    /// Writing. Identical prompt each attempt, no backoff.
    async fn run_stage(
        &self,
        stage_prompt: &str,
        stage: Stage,
        is_valid: fn(&Value) -> bool,
    ) -> Result<StageOutcome, PipelineError> {
        let mut last_raw = String::new();
        let mut last_reason = RejectReason::MalformedJson;

        for attempt in 1..=MAX_ATTEMPTS {
            debug!(stage = stage.label(), attempt, "sending stage prompt");
            let response = self.client.chat(stage_prompt).await?;

            let candidate = extract_json(&response);
            match serde_json::from_str::<Value>(candidate) {
                Ok(value) => {
                    if is_valid(&value) {
                        return Ok(StageOutcome::Accepted {
                            raw: response,
                            value,
                        });
                    }
                    warn!(stage = stage.label(), attempt, "contract violation");
                    last_reason = RejectReason::ContractViolation;
                }
                Err(e) => {
                    warn!(stage = stage.label(), attempt, error = %e, "malformed JSON");
                    last_reason = RejectReason::MalformedJson;
                }
            }
            last_raw = response;
        }

        Ok(StageOutcome::Exhausted {
            raw: last_raw,
            reason: last_reason,
        })
    }
}

fn stored_plan(session: &Session) -> Result<PlanResult, PipelineError> {
    let raw = session.plan_raw().ok_or(PipelineError::NoPlanAvailable)?;
    serde_json::from_str(extract_json(raw)).map_err(|_| PipelineError::InvalidStageState)
}

fn stored_write(session: &Session) -> Result<WriteResult, PipelineError> {
    let raw = session.write_raw().ok_or(PipelineError::NoWriteAvailable)?;
    serde_json::from_str(extract_json(raw)).map_err(|_| PipelineError::InvalidStageState)
}

fn failure_report(stage: Stage, reason: RejectReason, raw: &str) -> String {
    let what = match reason {
        RejectReason::MalformedJson => "valid JSON".to_string(),
        RejectReason::ContractViolation => format!("a valid {} result", stage.label()),
    };
    format!(
        "Failed to get {what} after {MAX_ATTEMPTS} attempts.\n\nLast response:\n```\n{raw}\n```"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Returns scripted responses in order, repeating the last one once the
    /// script runs out. Counts calls.
    struct ScriptedClient {
        responses: std::sync::Mutex<VecDeque<String>>,
        last: std::sync::Mutex<String>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: std::sync::Mutex::new(
                    responses.iter().map(|s| s.to_string()).collect(),
                ),
                last: std::sync::Mutex::new(
                    responses.last().map(|s| s.to_string()).unwrap_or_default(),
                ),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.lock().unwrap().pop_front() {
                Some(response) => Ok(response),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        fn name(&self) -> &str {
            "failing"
        }

        async fn chat(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
    }

    fn session_in(root: &TempDir) -> Session {
        Session::new(root.path(), "test-model")
    }

    fn valid_plan_json(create: &str) -> String {
        format!(
            r#"{{"analysis":"x","files_to_read":[],"files_to_create":["{create}"],"files_to_modify":[],"dependencies_required":[]}}"#
        )
    }

    #[tokio::test]
    async fn plan_accepts_valid_first_response() {
        let root = TempDir::new().unwrap();
        let client = ScriptedClient::new(&[valid_plan_json("a.txt").as_str()]);
        let orch = Orchestrator::new(client.clone());
        let mut session = session_in(&root);

        let report = orch.plan(&mut session, "make a.txt").await.unwrap();
        assert!(report.accepted);
        assert!(report.markdown.contains("# Planning Result"));
        assert!(session.plan_raw().is_some());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn plan_retries_after_contract_violation() {
        let root = TempDir::new().unwrap();
        // First response parses but misses required keys.
        let client =
            ScriptedClient::new(&[r#"{"analysis": "x"}"#, valid_plan_json("a.txt").as_str()]);
        let orch = Orchestrator::new(client.clone());
        let mut session = session_in(&root);

        let report = orch.plan(&mut session, "r").await.unwrap();
        assert!(report.accepted);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn plan_exhaustion_makes_exactly_three_calls() {
        let root = TempDir::new().unwrap();
        let client = ScriptedClient::new(&["this is not json"]);
        let orch = Orchestrator::new(client.clone());
        let mut session = session_in(&root);

        let report = orch.plan(&mut session, "r").await.unwrap();
        assert!(!report.accepted);
        assert_eq!(client.calls(), 3);
        assert!(report.markdown.contains("after 3 attempts"));
        assert!(report.markdown.contains("this is not json"));
        assert!(session.plan_raw().is_none());
    }

    #[tokio::test]
    async fn transport_error_is_terminal_not_retried() {
        let root = TempDir::new().unwrap();
        let client = Arc::new(FailingClient);
        let orch = Orchestrator::new(client);
        let mut session = session_in(&root);

        let err = orch.plan(&mut session, "r").await.unwrap_err();
        assert!(matches!(err, PipelineError::Provider(_)));
    }

    #[tokio::test]
    async fn write_without_plan_fails_explicitly() {
        let root = TempDir::new().unwrap();
        let client = ScriptedClient::new(&["{}"]);
        let orch = Orchestrator::new(client);
        let mut session = session_in(&root);

        let err = orch.write(&mut session, "r").await.unwrap_err();
        assert!(matches!(err, PipelineError::NoPlanAvailable));
    }

    #[tokio::test]
    async fn execute_without_write_fails_explicitly() {
        let root = TempDir::new().unwrap();
        let client = ScriptedClient::new(&["{}"]);
        let orch = Orchestrator::new(client);
        let session = session_in(&root);

        let err = orch.execute(&session).unwrap_err();
        assert!(matches!(err, PipelineError::NoWriteAvailable));
    }

    #[tokio::test]
    async fn full_run_creates_planned_file() {
        let root = TempDir::new().unwrap();
        let write_json = r#"{"summary":"add a","files":[{"path":"a.txt","action":"create","content":"hello"}]}"#;
        let client = ScriptedClient::new(&[valid_plan_json("a.txt").as_str(), write_json]);
        let orch = Orchestrator::new(client.clone());
        let mut session = session_in(&root);

        let run = orch.run(&mut session, "add a.txt with hello").await.unwrap();
        assert!(run.succeeded());
        assert_eq!(client.calls(), 2);

        let execution = run.execution.as_deref().unwrap();
        assert!(execution.contains("1/1 file operations successfully"));
        assert!(execution.contains("File created successfully: a.txt"));

        let written = std::fs::read_to_string(root.path().join("a.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn run_stops_after_planning_exhaustion() {
        let root = TempDir::new().unwrap();
        let client = ScriptedClient::new(&["nope"]);
        let orch = Orchestrator::new(client.clone());
        let mut session = session_in(&root);

        let run = orch.run(&mut session, "r").await.unwrap();
        assert!(!run.succeeded());
        assert!(!run.planning.accepted);
        assert!(run.writing.is_none());
        assert!(run.execution.is_none());
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn run_reports_partial_write_success() {
        let root = TempDir::new().unwrap();
        // Second op deletes a file that does not exist.
        let write_json = r#"{"summary":"two ops","files":[{"path":"a.txt","action":"create","content":"hi"},{"path":"ghost.txt","action":"delete","content":""}]}"#;
        let client = ScriptedClient::new(&[valid_plan_json("a.txt").as_str(), write_json]);
        let orch = Orchestrator::new(client);
        let mut session = session_in(&root);

        let run = orch.run(&mut session, "r").await.unwrap();
        let execution = run.execution.as_deref().unwrap();
        assert!(execution.contains("1/2 file operations successfully"));
        assert!(execution.contains("File not found for deletion: ghost.txt"));
        assert!(root.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn fenced_responses_are_accepted() {
        let root = TempDir::new().unwrap();
        let fenced = format!("Here you go:\n```json\n{}\n```", valid_plan_json("a.txt"));
        let client = ScriptedClient::new(&[fenced.as_str()]);
        let orch = Orchestrator::new(client);
        let mut session = session_in(&root);

        let report = orch.plan(&mut session, "r").await.unwrap();
        assert!(report.accepted);
        // The raw response is stored verbatim, fences included.
        assert!(session.plan_raw().unwrap().contains("```json"));
    }

    #[tokio::test]
    async fn run_resets_previous_stage_results() {
        let root = TempDir::new().unwrap();
        let client = ScriptedClient::new(&["still not json"]);
        let orch = Orchestrator::new(client);
        let mut session = session_in(&root);
        session.record_plan(valid_plan_json("old.txt"));

        let run = orch.run(&mut session, "r").await.unwrap();
        assert!(!run.planning.accepted);
        assert!(session.plan_raw().is_none());
    }
}
