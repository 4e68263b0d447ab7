//! End-to-end integration tests for the Patchsmith agent pipeline.
//!
//! These tests exercise the full path from user request to files on disk:
//! prompt assembly, the retry protocol, contract validation, sandboxing,
//! and content cleanup.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use patchsmith_core::{LlmClient, ProviderError, Session};
use patchsmith_pipeline::Orchestrator;

/// Returns scripted responses in sequence and records every prompt it was
/// sent. Repeats the last response once the script runs out.
struct ScriptedClient {
    responses: std::sync::Mutex<Vec<String>>,
    prompts: std::sync::Mutex<Vec<String>>,
    cursor: std::sync::Mutex<usize>,
}

impl ScriptedClient {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: std::sync::Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            prompts: std::sync::Mutex::new(Vec::new()),
            cursor: std::sync::Mutex::new(0),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn chat(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let responses = self.responses.lock().unwrap();
        let mut cursor = self.cursor.lock().unwrap();
        let index = (*cursor).min(responses.len().saturating_sub(1));
        *cursor += 1;
        Ok(responses.get(index).cloned().unwrap_or_default())
    }
}

fn plan_json(read: &[&str], create: &[&str]) -> String {
    let quote = |items: &[&str]| {
        items
            .iter()
            .map(|s| format!("\"{s}\""))
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        r#"{{"analysis":"plan","files_to_read":[{}],"files_to_create":[{}],"files_to_modify":[],"dependencies_required":[]}}"#,
        quote(read),
        quote(create)
    )
}

#[tokio::test]
async fn pipeline_writes_normalized_python_to_disk() {
    let root = TempDir::new().unwrap();
    // Content arrives with literal escape sequences, as small models emit.
    let write_json = r#"{"summary":"add greeter","files":[{"path":"greet.py","action":"create","content":"def greet():\\n    print(\\\"hi\\\")"}]}"#;
    let client = ScriptedClient::new(&[plan_json(&[], &["greet.py"]).as_str(), write_json]);
    let orchestrator = Orchestrator::new(client.clone());
    let mut session = Session::new(root.path(), "test-model");

    let run = orchestrator
        .run(&mut session, "add a greeter")
        .await
        .unwrap();
    assert!(run.succeeded());

    let written = std::fs::read_to_string(root.path().join("greet.py")).unwrap();
    assert!(written.contains("def greet():"));
    assert!(written.contains("print(\"hi\")"));
    assert!(!written.contains("\\n"));
}

#[tokio::test]
async fn planning_prompt_carries_workspace_tree() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("existing.rs"), "fn main() {}").unwrap();
    let client = ScriptedClient::new(&[plan_json(&[], &[]).as_str()]);
    let orchestrator = Orchestrator::new(client.clone());
    let mut session = Session::new(root.path(), "test-model");

    orchestrator.plan(&mut session, "describe").await.unwrap();

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("DIRECTORY STRUCTURE:"));
    assert!(prompts[0].contains("existing.rs"));
    assert!(prompts[0].contains("User Input: describe"));
}

#[tokio::test]
async fn writing_prompt_includes_planned_file_contents() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("lib.rs"), "pub fn existing() {}").unwrap();
    let write_json = r#"{"summary":"noop","files":[]}"#;
    let client = ScriptedClient::new(&[plan_json(&["lib.rs"], &[]).as_str(), write_json]);
    let orchestrator = Orchestrator::new(client.clone());
    let mut session = Session::new(root.path(), "test-model");

    let run = orchestrator.run(&mut session, "tweak lib").await.unwrap();
    assert!(run.succeeded());

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("pub fn existing() {}"));
    assert!(prompts[1].contains("PLANNING CONTEXT"));
}

#[tokio::test]
async fn traversal_outside_work_dir_is_refused() {
    let parent = TempDir::new().unwrap();
    let root = parent.path().join("project");
    std::fs::create_dir(&root).unwrap();

    let write_json = r#"{"summary":"escape","files":[{"path":"../evil.txt","action":"create","content":"x"}]}"#;
    let client = ScriptedClient::new(&[plan_json(&[], &["../evil.txt"]).as_str(), write_json]);
    let orchestrator = Orchestrator::new(client);
    let mut session = Session::new(&root, "test-model");

    let run = orchestrator.run(&mut session, "escape").await.unwrap();
    let execution = run.execution.as_deref().unwrap();
    assert!(execution.contains("0/1 file operations successfully"));
    assert!(!parent.path().join("evil.txt").exists());
}

#[tokio::test]
async fn sensitive_files_blocked_even_in_relaxed_mode() {
    let root = TempDir::new().unwrap();
    let write_json = r#"{"summary":"secrets","files":[{"path":".env","action":"create","content":"KEY=1"}]}"#;
    let client = ScriptedClient::new(&[plan_json(&[], &[".env"]).as_str(), write_json]);
    let orchestrator = Orchestrator::new(client);
    let mut session = Session::new(root.path(), "test-model");
    session.set_security_mode(false);

    let run = orchestrator.run(&mut session, "write env").await.unwrap();
    let execution = run.execution.as_deref().unwrap();
    assert!(execution.contains("0/1 file operations successfully"));
    assert!(!root.path().join(".env").exists());
}

#[tokio::test]
async fn writer_exhaustion_keeps_planning_section_in_report() {
    let root = TempDir::new().unwrap();
    let client = ScriptedClient::new(&[plan_json(&[], &["a.txt"]).as_str(), "not json at all"]);
    let orchestrator = Orchestrator::new(client);
    let mut session = Session::new(root.path(), "test-model");

    let run = orchestrator.run(&mut session, "r").await.unwrap();
    assert!(!run.succeeded());
    assert!(run.planning.accepted);
    assert!(!run.writing.as_ref().unwrap().accepted);

    let markdown = run.to_markdown();
    assert!(markdown.contains("# Planning Result"));
    assert!(markdown.contains("after 3 attempts"));
    assert!(markdown.contains("not json at all"));
}

#[tokio::test]
async fn ask_mode_answers_without_touching_files() {
    let root = TempDir::new().unwrap();
    let client = ScriptedClient::new(&["A closure captures its environment."]);
    let orchestrator = Orchestrator::new(client.clone());

    let answer = orchestrator.ask("what is a closure?").await.unwrap();
    assert_eq!(answer, "A closure captures its environment.");

    let prompts = client.prompts();
    assert!(prompts[0].contains("User Input: what is a closure?"));
    assert!(!prompts[0].contains("DIRECTORY STRUCTURE:"));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
