//! The Reading stage: pull planned files into the Writer's context.
//!
//! Reads never abort the batch. A file that cannot be read contributes an
//! `[ERROR]` marker in place of its content, so the Writer still sees which
//! path was planned and why it is missing.

use std::path::Path;

use patchsmith_contracts::PlanResult;
use patchsmith_security::PathGuard;

/// Read every file the plan asks for and concatenate the results into one
/// prompt-ready block, separated by `---` rules.
pub fn read_planned_files(plan: &PlanResult, guard: &PathGuard) -> String {
    if plan.files_to_read.is_empty() {
        return "No files to read according to planning result.".to_string();
    }

    let mut parts = Vec::new();
    let mut successful = 0usize;

    for path in &plan.files_to_read {
        match read_file_safely(path, guard) {
            Ok(content) => {
                successful += 1;
                parts.push(format!("{path}:\n{content}"));
            }
            Err(reason) => {
                tracing::warn!(path, reason, "planned file could not be read");
                parts.push(format!("{path}:\n[ERROR] {reason}"));
            }
        }
    }

    let header = format!(
        "Read {successful}/{} files successfully\n\n",
        plan.files_to_read.len()
    );
    header + &parts.join("\n\n---\n\n")
}

/// Read one file through the path guard. All failures come back as a
/// human-readable reason.
fn read_file_safely(path: &str, guard: &PathGuard) -> Result<String, String> {
    let resolved = guard.validate(path).map_err(|e| e.to_string())?;

    if !resolved.exists() {
        return Err(format!("File not found: {path}"));
    }
    if !resolved.is_file() {
        return Err(format!("Path is not a file: {path}"));
    }

    read_to_string(&resolved, path)
}

fn read_to_string(resolved: &Path, path: &str) -> Result<String, String> {
    match std::fs::read_to_string(resolved) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(format!("Permission denied: {path}"))
        }
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            Err(format!("Cannot decode file (binary file?): {path}"))
        }
        Err(e) => Err(format!("Error reading file {path}: {e}")),
    }
}
