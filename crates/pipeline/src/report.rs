//! Markdown rendering of accepted stage results.
//!
//! Section headers are fixed so downstream consumers (and tests) can key on
//! them. Content previews in the Writer report are truncated to ten lines.

use std::path::Path;

use patchsmith_contracts::{FileAction, PlanResult, WriteResult};

const PREVIEW_LINES: usize = 10;

/// Render an accepted Planning result.
pub fn planning_markdown(plan: &PlanResult) -> String {
    let mut md = String::from("# Planning Result\n\n");

    md.push_str("## Analysis\n");
    md.push_str(&plan.analysis);
    md.push_str("\n\n");

    push_path_section(&mut md, "## Files to Read", &plan.files_to_read, "No files to read");
    push_path_section(
        &mut md,
        "## Files to Create",
        &plan.files_to_create,
        "No files to create",
    );
    push_path_section(
        &mut md,
        "## Files to Modify",
        &plan.files_to_modify,
        "No files to modify",
    );
    push_path_section(
        &mut md,
        "## Dependencies Required",
        &plan.dependencies_required,
        "No additional dependencies required",
    );

    md
}

fn push_path_section(md: &mut String, header: &str, items: &[String], empty_label: &str) {
    md.push_str(header);
    md.push('\n');
    if items.is_empty() {
        md.push_str("- ");
        md.push_str(empty_label);
        md.push('\n');
    } else {
        for item in items {
            md.push_str(&format!("- `{item}`\n"));
        }
    }
    md.push('\n');
}

/// Render an accepted Writer result: the summary plus a preview of every
/// file operation.
pub fn writer_markdown(result: &WriteResult) -> String {
    let mut md = String::from("# Writer Result\n\n");

    if !result.summary.is_empty() {
        md.push_str("## Summary\n");
        md.push_str(&result.summary);
        md.push_str("\n\n");
    }

    md.push_str("## File Operations\n");
    if result.files.is_empty() {
        md.push_str("- No file operations specified\n");
        return md;
    }

    for op in &result.files {
        let title = match op.action {
            FileAction::Create => "Create",
            FileAction::Modify => "Modify",
            FileAction::Delete => "Delete",
        };
        md.push_str(&format!("### {title}: `{}`\n", op.path));

        if op.action != FileAction::Delete && !op.content.is_empty() {
            let preview = preview_content(&op.content);
            let language = language_for(&op.path);
            md.push_str(&format!("```{language}\n{preview}\n```\n"));
        }
        md.push('\n');
    }

    md
}

/// Render the execution outcome of a Writer batch: one line per file plus
/// the partial-success count.
pub fn execution_markdown(summary: &str, outcomes: &[(bool, String)]) -> String {
    if outcomes.is_empty() {
        return "No files to write according to writer result.".to_string();
    }

    let successful = outcomes.iter().filter(|(ok, _)| *ok).count();
    let mut md = format!(
        "Writer executed {successful}/{} file operations successfully\n\n",
        outcomes.len()
    );

    if !summary.is_empty() {
        md.push_str(&format!("Summary: {summary}\n\n"));
    }

    let lines: Vec<String> = outcomes
        .iter()
        .map(|(ok, message)| {
            if *ok {
                format!("✅ {message}")
            } else {
                format!("❌ {message}")
            }
        })
        .collect();
    md + &lines.join("\n")
}

fn preview_content(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() > PREVIEW_LINES {
        let mut preview = lines[..PREVIEW_LINES].join("\n");
        preview.push_str("\n...");
        preview
    } else {
        content.to_string()
    }
}

/// Fence language tag inferred from the file extension. Unknown extensions
/// get an untagged fence.
fn language_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "rs" => "rust",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        _ => "",
    }
}
