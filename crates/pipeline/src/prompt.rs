//! Stage prompt assembly.
//!
//! Every agent prompt starts from the same system preamble, then appends
//! the stage's instructions and context. The Planning prompt carries the
//! workspace directory tree so the model plans against real paths; the
//! Writing prompt carries the accepted plan plus the planned files'
//! contents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use patchsmith_contracts::PlanResult;

const SYSTEM_PREAMBLE: &str = r#"# Your Role
You are an interactive Code Assistant specializing in multi-agent software engineering workflows. Your primary goal is to help users efficiently and safely through a structured pipeline: **Planner -> Reader -> Writer**.

## Core Mandates

- **Agent Coordination**: Execute each agent role sequentially, passing context between agents
- **Conventions**: Rigorously adhere to existing project conventions when reading or modifying code
- **Libraries/Frameworks**: NEVER assume availability - verify through package.json, Cargo.toml, requirements.txt, etc.
- **Style & Structure**: Mimic existing code patterns, formatting, naming, and architectural choices
- **Path Construction**: Always use absolute paths for file operations
- **Concise Communication**: Adopt CLI-style direct, concise responses
- **Security First**: Never touch secrets, keys, or system files
"#;

const PLANNING_INSTRUCTIONS: &str = r#"
## Planning

Analyze the provided workspace and directory structure to create an execution plan for the user's request.

**Key Planning Tasks:**
1. Identify files to read for context
2. Determine files to create or modify
3. Check for required dependencies

**Planning Rules:**
- Read existing files before making changes
- Use absolute paths only
- Maintain project conventions
- Verify dependencies exist

**CRITICAL: JSON FORMAT REQUIREMENTS**
- You MUST respond with ONLY valid JSON
- No markdown code blocks, no additional text before or after the JSON
- Use double quotes for all strings

**Output Format:**

{
    "analysis": "Brief workspace analysis",
    "files_to_read": ["/absolute/path/to/file.ext"],
    "files_to_create": ["/absolute/path/to/new_file.ext"],
    "files_to_modify": ["/absolute/path/to/existing_file.ext"],
    "dependencies_required": ["package-name"]
}

**IMPORTANT REMINDERS:**
- Start your response directly with { and end it with }
- No extra text, no markdown, no explanations
"#;

const WRITING_INSTRUCTIONS: &str = r#"
## Writer
Generate code based on the planning output and file context. Write code that seamlessly integrates with the existing codebase.

**Writing Tasks:**
1. Follow existing code patterns and conventions
2. Maintain consistent styling and naming
3. Preserve architectural decisions
4. Handle edge cases and error conditions

**CRITICAL: JSON FORMAT REQUIREMENTS**
- You MUST respond with ONLY valid JSON
- No markdown code blocks, no additional text before or after the JSON

**CRITICAL: FILE CONTENT FORMATTING RULES**
When writing file content in the JSON "content" field:
- Newlines: use \n (no actual line breaks inside JSON strings)
- Double quotes: use \"
- Backslashes: use \\
- Tabs: use \t
- Content must be one continuous JSON string

**Output Format:**

{
    "files": [
        {
            "path": "/absolute/path/to/file.ext",
            "action": "create|modify|delete",
            "content": "properly escaped file content with \n for newlines"
        }
    ],
    "summary": "concise description of what was implemented"
}

**IMPORTANT REMINDERS:**
- Start your response directly with { and end it with }
- File content MUST be properly escaped as a single JSON string
"#;

const ASK_PREAMBLE: &str = r#"# Your Role
You are a helpful coding assistant. Answer the user's question directly, in the language the user writes in, using Markdown for structure where it improves readability. Be clear, accurate, and practical; keep the response proportionate to the question.
"#;

/// The single round-trip prompt for ask mode.
pub fn ask_prompt(request: &str) -> String {
    format!("{ASK_PREAMBLE}\nUser Input: {request}\n")
}

/// The Planning stage prompt: preamble, instructions, and the workspace
/// directory tree.
pub fn planning_prompt(request: &str, work_dir: &Path) -> String {
    format!(
        "{SYSTEM_PREAMBLE}\nUser Input: {request}\n{PLANNING_INSTRUCTIONS}\nWORK SPACE : {}\nDIRECTORY STRUCTURE:\n{}\n",
        work_dir.display(),
        directory_tree(work_dir),
    )
}

/// The Writing stage prompt: preamble, instructions, the accepted plan's
/// file lists, and the planned files' contents.
pub fn writing_prompt(request: &str, plan: &PlanResult, file_contents: &str) -> String {
    format!(
        "{SYSTEM_PREAMBLE}\nUser Input: {request}\n{WRITING_INSTRUCTIONS}\n\
PLANNING CONTEXT:\nFiles to modify: {:?}\nFiles to create: {:?}\n\n\
IMPORTANT: Only modify or create the files specified in the planning phase. Do not modify any other files.\n\n\
{file_contents}\n\n\
Please generate code that follows the existing patterns and conventions shown in the files above.\n",
        plan.files_to_modify, plan.files_to_create,
    )
}

/// Render the workspace as an indented tree, honoring `.gitignore` and
/// skipping hidden entries.
pub fn directory_tree(root: &Path) -> String {
    // One walk, then group entries under their parent so siblings can be
    // rendered with the right connectors.
    let mut children: BTreeMap<PathBuf, Vec<TreeEntry>> = BTreeMap::new();

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .sort_by_file_name(std::cmp::Ord::cmp)
        .build();

    for entry in walker.flatten() {
        if entry.depth() == 0 {
            continue;
        }
        let Some(parent) = entry.path().parent() else {
            continue;
        };
        children.entry(parent.to_path_buf()).or_default().push(TreeEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().to_path_buf(),
            is_dir: entry.file_type().is_some_and(|t| t.is_dir()),
        });
    }

    let mut lines = Vec::new();
    render_level(root, "", &children, &mut lines);
    lines.join("\n")
}

struct TreeEntry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

fn render_level(
    dir: &Path,
    prefix: &str,
    children: &BTreeMap<PathBuf, Vec<TreeEntry>>,
    lines: &mut Vec<String>,
) {
    let Some(entries) = children.get(dir) else {
        return;
    };

    for (i, entry) in entries.iter().enumerate() {
        let is_last = i + 1 == entries.len();
        let connector = if is_last { "└── " } else { "├── " };

        if entry.is_dir {
            lines.push(format!("{prefix}{connector}{}/", entry.name));
            let next_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            render_level(&entry.path, &next_prefix, children, lines);
        } else {
            lines.push(format!("{prefix}{connector}{}", entry.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn tree_lists_files_and_directories() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("src")).unwrap();
        fs::write(root.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.path().join("README.md"), "# hi").unwrap();

        let tree = directory_tree(root.path());
        assert!(tree.contains("src/"));
        assert!(tree.contains("main.rs"));
        assert!(tree.contains("README.md"));
    }

    #[test]
    fn tree_skips_gitignored_entries() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".gitignore"), "ignored.txt\n").unwrap();
        fs::write(root.path().join("ignored.txt"), "x").unwrap();
        fs::write(root.path().join("kept.txt"), "x").unwrap();

        let tree = directory_tree(root.path());
        assert!(!tree.contains("ignored.txt"));
        assert!(tree.contains("kept.txt"));
    }

    #[test]
    fn tree_skips_hidden_entries() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join(".git")).unwrap();
        fs::write(root.path().join(".git/config"), "x").unwrap();
        fs::write(root.path().join("visible.txt"), "x").unwrap();

        let tree = directory_tree(root.path());
        assert!(!tree.contains(".git"));
        assert!(tree.contains("visible.txt"));
    }

    #[test]
    fn planning_prompt_embeds_workspace_and_request() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("lib.rs"), "").unwrap();

        let prompt = planning_prompt("add a greeting", root.path());
        assert!(prompt.contains("add a greeting"));
        assert!(prompt.contains("WORK SPACE"));
        assert!(prompt.contains("lib.rs"));
        assert!(prompt.contains("files_to_read"));
    }

    #[test]
    fn writing_prompt_embeds_plan_and_contents() {
        let plan = PlanResult {
            analysis: "x".into(),
            files_to_read: vec!["a.rs".into()],
            files_to_create: vec!["b.rs".into()],
            files_to_modify: vec!["a.rs".into()],
            dependencies_required: vec![],
        };
        let prompt = writing_prompt("do it", &plan, "a.rs:\nfn a() {}");
        assert!(prompt.contains("do it"));
        assert!(prompt.contains("\"b.rs\""));
        assert!(prompt.contains("fn a() {}"));
        assert!(prompt.contains("Only modify or create the files specified"));
    }

    #[test]
    fn ask_prompt_is_free_of_stage_instructions() {
        let prompt = ask_prompt("what is a trait?");
        assert!(prompt.contains("what is a trait?"));
        assert!(!prompt.contains("files_to_read"));
        assert!(!prompt.contains("Planner"));
    }
}
