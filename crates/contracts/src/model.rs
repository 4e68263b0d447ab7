//! Contract data model: the types a stage's accepted JSON deserializes into.
//!
//! These structs are only deserialized *after* the shape predicates in
//! [`crate::validate`] have accepted the value, so `from_value` cannot fail
//! on validated input.

use serde::{Deserialize, Serialize};

/// The Planning stage's contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    /// Free-form rationale. May be empty, but must be a string.
    pub analysis: String,

    /// Paths to read before writing. Absolute or workspace-relative.
    pub files_to_read: Vec<String>,

    /// Paths the Writer is expected to create.
    pub files_to_create: Vec<String>,

    /// Paths the Writer is expected to modify.
    pub files_to_modify: Vec<String>,

    /// Package/library names the change depends on.
    pub dependencies_required: Vec<String>,
}

/// The Writing stage's contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResult {
    /// Human-readable summary of the change.
    pub summary: String,

    /// File operations, applied in list order.
    pub files: Vec<FileOp>,
}

/// One create/modify/delete instruction targeting a single path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOp {
    pub path: String,
    pub action: FileAction,
    /// New file content. Ignored for `delete`.
    pub content: String,
}

/// Closed action enumeration; any other value is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Create,
    Modify,
    Delete,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Create => "create",
            FileAction::Modify => "modify",
            FileAction::Delete => "delete",
        }
    }

    /// Past-tense label for result reporting ("created", "modified", ...).
    pub fn past_tense(&self) -> &'static str {
        match self {
            FileAction::Create => "created",
            FileAction::Modify => "modified",
            FileAction::Delete => "deleted",
        }
    }
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_result_round_trip() {
        let json = serde_json::json!({
            "analysis": "add a greeting module",
            "files_to_read": ["src/main.rs"],
            "files_to_create": ["src/greet.rs"],
            "files_to_modify": ["src/main.rs"],
            "dependencies_required": []
        });
        let plan: PlanResult = serde_json::from_value(json).unwrap();
        assert_eq!(plan.files_to_create, vec!["src/greet.rs"]);
        assert_eq!(plan.files_to_read.len(), 1);
        assert!(plan.dependencies_required.is_empty());
    }

    #[test]
    fn file_action_lowercase_wire_format() {
        let op: FileOp = serde_json::from_value(serde_json::json!({
            "path": "a.txt",
            "action": "delete",
            "content": ""
        }))
        .unwrap();
        assert_eq!(op.action, FileAction::Delete);
        assert_eq!(serde_json::to_value(op.action).unwrap(), "delete");
    }

    #[test]
    fn unknown_action_fails_deserialization() {
        let result: Result<FileOp, _> = serde_json::from_value(serde_json::json!({
            "path": "a.txt",
            "action": "archive",
            "content": ""
        }));
        assert!(result.is_err());
    }

    #[test]
    fn action_labels() {
        assert_eq!(FileAction::Create.as_str(), "create");
        assert_eq!(FileAction::Modify.past_tense(), "modified");
        assert_eq!(FileAction::Delete.to_string(), "delete");
    }
}
