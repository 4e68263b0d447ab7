//! Validated file mutations.
//!
//! One entry point, [`apply`]: path validation first, then the filesystem
//! change. Failures are values, never panics, so a batch caller can report
//! per-file status and keep going.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use patchsmith_contracts::{FileAction, FileOp};
use patchsmith_security::{PathGuard, SecurityError};

use crate::format;

/// Error applying a single file operation.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("File not found for deletion: {path}")]
    NotFoundForDeletion { path: String },

    #[error("File not found for modification: {path}")]
    NotFoundForModification { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Error writing file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A successfully applied operation.
///
/// `action` is the action actually performed, which differs from the
/// requested one when a `create` found an existing file and was downgraded
/// to `modify`.
#[derive(Debug)]
pub struct Applied {
    pub path: PathBuf,
    pub action: FileAction,
}

/// Apply one file operation inside the sandbox rooted at `root`.
///
/// - `delete` removes the file; a missing target is an error.
/// - `modify` requires the target to exist; content fully replaces it.
/// - `create` makes parent directories as needed; if the target already
///   exists the operation is reclassified as `modify` and overwrites it.
///
/// Content passes through [`format::normalize`] before any write.
pub fn apply(op: &FileOp, root: &Path, strict: bool) -> Result<Applied, MutationError> {
    let guard = PathGuard::new(root, strict);
    let target = guard.validate(&op.path)?;

    match op.action {
        FileAction::Delete => delete(&target, &op.path),
        FileAction::Create | FileAction::Modify => write(&target, op),
    }
}

fn delete(target: &Path, raw_path: &str) -> Result<Applied, MutationError> {
    if !target.exists() {
        return Err(MutationError::NotFoundForDeletion {
            path: raw_path.into(),
        });
    }
    fs::remove_file(target).map_err(|e| io_error(raw_path, e))?;
    tracing::debug!(path = raw_path, "deleted file");
    Ok(Applied {
        path: target.to_path_buf(),
        action: FileAction::Delete,
    })
}

fn write(target: &Path, op: &FileOp) -> Result<Applied, MutationError> {
    let exists = target.exists();

    if op.action == FileAction::Modify && !exists {
        return Err(MutationError::NotFoundForModification {
            path: op.path.clone(),
        });
    }

    // A create that finds an existing file becomes a modify.
    let effective = if op.action == FileAction::Create && exists {
        FileAction::Modify
    } else {
        op.action
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(&op.path, e))?;
    }

    let content = format::normalize(&op.content, target);
    fs::write(target, content).map_err(|e| io_error(&op.path, e))?;

    tracing::debug!(path = op.path, action = effective.as_str(), "wrote file");
    Ok(Applied {
        path: target.to_path_buf(),
        action: effective,
    })
}

fn io_error(path: &str, source: std::io::Error) -> MutationError {
    if source.kind() == ErrorKind::PermissionDenied {
        MutationError::PermissionDenied { path: path.into() }
    } else {
        MutationError::Io {
            path: path.into(),
            source,
        }
    }
}
