//! Path validation: work-directory sandboxing for model-directed writes.
//!
//! Relative paths are interpreted against the work directory. Resolution is
//! lexical-first (`.` and `..` are folded before any filesystem access) so a
//! traversal cannot escape via a target that does not exist yet; the deepest
//! existing ancestor is then canonicalized to resolve symlinks.

use std::path::{Component, Path, PathBuf};

/// Error returned when a target path is refused.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Path '{path}' is outside the work directory")]
    OutsideWorkDirectory { path: String },

    #[error("Path '{path}' targets protected system directory '{pattern}'")]
    SystemDirectoryDenied { path: String, pattern: String },

    #[error("Path '{path}' targets sensitive file pattern '{pattern}'")]
    SensitiveFileDenied { path: String, pattern: String },

    #[error("Failed to resolve path '{path}': {reason}")]
    ResolveFailed { path: String, reason: String },
}

/// Directory fragments that are never writable, in either security mode.
const SYSTEM_DIRS: [&str; 12] = [
    "/etc/",
    "/bin/",
    "/usr/bin/",
    "/sbin/",
    "/usr/sbin/",
    "c:\\windows\\",
    "c:\\program files",
    "/system/",
    "/library/",
    "/.ssh/",
    "/.aws/",
    "/.config/",
];

/// Filename fragments that indicate credentials or host configuration.
const SENSITIVE_FILES: [&str; 10] = [
    ".env",
    ".secret",
    ".key",
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    "passwd",
    "shadow",
    "hosts",
];

/// Validates target paths against a work-directory sandbox.
///
/// In strict mode (the default) the resolved target must sit inside the work
/// directory. Relaxed mode drops the containment check only; the system
/// directory and sensitive filename denylists apply in both modes.
#[derive(Debug, Clone)]
pub struct PathGuard {
    work_dir: PathBuf,
    strict: bool,
}

impl PathGuard {
    pub fn new(work_dir: impl Into<PathBuf>, strict: bool) -> Self {
        Self {
            work_dir: work_dir.into(),
            strict,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Validate `raw` and return the resolved absolute target path.
    ///
    /// Check order: containment (strict mode only), then system directories,
    /// then sensitive filenames. The first failing check wins, so a strict
    /// mode caller sees `OutsideWorkDirectory` for `/etc/passwd` rather than
    /// the denylist error.
    pub fn validate(&self, raw: &str) -> Result<PathBuf, SecurityError> {
        let resolved = self.resolve(raw)?;

        let normalized = resolved.to_string_lossy().replace('\\', "/").to_lowercase();

        if self.strict {
            let root = self.resolved_root(raw)?;
            if !resolved.starts_with(&root) {
                tracing::warn!(path = raw, "blocked: outside work directory");
                return Err(SecurityError::OutsideWorkDirectory { path: raw.into() });
            }
        }

        for pattern in SYSTEM_DIRS {
            if normalized.contains(pattern) {
                tracing::warn!(path = raw, pattern, "blocked: system directory");
                return Err(SecurityError::SystemDirectoryDenied {
                    path: raw.into(),
                    pattern: pattern.into(),
                });
            }
        }

        let file_name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        for pattern in SENSITIVE_FILES {
            if file_name.contains(pattern) {
                tracing::warn!(path = raw, pattern, "blocked: sensitive filename");
                return Err(SecurityError::SensitiveFileDenied {
                    path: raw.into(),
                    pattern: pattern.into(),
                });
            }
        }

        Ok(resolved)
    }

    /// Resolve `raw` to an absolute path without requiring it to exist.
    ///
    /// `.` and `..` are folded lexically, then the deepest existing ancestor
    /// is canonicalized and the non-existing remainder re-appended.
    fn resolve(&self, raw: &str) -> Result<PathBuf, SecurityError> {
        let input = Path::new(raw);
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.work_dir.join(input)
        };

        let lexical = fold_dot_components(&joined);
        canonicalize_existing_prefix(&lexical).map_err(|e| SecurityError::ResolveFailed {
            path: raw.into(),
            reason: e.to_string(),
        })
    }

    /// The work-directory root in the same resolved form as targets, so the
    /// containment comparison is not defeated by a symlinked root.
    fn resolved_root(&self, raw: &str) -> Result<PathBuf, SecurityError> {
        let lexical = fold_dot_components(&self.work_dir);
        canonicalize_existing_prefix(&lexical).map_err(|e| SecurityError::ResolveFailed {
            path: raw.into(),
            reason: format!("work directory: {e}"),
        })
    }
}

/// Fold `.` and `..` components lexically. `..` at the root stays at the
/// root, matching how the OS resolves `/..`.
fn fold_dot_components(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the
/// components below it. The result is absolute when `path` is.
fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut remainder = Vec::new();

    loop {
        if existing.exists() {
            let mut resolved = existing.canonicalize()?;
            for part in remainder.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                remainder.push(name.to_os_string());
                existing = parent;
            }
            // No existing ancestor at all; keep the lexical form.
            _ => return Ok(path.to_path_buf()),
        }
    }
}
