//! Filesystem sandboxing for model-directed file operations.
//!
//! Every path the model asks to touch goes through [`PathGuard::validate`]
//! before any filesystem call. The guard confines targets to the
//! work-directory root and denies well-known system locations and
//! credential-bearing filenames regardless of containment.

pub mod path;

pub use path::{PathGuard, SecurityError};
