//! Sandboxed file mutations.
//!
//! [`mutator::apply`] takes one validated file operation through the path
//! guard and onto disk; [`format`] holds the best-effort content cleanup
//! applied before any write.

pub mod format;
pub mod mutator;

pub use mutator::{apply, Applied, MutationError};
