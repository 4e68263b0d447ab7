//! Stage contracts: the fixed JSON shapes the Planning and Writing stages
//! must produce, the structural validators that accept or reject a decoded
//! value, and the heuristic that recovers a JSON payload from free-form
//! model output.
//!
//! Validation is strict: a missing key or a wrong-typed field rejects the
//! whole value. No partial acceptance, no coercion; the caller's only
//! recovery is to ask the model again.

pub mod extract;
pub mod model;
pub mod validate;

pub use extract::extract_json;
pub use model::{FileAction, FileOp, PlanResult, WriteResult};
pub use validate::{is_plan_result, is_write_result};
