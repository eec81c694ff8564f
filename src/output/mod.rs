//! Output formatting.
//!
//! - [`summary`]: report lines shown to the operator on stdout
//! - [`script`]: deferred-action scripts (`--bat`)

pub mod script;
pub mod summary;

pub use script::{ScriptEntry, ScriptType, ScriptWriter};
