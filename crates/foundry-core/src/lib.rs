//! Foundry CI Core
//!
//! Shared vocabulary for the Foundry configuration compiler and its
//! consumers: the fully-expanded project model, error types, and the
//! `${name}` expansion engine. This crate has minimal dependencies and
//! no I/O.

pub mod error;
pub mod expansion;
pub mod project;

pub use error::{CompileError, ErrorCategory, ErrorCollector};
pub use expansion::Expansions;
pub use project::Project;
