//! Foundry CI project-configuration compiler.
//!
//! Turns a user-authored YAML project document into the fully-expanded
//! [`Project`] model the scheduler consumes. Compilation is a straight
//! two-phase pipeline:
//!
//! 1. The surface decoder reads the YAML into an intermediate project,
//!    accepting the polymorphic shapes users write (a bare string where a
//!    list is expected, a single selector where an object is expected).
//! 2. The matrix engine expands matrix stubs into synthesized variants,
//!    and the translator evaluates every tag selector, dependency, and
//!    requirement down to literal names.
//!
//! The pipeline is synchronous, pure, and deterministic: bytes in, project
//! plus error list out. Non-fatal errors accumulate so a single bad
//! selector does not mask the rest of the report; only a YAML syntax error
//! aborts compilation outright.

mod matrix;
mod parser;
mod selector;
mod translate;

use tracing::debug;

pub use foundry_core::error::{CompileError, ErrorCategory, ErrorCollector};
pub use foundry_core::project::{
    BuildVariant, BuildVariantTask, Project, ProjectTask, TaskDependency, TaskRequirement,
};

/// Compile raw configuration bytes into a project.
///
/// The identifier is stamped onto the result. Returns `None` alongside the
/// errors when the document could not be decoded at all; otherwise returns
/// a (possibly partial) project plus every evaluation error. Callers that
/// want an all-or-nothing answer should use [`load_project`].
pub fn compile(data: &[u8], identifier: &str) -> (Option<Project>, Vec<CompileError>) {
    let mut pp = match parser::create_intermediate_project(data) {
        Ok(pp) => pp,
        Err(errors) => return (None, errors),
    };
    debug!(
        tasks = pp.tasks.len(),
        variants = pp.build_variants.len(),
        matrices = pp.matrices.len(),
        "decoded intermediate project"
    );
    let (mut project, errors) = translate::translate_project(&mut pp);
    project.identifier = identifier.to_string();
    debug!(
        tasks = project.tasks.len(),
        variants = project.build_variants.len(),
        errors = errors.len(),
        "translated project"
    );
    (Some(project), errors)
}

/// Compile strictly: any error rejects the document.
pub fn load_project(data: &[u8], identifier: &str) -> Result<Project, CompileError> {
    let (project, errors) = compile(data, identifier);
    if !errors.is_empty() {
        let mut collector = ErrorCollector::new();
        collector.extend(errors);
        return Err(CompileError::Validation {
            context: "loading project config".to_string(),
            message: collector.joined(),
        });
    }
    match project {
        Some(project) => Ok(project),
        None => Err(CompileError::Validation {
            context: "loading project config".to_string(),
            message: "no project was produced".to_string(),
        }),
    }
}
