//! Error types for the Foundry configuration compiler.
//!
//! A YAML syntax error is terminal; every other error is accumulated in an
//! [`ErrorCollector`] so one bad selector or matrix cell does not hide the
//! rest of the report.

use thiserror::Error;

/// Category tag carried by every compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Yaml,
    Shape,
    Selector,
    Matrix,
    Conflict,
    Validation,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// The document is not valid YAML. Terminal for the whole pipeline.
    #[error("invalid YAML: {message}")]
    Yaml { message: String },

    /// A field did not match any accepted surface shape.
    #[error("{context}: {message}")]
    Shape { context: String, message: String },

    /// A selector is empty, malformed, or matched nothing.
    #[error("evaluating selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// A matrix referenced unknown axes or values, or failed to expand.
    #[error("{context}: {message}")]
    Matrix { context: String, message: String },

    /// The same (variant, name) pair was defined twice with different fields.
    #[error("{context}: conflicting definitions of '{name}': {message}")]
    Conflict {
        context: String,
        name: String,
        message: String,
    },

    /// A structural rule was violated (mutually exclusive fields, etc.).
    #[error("{context}: {message}")]
    Validation { context: String, message: String },
}

impl CompileError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompileError::Yaml { .. } => ErrorCategory::Yaml,
            CompileError::Shape { .. } => ErrorCategory::Shape,
            CompileError::Selector { .. } => ErrorCategory::Selector,
            CompileError::Matrix { .. } => ErrorCategory::Matrix,
            CompileError::Conflict { .. } => ErrorCategory::Conflict,
            CompileError::Validation { .. } => ErrorCategory::Validation,
        }
    }

    /// Whether this error aborts the pipeline on its own.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CompileError::Yaml { .. })
    }
}

/// Ordered collection of non-fatal errors gathered across the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    errors: Vec<CompileError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = CompileError>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn into_errors(self) -> Vec<CompileError> {
        self.errors
    }

    /// Join every collected message into a single diagnostic, one per line.
    pub fn joined(&self) -> String {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        messages.join("\n\t")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tags() {
        let e = CompileError::Selector {
            selector: ".tag".to_string(),
            message: "nothing has the tag 'tag'".to_string(),
        };
        assert_eq!(e.category(), ErrorCategory::Selector);
        assert!(!e.is_fatal());

        let y = CompileError::Yaml {
            message: "mapping values are not allowed".to_string(),
        };
        assert_eq!(y.category(), ErrorCategory::Yaml);
        assert!(y.is_fatal());
    }

    #[test]
    fn test_collector_preserves_order() {
        let mut collector = ErrorCollector::new();
        collector.push(CompileError::Shape {
            context: "tasks[0]".to_string(),
            message: "expected a string".to_string(),
        });
        collector.push(CompileError::Validation {
            context: "buildvariants[1]".to_string(),
            message: "cannot use both 'run_on' and 'distros' fields".to_string(),
        });
        assert_eq!(collector.len(), 2);
        let errors = collector.into_errors();
        assert_eq!(errors[0].category(), ErrorCategory::Shape);
        assert_eq!(errors[1].category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_joined_diagnostic() {
        let mut collector = ErrorCollector::new();
        collector.push(CompileError::Validation {
            context: "a".to_string(),
            message: "one".to_string(),
        });
        collector.push(CompileError::Validation {
            context: "b".to_string(),
            message: "two".to_string(),
        });
        assert_eq!(collector.joined(), "a: one\n\tb: two");
    }
}
