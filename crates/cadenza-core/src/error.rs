//! Definition-level error types shared by the loader, validator, and builder.

use std::fmt;

use thiserror::Error;

/// A single well-formedness violation found in a scenario definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path of the offending property, e.g. `stages[2].userPrompts`.
    pub property_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl ValidationIssue {
    /// Create a new validation issue
    pub fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property_path, self.message)
    }
}

fn format_invalid(name: &str, issues: &[ValidationIssue]) -> String {
    let summary = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("invalid scenario definition '{}': {}", name, summary)
}

/// Errors raised while loading or lowering scenario definitions
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read scenario file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("unsupported scenario file extension: {path}")]
    UnsupportedExtension { path: String },

    #[error("{}", format_invalid(.name, .issues))]
    Invalid {
        name: String,
        issues: Vec<ValidationIssue>,
    },
}
