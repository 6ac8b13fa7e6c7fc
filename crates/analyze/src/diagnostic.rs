//! Side-channel diagnostics for recovered anomalies.
//!
//! Diagnostics never appear in the issue report. The CLI logs each one as
//! a warning; `--output json` also serializes them next to the report.

use paramcheck_interchange::{DefinitionError, FileError, RejectedFile, ResourceKind};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A pipeline file, or an activity inside one, is structurally invalid.
    MalformedDefinition,
    /// A trigger file is invalid or has no pipeline reference.
    MalformedTrigger,
    /// A file in a resource directory is some other kind of resource.
    UnexpectedResourceType,
    /// Two pipeline files declare the same name; the later one wins.
    DuplicatePipeline,
    /// Two trigger files declare the same name; the later one wins.
    DuplicateTrigger,
    /// An invocation names a pipeline that was never loaded.
    UnresolvableTarget,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One recovered anomaly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Resource the anomaly belongs to, when it is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            owner: None,
            path: None,
            message: message.into(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }

    /// Diagnostic for a file the loader skipped.
    pub fn from_rejected(file: &RejectedFile) -> Self {
        let kind = match (&file.error, file.kind) {
            (FileError::Definition(DefinitionError::UnexpectedType { .. }), _) => {
                DiagnosticKind::UnexpectedResourceType
            }
            (_, ResourceKind::Pipeline) => DiagnosticKind::MalformedDefinition,
            (_, ResourceKind::Trigger) => DiagnosticKind::MalformedTrigger,
        };
        let file_name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let message = match kind {
            DiagnosticKind::UnexpectedResourceType => {
                format!("Unexpected non-{} file '{}': {}", file.kind, file_name, file.error)
            }
            _ => format!("Skipping {} file '{}': {}", file.kind, file_name, file.error),
        };
        Diagnostic::new(kind, message).with_path(Some(file.path.clone()))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
