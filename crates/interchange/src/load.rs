//! Directory loader for `<root>/pipeline/*.json` and `<root>/trigger/*.json`.
//!
//! Only a missing root or subdirectory is fatal. A file that cannot be
//! read, parsed or converted is recorded as a [`RejectedFile`] and loading
//! continues with the next file.

use crate::deserialize::{parse_pipeline, parse_trigger, DefinitionError};
use crate::types::{Pipeline, ResourceKind, Trigger};
use std::path::{Path, PathBuf};

/// Fatal loader errors. Any of these aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The project root or one of its required subdirectories is absent.
    #[error("{role} directory '{}' does not exist", .path.display())]
    DirectoryNotFound { role: &'static str, path: PathBuf },
    /// The directory exists but its entries could not be listed.
    #[error("cannot list directory '{}': {source}", .path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single file was skipped.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("cannot read file: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// A file that was found but not loaded.
#[derive(Debug)]
pub struct RejectedFile {
    pub kind: ResourceKind,
    pub path: PathBuf,
    pub error: FileError,
}

/// Everything loaded from one project root, in file discovery order.
#[derive(Debug, Default)]
pub struct Workspace {
    pub pipelines: Vec<Pipeline>,
    pub triggers: Vec<Trigger>,
    pub rejected: Vec<RejectedFile>,
}

/// Load every pipeline and trigger document under `root`.
///
/// Both subdirectories are checked before any file is read, so a missing
/// directory fails the run without partial results. Pipelines are loaded
/// before triggers.
pub fn load_dir(root: &Path) -> Result<Workspace, LoadError> {
    require_dir("root", root)?;
    let pipeline_dir = root.join(ResourceKind::Pipeline.dir_name());
    let trigger_dir = root.join(ResourceKind::Trigger.dir_name());
    require_dir("pipeline", &pipeline_dir)?;
    require_dir("trigger", &trigger_dir)?;

    let mut workspace = Workspace::default();

    for path in json_files(&pipeline_dir, ResourceKind::Pipeline, &mut workspace.rejected)? {
        match load_file(&path, parse_pipeline) {
            Ok(mut pipeline) => {
                tracing::debug!(path = %path.display(), name = %pipeline.name, "loaded pipeline");
                pipeline.source = Some(path);
                workspace.pipelines.push(pipeline);
            }
            Err(error) => workspace.rejected.push(RejectedFile {
                kind: ResourceKind::Pipeline,
                path,
                error,
            }),
        }
    }

    for path in json_files(&trigger_dir, ResourceKind::Trigger, &mut workspace.rejected)? {
        match load_file(&path, parse_trigger) {
            Ok(mut trigger) => {
                tracing::debug!(path = %path.display(), name = %trigger.name, "loaded trigger");
                trigger.source = Some(path);
                workspace.triggers.push(trigger);
            }
            Err(error) => workspace.rejected.push(RejectedFile {
                kind: ResourceKind::Trigger,
                path,
                error,
            }),
        }
    }

    Ok(workspace)
}

fn require_dir(role: &'static str, path: &Path) -> Result<(), LoadError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(LoadError::DirectoryNotFound {
            role,
            path: path.to_path_buf(),
        })
    }
}

/// `*.json` regular files in `dir`, in the order the filesystem lists them.
/// Entries that cannot be read are recorded in `rejected` against `dir`.
fn json_files(
    dir: &Path,
    kind: ResourceKind,
    rejected: &mut Vec<RejectedFile>,
) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(select_json(
        dir,
        kind,
        entries.map(|entry| entry.map(|e| e.path())),
        rejected,
    ))
}

fn select_json(
    dir: &Path,
    kind: ResourceKind,
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
    rejected: &mut Vec<RejectedFile>,
) -> Vec<PathBuf> {
    let mut results = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                    results.push(path);
                }
            }
            Err(e) => rejected.push(RejectedFile {
                kind,
                path: dir.to_path_buf(),
                error: FileError::Read(e),
            }),
        }
    }
    results
}

/// Read one file completely, parse it, and convert it with `parse`.
fn load_file<T>(
    path: &Path,
    parse: fn(&serde_json::Value, &str) -> Result<T, DefinitionError>,
) -> Result<T, FileError> {
    let src = std::fs::read_to_string(path)?;
    let doc: serde_json::Value = serde_json::from_str(&src)?;
    Ok(parse(&doc, &stem(path))?)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
