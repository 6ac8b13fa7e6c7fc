//! paramcheck-interchange: pipeline and trigger documents.
//!
//! Provides typed records for the two resource kinds the checker reads,
//! conversion from raw `serde_json::Value` documents into those records,
//! and the directory loader that walks `<root>/pipeline` and
//! `<root>/trigger`.

pub mod deserialize;
pub mod load;
pub mod types;

pub use deserialize::{parse_parameter_schema, parse_pipeline, parse_trigger, DefinitionError};
pub use load::{load_dir, FileError, LoadError, RejectedFile, Workspace};
pub use types::*;
