//! Schema registry: every loaded pipeline, indexed by name.
//!
//! Built once from the loaded documents and then only read. A second
//! pipeline with an existing name replaces the first (last load wins) and
//! leaves a `DuplicatePipeline` diagnostic behind.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use indexmap::IndexMap;
use paramcheck_interchange::{parse_pipeline, DefinitionError, ParameterSchema, Pipeline};

/// Errors from registering a raw pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("malformed definition for pipeline '{pipeline}': {source}")]
    MalformedDefinition {
        pipeline: String,
        #[source]
        source: DefinitionError,
    },
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Keyed by pipeline name. Iteration follows first registration;
    /// the stored value is the latest registration.
    pipelines: IndexMap<String, Pipeline>,
    diagnostics: Vec<Diagnostic>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from pipelines in discovery order.
    pub fn from_pipelines<I: IntoIterator<Item = Pipeline>>(pipelines: I) -> Self {
        let mut registry = Self::new();
        for pipeline in pipelines {
            registry.insert(pipeline);
        }
        registry
    }

    /// Register a raw pipeline document under `name` and return its schema.
    ///
    /// The document's own `name` field is ignored in favour of `name`.
    pub fn register(
        &mut self,
        name: &str,
        raw: &serde_json::Value,
    ) -> Result<ParameterSchema, RegistryError> {
        let mut pipeline =
            parse_pipeline(raw, name).map_err(|source| RegistryError::MalformedDefinition {
                pipeline: name.to_string(),
                source,
            })?;
        pipeline.name = name.to_string();
        Ok(self.insert(pipeline).clone())
    }

    /// Insert an already-parsed pipeline and return its schema.
    pub fn insert(&mut self, pipeline: Pipeline) -> &ParameterSchema {
        let name = pipeline.name.clone();
        let source = pipeline.source.clone();
        if let Some(previous) = self.pipelines.insert(name.clone(), pipeline) {
            let message = match (&previous.source, &source) {
                (Some(old), Some(new)) => format!(
                    "Duplicate pipeline '{}': '{}' replaces '{}'",
                    name,
                    new.display(),
                    old.display()
                ),
                _ => format!("Duplicate pipeline '{}': later definition wins", name),
            };
            tracing::debug!(pipeline = %name, "duplicate pipeline name");
            self.diagnostics.push(
                Diagnostic::new(DiagnosticKind::DuplicatePipeline, message)
                    .with_owner(name.clone())
                    .with_path(source),
            );
        }
        &self.pipelines[&name].parameters
    }

    /// Schema of the named pipeline. Names match exactly.
    pub fn get(&self, name: &str) -> Option<&ParameterSchema> {
        self.pipelines.get(name).map(|p| &p.parameters)
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    /// Registered pipelines, in order of first registration.
    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Move the accumulated diagnostics out of the registry.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
