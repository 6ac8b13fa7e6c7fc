//! Typed records for pipeline and trigger documents.
//!
//! Only the fields the parameter checker needs are lifted into typed
//! structs. Type-specific activity properties and trigger bodies are kept
//! as `serde_json::Value` so the analyzer can read them without forcing
//! every activity kind into a Rust type.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Activity type marker for an "execute sub-pipeline" step.
pub const EXECUTE_PIPELINE: &str = "ExecutePipeline";

/// Prefix shared by every Data Factory resource type.
pub const RESOURCE_TYPE_PREFIX: &str = "Microsoft.DataFactory/";

/// Resource type carried by pipeline documents exported from a factory.
pub const PIPELINE_RESOURCE_TYPE: &str = "Microsoft.DataFactory/factories/pipelines";

/// Resource type carried by trigger documents exported from a factory.
pub const TRIGGER_RESOURCE_TYPE: &str = "Microsoft.DataFactory/factories/triggers";

/// Parameter name -> supplied value at one call, in document order.
pub type Arguments = IndexMap<String, Value>;

/// The two kinds of resource documents the checker reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pipeline,
    Trigger,
}

impl ResourceKind {
    /// Subdirectory of the project root holding documents of this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::Pipeline => "pipeline",
            ResourceKind::Trigger => "trigger",
        }
    }

    /// The `type` value an enveloped document of this kind must carry.
    pub fn resource_type(self) -> &'static str {
        match self {
            ResourceKind::Pipeline => PIPELINE_RESOURCE_TYPE,
            ResourceKind::Trigger => TRIGGER_RESOURCE_TYPE,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ── Parameters ──────────────────────────────────────────────────────

/// One declared pipeline parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    /// Declared ADF type (`String`, `Int`, `Array`, ...). Informational only.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    /// `defaultValue`, if the declaration has one. An explicit `null`
    /// default is still a default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required() -> Self {
        ParameterSpec {
            param_type: None,
            default: None,
        }
    }

    pub fn with_default(default: Value) -> Self {
        ParameterSpec {
            param_type: None,
            default: Some(default),
        }
    }

    /// A parameter with no default must be supplied by every caller.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declared parameters of a pipeline, in declaration order.
///
/// Names are exact, case-sensitive strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSchema {
    params: IndexMap<String, ParameterSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: ParameterSpec) {
        self.params.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterSpec)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of parameters without a default, in declaration order.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, spec)| spec.is_required())
            .map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ParameterSpec)> for ParameterSchema {
    fn from_iter<I: IntoIterator<Item = (S, ParameterSpec)>>(iter: I) -> Self {
        ParameterSchema {
            params: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ── Activities ──────────────────────────────────────────────────────

/// One step of a pipeline. Container activities own their nested steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Raw `typeProperties` object, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_properties: Option<Value>,
    /// Nested activities gathered from every container field
    /// (ForEach/Until bodies, If branches, Switch cases), in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Activity>,
}

impl Activity {
    pub fn is_execute_pipeline(&self) -> bool {
        self.activity_type == EXECUTE_PIPELINE
    }

    /// Look up a field inside `typeProperties`.
    pub fn type_property(&self, field: &str) -> Option<&Value> {
        self.type_properties.as_ref().and_then(|tp| tp.get(field))
    }
}

// ── Resources ───────────────────────────────────────────────────────

/// A pipeline document after structural validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub name: String,
    pub parameters: ParameterSchema,
    pub activities: Vec<Activity>,
    /// File the pipeline was loaded from, when it came from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

/// A trigger document. The body is kept raw; pipeline references are
/// read from it by the invocation extractor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub name: String,
    /// The `properties` object of an enveloped document, or the document
    /// itself when it has no envelope.
    pub definition: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}
