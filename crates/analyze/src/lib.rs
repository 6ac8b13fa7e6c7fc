//! paramcheck-analyze -- parameter-passing checks for pipelines and triggers.
//!
//! The analyzer consumes typed documents from `paramcheck-interchange`.
//! A run registers every pipeline schema, extracts every invocation site
//! (ExecutePipeline activities at any depth, trigger pipeline references),
//! resolves each site against the callee's schema and builds an ordered
//! [`Report`]. Recovered anomalies travel separately as [`Diagnostic`]s.

pub mod diagnostic;
pub mod extract;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod run;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use extract::{
    extract_invocations, extract_invocations_checked, extract_trigger_invocation,
    extract_trigger_invocations, ExtractError, InvocationSite,
};
pub use registry::{RegistryError, SchemaRegistry};
pub use report::{build, IssueKind, Report, SiteFinding, ValidationIssue};
pub use resolve::{json_equal, resolve, Resolution};
pub use run::{validate, validate_dir, Phase, Run, Summary, Validation};
