//! One validation run, driven through its phases.
//!
//! `Init -> Loading -> Extracting -> Resolving -> Reporting -> Done`.
//! `Failed` is reachable from `Loading` only, when the root or one of its
//! required subdirectories is missing. Every other anomaly becomes a
//! [`Diagnostic`] and the run continues.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::extract::{
    extract_invocations_checked, extract_trigger_invocations, ExtractError, InvocationSite,
};
use crate::registry::SchemaRegistry;
use crate::report::{build, Report, SiteFinding};
use crate::resolve::resolve;
use indexmap::IndexMap;
use paramcheck_interchange::{load_dir, LoadError, ResourceKind, Trigger, Workspace};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Init,
    Loading,
    Extracting,
    Resolving,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::Loading => "loading",
            Phase::Extracting => "extracting",
            Phase::Resolving => "resolving",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Counts of what a run looked at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub pipelines: usize,
    pub triggers: usize,
    pub sites: usize,
    pub resolved_sites: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub report: Report,
    /// Recovered anomalies, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

/// A site paired with the resource that contains it.
struct OwnedSite {
    owner: String,
    position: usize,
    site: InvocationSite,
}

#[derive(Debug)]
pub struct Run {
    phase: Phase,
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}

impl Run {
    pub fn new() -> Self {
        Run { phase: Phase::Init }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, next: Phase) {
        tracing::debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    /// Load `root` and validate it.
    pub fn execute(&mut self, root: &Path) -> Result<Validation, LoadError> {
        self.enter(Phase::Loading);
        let workspace = match load_dir(root) {
            Ok(workspace) => workspace,
            Err(e) => {
                self.enter(Phase::Failed);
                return Err(e);
            }
        };
        Ok(self.validate(workspace))
    }

    /// Validate documents that are already loaded.
    ///
    /// All pipelines are registered before any site is resolved, so a site
    /// may call a pipeline from a file discovered after its own.
    pub fn validate(&mut self, workspace: Workspace) -> Validation {
        if self.phase == Phase::Init {
            self.enter(Phase::Loading);
        }

        let mut diagnostics: Vec<Diagnostic> =
            workspace.rejected.iter().map(Diagnostic::from_rejected).collect();

        let mut registry = SchemaRegistry::from_pipelines(workspace.pipelines);
        diagnostics.extend(registry.take_diagnostics());
        let triggers = dedupe_triggers(workspace.triggers, &mut diagnostics);

        let mut summary = Summary {
            pipelines: registry.len(),
            triggers: triggers.len(),
            ..Summary::default()
        };

        self.enter(Phase::Extracting);
        let mut pipeline_sites = Vec::new();
        for pipeline in registry.pipelines() {
            for (position, checked) in extract_invocations_checked(pipeline).into_iter().enumerate() {
                match checked {
                    Ok(site) => pipeline_sites.push(OwnedSite {
                        owner: pipeline.name.clone(),
                        position,
                        site,
                    }),
                    Err(e) => diagnostics.push(extract_diagnostic(
                        &e,
                        &pipeline.name,
                        pipeline.source.clone(),
                    )),
                }
            }
        }

        let mut trigger_sites = Vec::new();
        for trigger in triggers.values() {
            match extract_trigger_invocations(trigger) {
                Ok(sites) => {
                    trigger_sites.extend(sites.into_iter().enumerate().map(|(position, site)| {
                        OwnedSite {
                            owner: trigger.name.clone(),
                            position,
                            site,
                        }
                    }))
                }
                Err(e) => diagnostics.push(extract_diagnostic(
                    &e,
                    &trigger.name,
                    trigger.source.clone(),
                )),
            }
        }
        summary.sites = pipeline_sites.len() + trigger_sites.len();

        self.enter(Phase::Resolving);
        let pipeline_findings = resolve_all(
            ResourceKind::Pipeline,
            &pipeline_sites,
            &registry,
            &mut diagnostics,
        );
        let trigger_findings = resolve_all(
            ResourceKind::Trigger,
            &trigger_sites,
            &registry,
            &mut diagnostics,
        );
        summary.resolved_sites = pipeline_findings.len() + trigger_findings.len();

        self.enter(Phase::Reporting);
        let report = build(&pipeline_findings, &trigger_findings);

        self.enter(Phase::Done);
        Validation {
            report,
            diagnostics,
            summary,
        }
    }
}

/// Load `root` and validate it in one call.
pub fn validate_dir(root: &Path) -> Result<Validation, LoadError> {
    Run::new().execute(root)
}

/// Validate already-loaded documents in one call.
pub fn validate(workspace: Workspace) -> Validation {
    Run::new().validate(workspace)
}

/// Last definition of each trigger name wins; its position stays where the
/// name was first seen.
fn dedupe_triggers(
    triggers: Vec<Trigger>,
    diagnostics: &mut Vec<Diagnostic>,
) -> IndexMap<String, Trigger> {
    let mut by_name: IndexMap<String, Trigger> = IndexMap::new();
    for trigger in triggers {
        let name = trigger.name.clone();
        let source = trigger.source.clone();
        if let Some(previous) = by_name.insert(name.clone(), trigger) {
            let message = match (&previous.source, &source) {
                (Some(old), Some(new)) => format!(
                    "Duplicate trigger '{}': '{}' replaces '{}'",
                    name,
                    new.display(),
                    old.display()
                ),
                _ => format!("Duplicate trigger '{}': later definition wins", name),
            };
            tracing::debug!(trigger = %name, "duplicate trigger name");
            diagnostics.push(
                Diagnostic::new(DiagnosticKind::DuplicateTrigger, message)
                    .with_owner(name)
                    .with_path(source),
            );
        }
    }
    by_name
}

fn resolve_all(
    owner_kind: ResourceKind,
    sites: &[OwnedSite],
    registry: &SchemaRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<SiteFinding> {
    let mut findings = Vec::with_capacity(sites.len());
    for OwnedSite {
        owner,
        position,
        site,
    } in sites
    {
        let Some(schema) = registry.get(&site.target) else {
            let message = match owner_kind {
                ResourceKind::Pipeline => format!(
                    "Child pipeline '{}' not found (activity '{}' in pipeline '{}')",
                    site.target, site.label, owner
                ),
                ResourceKind::Trigger => format!(
                    "Pipeline '{}' not found for trigger '{}'",
                    site.target, owner
                ),
            };
            diagnostics.push(
                Diagnostic::new(DiagnosticKind::UnresolvableTarget, message).with_owner(owner.clone()),
            );
            continue;
        };

        findings.push(SiteFinding {
            owner: owner.clone(),
            site: site.label.clone(),
            position: *position,
            target: site.target.clone(),
            resolution: resolve(site, schema),
        });
    }
    findings
}

fn extract_diagnostic(error: &ExtractError, owner: &str, path: Option<PathBuf>) -> Diagnostic {
    let kind = match error {
        ExtractError::MalformedActivity { .. } => DiagnosticKind::MalformedDefinition,
        ExtractError::MalformedTrigger { .. } => DiagnosticKind::MalformedTrigger,
    };
    let message = match error {
        ExtractError::MalformedActivity { .. } => {
            format!("Skipping invocation in pipeline '{}': {}", owner, error)
        }
        ExtractError::MalformedTrigger { .. } => format!("Skipping {}", error),
    };
    Diagnostic::new(kind, message)
        .with_owner(owner)
        .with_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::IssueKind;
    use paramcheck_interchange::{parse_pipeline, parse_trigger, Pipeline};
    use serde_json::{json, Value};

    fn pipeline(doc: Value) -> Pipeline {
        parse_pipeline(&doc, "unnamed").unwrap()
    }

    fn trigger(doc: Value) -> Trigger {
        parse_trigger(&doc, "unnamed").unwrap()
    }

    fn main_pipeline() -> Pipeline {
        pipeline(json!({
            "name": "MainPipeline",
            "properties": {
                "parameters": {
                    "Param1": {"type": "String"},
                    "Param2": {"type": "String"},
                    "Param3": {"type": "Int", "defaultValue": 5},
                    "Param4": {"type": "String", "defaultValue": "daily"}
                },
                "activities": [{"name": "Wait", "type": "Wait"}]
            }
        }))
    }

    fn parent_pipeline(activities: Value) -> Pipeline {
        pipeline(json!({"name": "Parent", "properties": {"activities": activities}}))
    }

    fn call(name: &str, target: &str, params: Value) -> Value {
        json!({
            "name": name,
            "type": "ExecutePipeline",
            "typeProperties": {
                "pipeline": {"referenceName": target, "type": "PipelineReference"},
                "parameters": params
            }
        })
    }

    #[test]
    fn test_phases_reach_done() {
        let mut run = Run::new();
        assert_eq!(run.phase(), Phase::Init);
        let validation = run.validate(Workspace::default());
        assert_eq!(run.phase(), Phase::Done);
        assert!(validation.report.is_clean());
        assert!(validation.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_root_fails_from_loading() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut run = Run::new();
        let err = run.execute(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, LoadError::DirectoryNotFound { .. }));
        assert_eq!(run.phase(), Phase::Failed);
    }

    #[test]
    fn test_callee_defined_after_caller() {
        let workspace = Workspace {
            pipelines: vec![
                parent_pipeline(json!([call("CallMain", "MainPipeline", json!({"Param3": 5}))])),
                main_pipeline(),
            ],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        let issues = &validation.report.issues;
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].owner, "Parent");
        assert_eq!(issues[0].site, "CallMain");
        assert_eq!(issues[0].kind, IssueKind::MissingRequired);
        assert_eq!(issues[0].parameters, vec!["Param1", "Param2"]);
        assert_eq!(issues[1].kind, IssueKind::RedundantDefault);
        assert_eq!(issues[1].parameters, vec!["Param3"]);
    }

    #[test]
    fn test_daily_trigger_scenario() {
        let workspace = Workspace {
            pipelines: vec![main_pipeline()],
            triggers: vec![trigger(json!({
                "name": "DailyTrigger",
                "properties": {
                    "type": "ScheduleTrigger",
                    "pipelines": [{
                        "pipelineReference": {"referenceName": "MainPipeline"},
                        "parameters": {"Param1": "x", "Param2": "y", "Param4": "daily"}
                    }]
                }
            }))],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        let issues = &validation.report.issues;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].owner_kind, ResourceKind::Trigger);
        assert_eq!(issues[0].owner, "DailyTrigger");
        assert_eq!(issues[0].kind, IssueKind::RedundantDefault);
        assert_eq!(issues[0].parameters, vec!["Param4"]);
    }

    #[test]
    fn test_trigger_references_to_same_pipeline_stay_apart() {
        let reference = json!({
            "pipelineReference": {"referenceName": "MainPipeline"},
            "parameters": {"Param1": "x", "Param4": "daily"}
        });
        let workspace = Workspace {
            pipelines: vec![main_pipeline()],
            triggers: vec![trigger(json!({
                "name": "T",
                "properties": {"pipelines": [reference.clone(), reference]}
            }))],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        let sites: Vec<(&str, usize)> = validation
            .report
            .issues
            .iter()
            .map(|i| (i.site.as_str(), i.position))
            .collect();
        assert_eq!(
            sites,
            vec![("T#1", 0), ("T#1", 0), ("T#2", 1), ("T#2", 1)]
        );
        let text = validation.report.render_text();
        assert_eq!(text.matches("  'T#1' -> 'MainPipeline':").count(), 1);
        assert_eq!(text.matches("  'T#2' -> 'MainPipeline':").count(), 1);
    }

    #[test]
    fn test_unresolvable_target_warns_without_issues() {
        let workspace = Workspace {
            pipelines: vec![parent_pipeline(json!([call("CallGhost", "Ghost", json!({}))]))],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        assert!(validation.report.is_clean());
        assert_eq!(validation.diagnostics.len(), 1);
        let diag = &validation.diagnostics[0];
        assert_eq!(diag.kind, DiagnosticKind::UnresolvableTarget);
        assert!(diag.message.contains("'Ghost'"));
        assert_eq!(validation.summary.sites, 1);
        assert_eq!(validation.summary.resolved_sites, 0);
    }

    #[test]
    fn test_nested_site_is_resolved() {
        let workspace = Workspace {
            pipelines: vec![
                main_pipeline(),
                parent_pipeline(json!([{
                    "name": "Loop",
                    "type": "ForEach",
                    "typeProperties": {
                        "activities": [call("InLoop", "MainPipeline", json!({"Param1": "a"}))]
                    }
                }])),
            ],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        assert_eq!(validation.report.len(), 1);
        assert_eq!(validation.report.issues[0].site, "InLoop");
        assert_eq!(validation.report.issues[0].parameters, vec!["Param2"]);
    }

    #[test]
    fn test_malformed_trigger_is_diagnostic() {
        let workspace = Workspace {
            pipelines: vec![main_pipeline()],
            triggers: vec![trigger(json!({"name": "Orphan", "properties": {"type": "ScheduleTrigger"}}))],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        assert!(validation.report.is_clean());
        assert_eq!(validation.diagnostics.len(), 1);
        assert_eq!(validation.diagnostics[0].kind, DiagnosticKind::MalformedTrigger);
        assert_eq!(validation.diagnostics[0].owner.as_deref(), Some("Orphan"));
    }

    #[test]
    fn test_duplicate_pipeline_last_wins() {
        let stale = pipeline(json!({
            "name": "MainPipeline",
            "parameters": {"Old": {"type": "String"}}
        }));
        let workspace = Workspace {
            pipelines: vec![
                stale,
                main_pipeline(),
                parent_pipeline(json!([call(
                    "Call",
                    "MainPipeline",
                    json!({"Param1": "a", "Param2": "b"})
                )])),
            ],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        assert!(validation.report.is_clean());
        assert_eq!(validation.summary.pipelines, 2);
        assert!(validation
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::DuplicatePipeline));
    }

    #[test]
    fn test_duplicate_trigger_last_wins() {
        let make = |param1: &str| {
            trigger(json!({
                "name": "T",
                "properties": {"pipelines": [{
                    "pipelineReference": {"referenceName": "MainPipeline"},
                    "parameters": {"Param1": param1, "Param2": "b"}
                }]}
            }))
        };
        let mut first = make("a");
        first.definition["pipelines"][0]["parameters"]
            .as_object_mut()
            .unwrap()
            .remove("Param2");
        let workspace = Workspace {
            pipelines: vec![main_pipeline()],
            triggers: vec![first, make("a")],
            ..Workspace::default()
        };
        let validation = validate(workspace);
        assert!(validation.report.is_clean());
        assert_eq!(validation.summary.triggers, 1);
        assert_eq!(
            validation.diagnostics[0].kind,
            DiagnosticKind::DuplicateTrigger
        );
    }

    #[test]
    fn test_duplicate_trigger_names_both_files() {
        let make = |file: &str| {
            let mut t = trigger(json!({
                "name": "T",
                "pipelines": [{"pipelineReference": {"referenceName": "MainPipeline"}}]
            }));
            t.source = Some(PathBuf::from(file));
            t
        };
        let mut diagnostics = Vec::new();
        let kept = dedupe_triggers(vec![make("old.json"), make("new.json")], &mut diagnostics);
        assert_eq!(kept["T"].source, Some(PathBuf::from("new.json")));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Duplicate trigger 'T': 'new.json' replaces 'old.json'"
        );
        assert_eq!(diagnostics[0].path, Some(PathBuf::from("new.json")));
    }

    #[test]
    fn test_validation_is_deterministic() {
        let build = || Workspace {
            pipelines: vec![
                main_pipeline(),
                parent_pipeline(json!([
                    call("A", "MainPipeline", json!({"Param3": 5})),
                    call("B", "Ghost", json!({}))
                ])),
            ],
            ..Workspace::default()
        };
        let first = validate(build());
        let second = validate(build());
        assert_eq!(first, second);
        assert_eq!(first.report.render_text(), second.report.render_text());
    }
}
