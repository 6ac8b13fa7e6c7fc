//! The ordered list of validation issues and its text rendering.
//!
//! Construction is pure: [`build`] turns per-site resolutions into
//! [`ValidationIssue`]s. Rendering lives in [`Report::render_text`] so
//! callers decide where the text goes.

use crate::resolve::Resolution;
use indexmap::IndexMap;
use paramcheck_interchange::ResourceKind;
use serde::Serialize;
use std::fmt::Write as _;

/// The two kinds of parameter-passing problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    MissingRequired,
    RedundantDefault,
}

impl IssueKind {
    fn describe(self) -> &'static str {
        match self {
            IssueKind::MissingRequired => "Missing required parameters",
            IssueKind::RedundantDefault => "Redundant parameters matching default values",
        }
    }
}

/// Resolver output for one invocation site, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFinding {
    /// Pipeline or trigger that contains the site.
    pub owner: String,
    /// Activity name or trigger name.
    pub site: String,
    /// Position of the site among its owner's sites, in traversal order.
    pub position: usize,
    /// Called pipeline.
    pub target: String,
    pub resolution: Resolution,
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub owner_kind: ResourceKind,
    pub owner: String,
    pub site: String,
    pub position: usize,
    pub target: String,
    pub kind: IssueKind,
    pub parameters: Vec<String>,
}

/// All issues of a run, already in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub issues: Vec<ValidationIssue>,
}

/// Build the report from pipeline and trigger findings.
///
/// Order: pipelines before triggers, then owner in first-seen order, then
/// site in the order given, then missing before redundant. Empty sets
/// produce no issue.
pub fn build(pipeline_findings: &[SiteFinding], trigger_findings: &[SiteFinding]) -> Report {
    let mut issues = Vec::new();
    push_grouped(&mut issues, ResourceKind::Pipeline, pipeline_findings);
    push_grouped(&mut issues, ResourceKind::Trigger, trigger_findings);
    Report { issues }
}

fn push_grouped(issues: &mut Vec<ValidationIssue>, owner_kind: ResourceKind, findings: &[SiteFinding]) {
    let mut by_owner: IndexMap<&str, Vec<&SiteFinding>> = IndexMap::new();
    for finding in findings {
        by_owner.entry(finding.owner.as_str()).or_default().push(finding);
    }

    for finding in by_owner.into_values().flatten() {
        let sets = [
            (IssueKind::MissingRequired, &finding.resolution.missing),
            (IssueKind::RedundantDefault, &finding.resolution.redundant),
        ];
        for (kind, parameters) in sets {
            if parameters.is_empty() {
                continue;
            }
            issues.push(ValidationIssue {
                owner_kind,
                owner: finding.owner.clone(),
                site: finding.site.clone(),
                position: finding.position,
                target: finding.target.clone(),
                kind,
                parameters: parameters.clone(),
            });
        }
    }
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues of one owner kind, in report order.
    pub fn issues_for(&self, kind: ResourceKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.owner_kind == kind)
    }

    /// Render the grouped text report. A clean report renders as "".
    ///
    /// ```text
    /// Validation issues found:
    ///
    /// Pipeline 'Parent':
    ///   'CallMain' -> 'MainPipeline':
    ///     Missing required parameters: [Param1, Param2]
    /// ```
    pub fn render_text(&self) -> String {
        if self.is_clean() {
            return String::new();
        }

        let mut out = String::from("Validation issues found:\n");
        let mut current_owner: Option<(ResourceKind, &str)> = None;
        let mut current_site: Option<usize> = None;

        for issue in &self.issues {
            let owner = (issue.owner_kind, issue.owner.as_str());
            if current_owner != Some(owner) {
                let heading = match issue.owner_kind {
                    ResourceKind::Pipeline => "Pipeline",
                    ResourceKind::Trigger => "Trigger",
                };
                let _ = write!(out, "\n{} '{}':\n", heading, issue.owner);
                current_owner = Some(owner);
                current_site = None;
            }

            if current_site != Some(issue.position) {
                let _ = writeln!(out, "  '{}' -> '{}':", issue.site, issue.target);
                current_site = Some(issue.position);
            }

            let _ = writeln!(
                out,
                "    {}: [{}]",
                issue.kind.describe(),
                issue.parameters.join(", ")
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(owner: &str, site: &str, missing: &[&str], redundant: &[&str]) -> SiteFinding {
        at(owner, site, 0, missing, redundant)
    }

    fn at(
        owner: &str,
        site: &str,
        position: usize,
        missing: &[&str],
        redundant: &[&str],
    ) -> SiteFinding {
        SiteFinding {
            owner: owner.to_string(),
            site: site.to_string(),
            position,
            target: "MainPipeline".to_string(),
            resolution: Resolution {
                missing: missing.iter().map(|s| s.to_string()).collect(),
                redundant: redundant.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn test_clean_findings_build_empty_report() {
        let report = build(&[finding("P", "A", &[], &[])], &[finding("T", "T", &[], &[])]);
        assert!(report.is_clean());
        assert_eq!(report.render_text(), "");
    }

    #[test]
    fn test_missing_before_redundant() {
        let report = build(&[finding("P", "A", &["Param1", "Param2"], &["Param3"])], &[]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.issues[0].kind, IssueKind::MissingRequired);
        assert_eq!(report.issues[0].parameters, vec!["Param1", "Param2"]);
        assert_eq!(report.issues[1].kind, IssueKind::RedundantDefault);
        assert_eq!(report.issues[1].parameters, vec!["Param3"]);
    }

    #[test]
    fn test_pipelines_before_triggers() {
        let report = build(
            &[finding("P", "A", &["x"], &[])],
            &[finding("T", "T", &["y"], &[])],
        );
        assert_eq!(report.issues[0].owner_kind, ResourceKind::Pipeline);
        assert_eq!(report.issues[1].owner_kind, ResourceKind::Trigger);
        assert_eq!(report.issues_for(ResourceKind::Trigger).count(), 1);
    }

    #[test]
    fn test_owners_grouped_in_first_seen_order() {
        let report = build(
            &[
                at("Zeta", "A1", 0, &["x"], &[]),
                at("Alpha", "B1", 0, &["x"], &[]),
                at("Zeta", "A2", 1, &["x"], &[]),
            ],
            &[],
        );
        let order: Vec<(&str, &str)> = report
            .issues
            .iter()
            .map(|i| (i.owner.as_str(), i.site.as_str()))
            .collect();
        assert_eq!(order, vec![("Zeta", "A1"), ("Zeta", "A2"), ("Alpha", "B1")]);
    }

    #[test]
    fn test_render_text_layout() {
        let report = build(
            &[
                at("Parent", "CallMain", 0, &["Param1", "Param2"], &["Param3"]),
                at("Parent", "CallAgain", 1, &[], &["Param3"]),
            ],
            &[finding("DailyTrigger", "DailyTrigger", &[], &["Param4"])],
        );
        let expected = "\
Validation issues found:

Pipeline 'Parent':
  'CallMain' -> 'MainPipeline':
    Missing required parameters: [Param1, Param2]
    Redundant parameters matching default values: [Param3]
  'CallAgain' -> 'MainPipeline':
    Redundant parameters matching default values: [Param3]

Trigger 'DailyTrigger':
  'DailyTrigger' -> 'MainPipeline':
    Redundant parameters matching default values: [Param4]
";
        assert_eq!(report.render_text(), expected);
    }

    #[test]
    fn test_same_label_sites_render_separately() {
        let report = build(
            &[],
            &[
                at("T", "T", 0, &["A"], &["B"]),
                at("T", "T", 1, &["A"], &["B"]),
            ],
        );
        let expected = "\
Validation issues found:

Trigger 'T':
  'T' -> 'MainPipeline':
    Missing required parameters: [A]
    Redundant parameters matching default values: [B]
  'T' -> 'MainPipeline':
    Missing required parameters: [A]
    Redundant parameters matching default values: [B]
";
        assert_eq!(report.render_text(), expected);
        assert_eq!(report.issues[2].position, 1);
    }

    #[test]
    fn test_report_serializable() {
        let report = build(&[finding("P", "A", &["x"], &[])], &[]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["owner_kind"], "pipeline");
        assert_eq!(json["issues"][0]["kind"], "MissingRequired");
        assert_eq!(json["issues"][0]["parameters"][0], "x");
    }
}
