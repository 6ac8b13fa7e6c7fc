//! Invocation extraction: where pipelines are called from.
//!
//! Pipelines call other pipelines through `ExecutePipeline` activities,
//! which may sit at any depth inside ForEach/If/Switch/Until containers.
//! Triggers call pipelines through their pipeline references.

use paramcheck_interchange::{Activity, Arguments, Pipeline, Trigger};
use serde::Serialize;
use serde_json::Value;

/// One place where a pipeline is invoked with a set of arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationSite {
    /// Activity name, or trigger name for trigger invocations (`Name#n`,
    /// 1-based, when the trigger references several pipelines).
    pub label: String,
    /// Name of the called pipeline.
    pub target: String,
    /// Supplied parameters, in document order.
    pub arguments: Arguments,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// An ExecutePipeline activity whose callee or arguments cannot be read.
    #[error("activity '{activity}': {reason}")]
    MalformedActivity { activity: String, reason: String },
    /// A trigger without a usable pipeline reference.
    #[error("trigger '{trigger}': {reason}")]
    MalformedTrigger { trigger: String, reason: String },
}

/// Every ExecutePipeline site in `pipeline`, in depth-first pre-order.
///
/// Sites that cannot be read are dropped; use
/// [`extract_invocations_checked`] to see them.
pub fn extract_invocations(pipeline: &Pipeline) -> Vec<InvocationSite> {
    extract_invocations_checked(pipeline)
        .into_iter()
        .filter_map(Result::ok)
        .collect()
}

/// Like [`extract_invocations`], but keeps unreadable sites as errors in
/// their traversal position.
pub fn extract_invocations_checked(pipeline: &Pipeline) -> Vec<Result<InvocationSite, ExtractError>> {
    let mut sites = Vec::new();
    // Children are pushed in reverse so they pop in document order.
    let mut stack: Vec<&Activity> = pipeline.activities.iter().rev().collect();

    while let Some(activity) = stack.pop() {
        if activity.is_execute_pipeline() {
            sites.push(activity_site(activity));
        }
        stack.extend(activity.children.iter().rev());
    }

    sites
}

fn activity_site(activity: &Activity) -> Result<InvocationSite, ExtractError> {
    let malformed = |reason: &str| ExtractError::MalformedActivity {
        activity: activity.name.clone(),
        reason: reason.to_string(),
    };

    let target = activity
        .type_property("pipeline")
        .and_then(|p| p.get("referenceName"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| malformed("missing 'typeProperties.pipeline.referenceName'"))?;

    let arguments = arguments_from(activity.type_property("parameters"))
        .ok_or_else(|| malformed("'typeProperties.parameters' is not a mapping"))?;

    Ok(InvocationSite {
        label: activity.name.clone(),
        target: target.to_string(),
        arguments,
    })
}

/// The single pipeline invocation of a trigger.
///
/// For a trigger that references several pipelines this is the first
/// reference; [`extract_trigger_invocations`] returns all of them.
pub fn extract_trigger_invocation(trigger: &Trigger) -> Result<InvocationSite, ExtractError> {
    extract_trigger_invocations(trigger).map(|mut sites| sites.swap_remove(0))
}

/// Every pipeline invocation of a trigger. Never returns an empty list.
///
/// Accepted shapes, checked in this order:
/// - `pipelines: [{pipelineReference: {referenceName}, parameters}]`
///   (schedule and event triggers)
/// - `pipeline: {pipelineReference: {referenceName}, parameters}`
///   (tumbling window triggers)
/// - a top-level `pipelineReference: {referenceName, parameters?}` with
///   an optional sibling `parameters`
pub fn extract_trigger_invocations(trigger: &Trigger) -> Result<Vec<InvocationSite>, ExtractError> {
    let malformed = |reason: String| ExtractError::MalformedTrigger {
        trigger: trigger.name.clone(),
        reason,
    };
    let def = &trigger.definition;

    let entries: Vec<&Value> = if let Some(list) = def.get("pipelines") {
        let list = list
            .as_array()
            .ok_or_else(|| malformed("'pipelines' is not an array".to_string()))?;
        list.iter().collect()
    } else if let Some(entry) = def.get("pipeline") {
        vec![entry]
    } else if def.get("pipelineReference").is_some() {
        vec![def]
    } else {
        return Err(malformed("no pipeline reference".to_string()));
    };

    if entries.is_empty() {
        return Err(malformed("no pipeline reference".to_string()));
    }

    // Several references from one trigger are told apart by position.
    let numbered = entries.len() > 1;
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = if numbered {
                format!("{}#{}", trigger.name, i + 1)
            } else {
                trigger.name.clone()
            };
            reference_site(&label, entry)
                .map_err(|reason| malformed(format!("pipeline reference {}: {}", i, reason)))
        })
        .collect()
}

fn reference_site(label: &str, entry: &Value) -> Result<InvocationSite, String> {
    let reference = entry
        .get("pipelineReference")
        .ok_or("missing 'pipelineReference'")?;
    let target = reference
        .get("referenceName")
        .and_then(|n| n.as_str())
        .ok_or("missing 'pipelineReference.referenceName'")?;

    let block = entry
        .get("parameters")
        .or_else(|| reference.get("parameters"));
    let arguments = arguments_from(block).ok_or("'parameters' is not a mapping")?;

    Ok(InvocationSite {
        label: label.to_string(),
        target: target.to_string(),
        arguments,
    })
}

/// Absent or `null` means no arguments; anything but a mapping is `None`.
fn arguments_from(block: Option<&Value>) -> Option<Arguments> {
    match block {
        None | Some(Value::Null) => Some(Arguments::new()),
        Some(Value::Object(map)) => Some(
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        Some(_) => None,
    }
}
