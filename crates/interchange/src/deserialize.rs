//! Conversion from raw JSON documents into typed records.
//!
//! Entry points are [`parse_pipeline`], [`parse_trigger`] and
//! [`parse_parameter_schema`]. Every structural mismatch is reported as a
//! [`DefinitionError`]; nothing here panics on unexpected input.

use crate::types::*;
use serde_json::Value;

/// Structural problems in a single pipeline or trigger document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// The document root is not a JSON object.
    #[error("document is not a JSON object")]
    NotAnObject,
    /// The envelope `type` names some other kind of resource.
    #[error("unexpected resource type '{found}' (expected '{expected}')")]
    UnexpectedType {
        found: String,
        expected: &'static str,
    },
    /// A field is present but has the wrong shape, or a required field is missing.
    #[error("{0}")]
    Malformed(String),
}

fn malformed(msg: impl Into<String>) -> DefinitionError {
    DefinitionError::Malformed(msg.into())
}

/// Convert a pipeline document into a [`Pipeline`].
///
/// `fallback_name` (normally the file stem) is used when the document has
/// no `name`. Both the bare form `{name, parameters, activities}` and the
/// exported envelope `{name, type, properties: {...}}` are accepted.
pub fn parse_pipeline(doc: &Value, fallback_name: &str) -> Result<Pipeline, DefinitionError> {
    let body = resource_body(doc, ResourceKind::Pipeline)?;
    let name = resource_name(doc, fallback_name)?;

    let parameters = parse_parameter_schema(body.get("parameters"))?;

    let activities = match body.get("activities") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => parse_activity_list(items, "activities")?,
        Some(_) => return Err(malformed("'activities' is not an array")),
    };

    Ok(Pipeline {
        name,
        parameters,
        activities,
        source: None,
    })
}

/// Convert a trigger document into a [`Trigger`].
pub fn parse_trigger(doc: &Value, fallback_name: &str) -> Result<Trigger, DefinitionError> {
    let body = resource_body(doc, ResourceKind::Trigger)?;
    let name = resource_name(doc, fallback_name)?;

    Ok(Trigger {
        name,
        definition: body.clone(),
        source: None,
    })
}

/// Build a [`ParameterSchema`] from a `parameters` block.
///
/// A missing (or `null`) block means the pipeline declares no parameters.
/// When present it must be a mapping of name -> `{type?, defaultValue?}`.
pub fn parse_parameter_schema(block: Option<&Value>) -> Result<ParameterSchema, DefinitionError> {
    let entries = match block {
        None | Some(Value::Null) => return Ok(ParameterSchema::new()),
        Some(Value::Object(entries)) => entries,
        Some(_) => return Err(malformed("'parameters' is not a mapping")),
    };

    let mut schema = ParameterSchema::new();
    for (name, decl) in entries {
        let decl = decl.as_object().ok_or_else(|| {
            malformed(format!("parameter '{}' declaration is not a mapping", name))
        })?;
        let param_type = decl
            .get("type")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string());
        let default = decl.get("defaultValue").cloned();
        schema.insert(
            name.clone(),
            ParameterSpec {
                param_type,
                default,
            },
        );
    }
    Ok(schema)
}

// ── Parsing helpers ─────────────────────────────────────────────────

/// Check the envelope type and return the object holding the resource body.
fn resource_body(doc: &Value, kind: ResourceKind) -> Result<&Value, DefinitionError> {
    if !doc.is_object() {
        return Err(DefinitionError::NotAnObject);
    }

    let (body, enveloped) = match doc.get("properties") {
        None => (doc, false),
        Some(props @ Value::Object(_)) => (props, true),
        Some(_) => return Err(malformed("'properties' is not an object")),
    };

    // A bare trigger's own `type` is its trigger kind, so without an
    // envelope only Data Factory resource types are checked.
    if let Some(found) = doc.get("type").and_then(|t| t.as_str()) {
        let is_resource_type = enveloped || found.starts_with(RESOURCE_TYPE_PREFIX);
        if is_resource_type && found != kind.resource_type() {
            return Err(DefinitionError::UnexpectedType {
                found: found.to_string(),
                expected: kind.resource_type(),
            });
        }
    }

    Ok(body)
}

fn resource_name(doc: &Value, fallback_name: &str) -> Result<String, DefinitionError> {
    match doc.get("name") {
        None | Some(Value::Null) => Ok(fallback_name.to_string()),
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        Some(_) => Err(malformed("'name' is not a non-empty string")),
    }
}

fn required_str(obj: &Value, field: &str, context: &str) -> Result<String, DefinitionError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| malformed(format!("{}: missing '{}' field", context, field)))
}

fn parse_activity_list(items: &[Value], context: &str) -> Result<Vec<Activity>, DefinitionError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_activity(item, &format!("{}[{}]", context, i)))
        .collect()
}

fn parse_activity(obj: &Value, context: &str) -> Result<Activity, DefinitionError> {
    if !obj.is_object() {
        return Err(malformed(format!("{}: activity is not an object", context)));
    }
    let name = required_str(obj, "name", context)?;
    let activity_type = required_str(obj, "type", context)?;

    let type_properties = match obj.get("typeProperties") {
        None | Some(Value::Null) => None,
        Some(tp @ Value::Object(_)) => Some(tp.clone()),
        Some(_) => {
            return Err(malformed(format!(
                "activity '{}': 'typeProperties' is not an object",
                name
            )))
        }
    };

    let children = parse_nested_activities(obj, type_properties.as_ref(), &name)?;

    Ok(Activity {
        name,
        activity_type,
        type_properties,
        children,
    })
}

/// Container fields inside `typeProperties` that precede Switch cases.
const NESTED_LIST_FIELDS: &[&str] = &["activities", "ifTrueActivities", "ifFalseActivities"];

/// Gather nested activities from every container field: a bare
/// `activities` list on the activity itself, then the ForEach/Until body
/// and If branches, then each Switch case, then the Switch default.
fn parse_nested_activities(
    obj: &Value,
    type_properties: Option<&Value>,
    name: &str,
) -> Result<Vec<Activity>, DefinitionError> {
    let mut children = Vec::new();

    if let Some(list) = obj.get("activities") {
        children.extend(nested_list(list, name, "activities")?);
    }

    let Some(tp) = type_properties else {
        return Ok(children);
    };

    for field in NESTED_LIST_FIELDS {
        if let Some(list) = tp.get(*field) {
            children.extend(nested_list(list, name, field)?);
        }
    }

    match tp.get("cases") {
        None | Some(Value::Null) => {}
        Some(Value::Array(cases)) => {
            for (i, case) in cases.iter().enumerate() {
                if let Some(list) = case.get("activities") {
                    children.extend(nested_list(list, name, &format!("cases[{}]", i))?);
                }
            }
        }
        Some(_) => {
            return Err(malformed(format!(
                "activity '{}': 'cases' is not an array",
                name
            )))
        }
    }

    if let Some(list) = tp.get("defaultActivities") {
        children.extend(nested_list(list, name, "defaultActivities")?);
    }

    Ok(children)
}

fn nested_list(list: &Value, owner: &str, field: &str) -> Result<Vec<Activity>, DefinitionError> {
    match list {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => parse_activity_list(items, &format!("{}.{}", owner, field)),
        _ => Err(malformed(format!(
            "activity '{}': '{}' is not an array",
            owner, field
        ))),
    }
}
