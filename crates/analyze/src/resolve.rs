//! Parameter resolution: compare one invocation against the callee schema.

use crate::extract::InvocationSite;
use paramcheck_interchange::ParameterSchema;
use serde::Serialize;
use serde_json::Value;

/// Outcome of resolving one invocation site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Parameters without a default that the caller did not supply,
    /// in schema declaration order.
    pub missing: Vec<String>,
    /// Supplied parameters equal to the callee's default, in the order
    /// the caller supplies them.
    pub redundant: Vec<String>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.redundant.is_empty()
    }
}

/// Resolve `site` against the callee's `schema`.
///
/// Supplied names that the schema does not declare are ignored.
pub fn resolve(site: &InvocationSite, schema: &ParameterSchema) -> Resolution {
    let missing = schema
        .required_names()
        .filter(|name| !site.arguments.contains_key(*name))
        .map(|name| name.to_string())
        .collect();

    let redundant = site
        .arguments
        .iter()
        .filter(|(name, supplied)| {
            schema
                .get(name)
                .and_then(|spec| spec.default.as_ref())
                .is_some_and(|default| json_equal(supplied, default))
        })
        .map(|(name, _)| name.clone())
        .collect();

    Resolution { missing, redundant }
}

/// Deep structural equality of two JSON values.
///
/// Objects must have the same keys with equal values (key order is
/// irrelevant), arrays the same length with equal elements. Numbers compare
/// by numeric value, so `5` equals `5.0`; a number never equals the string
/// `"5"`.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(am), Value::Object(bm)) => {
            if am.len() != bm.len() {
                return false;
            }
            am.iter()
                .all(|(k, v)| bm.get(k).is_some_and(|bv| json_equal(v, bv)))
        }
        (Value::Array(av), Value::Array(bv)) => {
            av.len() == bv.len() && av.iter().zip(bv).all(|(a, b)| json_equal(a, b))
        }
        (Value::Number(an), Value::Number(bn)) => match (an.as_i64(), bn.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (an.as_u64(), bn.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => an.as_f64() == bn.as_f64(),
            },
        },
        _ => a == b,
    }
}
