//! Output parameter normalization
//!
//! The orchestrator reports output parameters as an ordered list of `{name, value}` pairs.
//! Callers want them keyed by name.

use crate::types::Parameter;
use serde_json::Value;
use std::collections::HashMap;

/// Convert an ordered parameter list into a name-keyed map
///
/// Empty input yields an empty map. When a name appears more than once, the entry that
/// comes last in input order wins.
///
/// # Examples
///
/// ```
/// use jobwatch::outputs::normalize;
/// use jobwatch::types::Parameter;
///
/// let map = normalize(vec![Parameter::new("y", 1), Parameter::new("y", 2)]);
/// assert_eq!(map["y"].value, 2);
/// ```
pub fn normalize(parameters: impl IntoIterator<Item = Parameter>) -> HashMap<String, Parameter> {
    let mut map = HashMap::new();
    for parameter in parameters {
        map.insert(parameter.name.clone(), parameter);
    }
    map
}

/// Read a parameter list out of a loosely-typed JSON payload
///
/// Anything other than an array yields no parameters. Entries without a string `name`
/// are skipped; a missing `value` reads as `null`.
pub fn parameters_from_value(value: &Value) -> Vec<Parameter> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name").and_then(Value::as_str)?;
            let value = item.get("value").cloned().unwrap_or(Value::Null);
            Some(Parameter::new(name, value))
        })
        .collect()
}
