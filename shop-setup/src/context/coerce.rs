// Loose value coercions for configuration values
//
// Config values arrive untyped (file or database). These helpers turn them into the types the
// context accessors promise.

use serde_json::Value;

use crate::context::ConfigError;

/// Integer coercion: numbers (floats truncate), numeric strings, booleans.
pub fn to_int(name: &str, value: &Value) -> Result<i64, ConfigError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| ConfigError::invalid_value(name, format!("'{}' is not an integer", n))),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .or_else(|_| t.parse::<f64>().map(|f| f.trunc() as i64))
                .map_err(|_| ConfigError::invalid_value(name, format!("'{}' is not numeric", s)))
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Null => Err(ConfigError::invalid_value(name, "value is null")),
        Value::Array(_) | Value::Object(_) => Err(ConfigError::invalid_value(
            name,
            "collection cannot be used as an integer",
        )),
    }
}

/// Truthiness: null, false, 0, "", "0" and empty collections are false.
pub fn to_bool(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !(s.is_empty() || s == "0"),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// String rendering of a scalar; strings are returned without quotes.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// List coercion: null is empty, a scalar becomes a one-element list, a map yields its values.
pub fn to_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(to_string).collect(),
        Some(Value::Object(map)) => map.values().map(to_string).collect(),
        Some(scalar) => vec![to_string(scalar)],
    }
}
