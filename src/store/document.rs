//! YAML → JSON document conversion.
//!
//! Documents are served as JSON, so YAML-only constructs are flattened:
//! non-string mapping keys become their textual form, tags are dropped and
//! non-finite floats become `null`.

use serde_json::{Map, Number, Value};
use serde_yaml::Value as Yaml;

pub fn parse(text: &str) -> Result<Value, serde_yaml::Error> {
    let yaml: Yaml = serde_yaml::from_str(text)?;
    Ok(to_json(yaml))
}

/// True for text with no YAML content: only whitespace and comments.
pub fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

pub fn to_json(yaml: Yaml) -> Value {
    match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => number(&n),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(key_string(key), to_json(value));
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => to_json(tagged.value),
    }
}

fn number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn key_string(key: Yaml) -> String {
    match key {
        Yaml::String(s) => s,
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        other => to_json(other).to_string(),
    }
}
