//! Lenient field deserializers shared by the persisted documents.
//!
//! Hand-edited documents drift in type: ids written as numbers, names left
//! as `null`. These helpers coerce such values instead of failing the whole
//! document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Renders a scalar JSON value as a string. `null` becomes empty.
fn value_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Accepts a string field written as any JSON value.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_string)
}

/// Accepts admin ids written either as JSON strings or as bare integers.
pub(crate) fn ids_as_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "admin id must be a string or integer, got {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Named {
        #[serde(default, deserialize_with = "lenient_string")]
        name: String,
    }

    #[test]
    fn test_lenient_string_coerces_scalars() {
        let parse = |json: &str| serde_json::from_str::<Named>(json).unwrap().name;
        assert_eq!(parse(r#"{"name": "bob"}"#), "bob");
        assert_eq!(parse(r#"{"name": null}"#), "");
        assert_eq!(parse(r#"{"name": 12345}"#), "12345");
        assert_eq!(parse(r#"{"name": true}"#), "true");
        assert_eq!(parse("{}"), "");
    }
}
