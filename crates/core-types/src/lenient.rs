//! Forgiving `deserialize_with` helpers for oracle-produced JSON.
//!
//! Oracle output is unvalidated text: numbers arrive quoted, booleans arrive
//! as strings and single values arrive where lists were requested. These
//! helpers coerce such values instead of failing the whole document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Render a scalar JSON value as plain text. Objects and arrays keep their
/// JSON encoding.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(value_to_text(&other)),
    })
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    })
}

/// Number clamped into `[0, 1]`; non-finite input reads as zero.
pub fn unit_interval<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(clamp_unit(number(deserializer)?))
}

pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = number(deserializer)?;
    if value.is_finite() && value > 0.0 {
        Ok(value.round().min(u32::MAX as f64) as u32)
    } else {
        Ok(0)
    }
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_flag(&value).unwrap_or(false))
}

/// Like [`flag`] but a missing or unrecognised value reads as `true`.
pub fn flag_default_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_flag(&value).unwrap_or(true))
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|item| !item.trim().is_empty())
            .collect(),
        other => {
            let text = value_to_text(&other);
            if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    })
}

/// Deserialize a list, silently dropping entries that do not match `T`.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Deserialize an optional value, treating a mismatched shape as absent.
pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => serde_json::from_value(other).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "string")]
        text: String,
        #[serde(default, deserialize_with = "number")]
        score: f64,
        #[serde(default, deserialize_with = "flag")]
        done: bool,
        #[serde(default, deserialize_with = "string_list")]
        items: Vec<String>,
    }

    #[test]
    fn coerces_scalars() {
        let probe: Probe = serde_json::from_str(
            r#"{"text": 3000, "score": "0.75", "done": "true", "items": "only"}"#,
        )
        .expect("probe");
        assert_eq!(probe.text, "3000");
        assert!((probe.score - 0.75).abs() < f64::EPSILON);
        assert!(probe.done);
        assert_eq!(probe.items, vec!["only".to_string()]);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let probe: Probe = serde_json::from_str("{}").expect("probe");
        assert!(probe.text.is_empty());
        assert_eq!(probe.score, 0.0);
        assert!(!probe.done);
        assert!(probe.items.is_empty());
    }

    #[test]
    fn clamps_to_unit_interval() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(0.4), 0.4);
    }
}
