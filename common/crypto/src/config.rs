//! Partial key/value configuration shared by the token and one-time code components.
//!
//! A component is configured once from a JSON value. Empty values (`null`, `{}`,
//! `""`, `[]`, and any number or boolean) keep every default, an object contributes
//! only the keys the component recognizes, and anything else is rejected.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config must be an object, got {0}")]
    NotAMapping(&'static str),
    #[error("invalid value for config key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Recognized entries picked out of a partial config value.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    entries: Map<String, Value>,
}

impl ConfigMap {
    /// Keep only `recognized` keys from `value`; unknown keys are dropped silently.
    pub fn from_value(value: &Value, recognized: &[&str]) -> Result<Self, ConfigError> {
        if is_empty(value) {
            return Ok(Self::default());
        }
        let object = value
            .as_object()
            .ok_or_else(|| ConfigError::NotAMapping(kind(value)))?;
        let entries = object
            .iter()
            .filter(|(key, _)| recognized.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Self { entries })
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(other) => Err(ConfigError::invalid(
                key,
                format!("expected a string, got {}", kind(other)),
            )),
        }
    }

    /// Non-negative integer. Whole floats such as `6.0` are accepted.
    pub fn u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.number(key)?
            .map(|number| {
                whole_u64(number).ok_or_else(|| {
                    ConfigError::invalid(
                        key,
                        format!("expected a non-negative integer, got {number}"),
                    )
                })
            })
            .transpose()
    }

    /// Any JSON number, integer or not. Range checks are left to the caller.
    pub fn f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.number(key)?
            .map(|number| {
                number
                    .as_f64()
                    .ok_or_else(|| ConfigError::invalid(key, format!("{number} is not a finite number")))
            })
            .transpose()
    }

    /// First of `keys` that is present, read as `u64`. Used for key aliases.
    pub fn first_u64(&self, keys: &[&str]) -> Result<Option<u64>, ConfigError> {
        for key in keys {
            if let Some(value) = self.u64(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn number(&self, key: &str) -> Result<Option<&Number>, ConfigError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Number(number)) => Ok(Some(number)),
            Some(other) => Err(ConfigError::invalid(
                key,
                format!("expected a number, got {}", kind(other)),
            )),
        }
    }
}

fn whole_u64(number: &Number) -> Option<u64> {
    if let Some(value) = number.as_u64() {
        return Some(value);
    }
    let value = number.as_f64()?;
    if value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// Numbers and booleans carry no keys, so they count as empty like `null` does.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
