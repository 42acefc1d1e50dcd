//! Per-macro parameters
//!
//! Values come from a `[params."<macro path>"]` table in the config file, so
//! the preferences a macro would otherwise hard-code can be set per install.

use serde::Deserialize;
use std::collections::HashMap;
use toml::Value;

/// Typed, defaulting view over one macro's parameter table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Params(HashMap<String, Value>);

impl Params {
    pub fn empty() -> Self {
        Params(HashMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get a string parameter with a default value
    ///
    /// # Example
    /// ```ignore
    /// let preset = params.get_str("preset", "veryslow");
    /// ```
    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.0
            .get(key)
            .and_then(|v| v.as_integer())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.0
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Floats also accept integer values (`crf = 18` reads as 18.0)
    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(Value::Float(f)) => *f,
            Some(Value::Integer(i)) => *i as f64,
            _ => default,
        }
    }

    /// String array parameter; non-string items are skipped
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
