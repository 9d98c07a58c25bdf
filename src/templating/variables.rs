use anyhow::{Context, Result};
use minijinja::Value;
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::env;
use std::path::Path;

use super::scope::Scope;

/// Prefix of environment variables that become model variables
pub const ENV_VAR_PREFIX: &str = "TESSERA_VAR_";

/// Collects the top-level model for a render from config, environment and
/// command line, in increasing order of precedence.
pub struct VariableResolver {
    variables: HashMap<String, Value>,
}

impl Default for VariableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableResolver {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Add variables from a YAML vars mapping
    pub fn add_vars_section(&mut self, vars: &HashMap<String, YamlValue>) {
        for (key, value) in vars {
            self.variables
                .insert(key.clone(), yaml_value_to_minijinja_value(value));
        }
    }

    /// Add variables from a YAML file containing a single mapping
    pub fn add_vars_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vars file {}", path.display()))?;
        let vars: HashMap<String, YamlValue> = serde_yaml::from_str(&content)
            .with_context(|| format!("Vars file {} must be a YAML mapping", path.display()))?;
        self.add_vars_section(&vars);
        Ok(())
    }

    /// Add variables from environment (TESSERA_VAR_* -> variable name)
    pub fn add_env_vars(&mut self) {
        for (key, value) in env::vars() {
            if let Some(var_name) = key.strip_prefix(ENV_VAR_PREFIX) {
                self.variables
                    .insert(var_name.to_lowercase(), Value::from(value));
            }
        }
    }

    /// Add variables from CLI flags.
    ///
    /// Values that parse as JSON keep their type (`3`, `true`, `[1, 2]`);
    /// anything else is a plain string.
    pub fn add_cli_vars(&mut self, cli_vars: &HashMap<String, String>) {
        for (key, raw) in cli_vars {
            let value = match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(json) => json_value_to_minijinja_value(&json),
                Err(_) => Value::from(raw.as_str()),
            };
            self.variables.insert(key.clone(), value);
        }
    }

    pub fn get_variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// The collected variables as a render data argument
    pub fn to_scope(&self) -> Scope {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Parse `name=value` pairs from the command line
pub fn parse_cli_vars(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.to_string()))
                .filter(|(name, _)| !name.is_empty())
                .with_context(|| format!("Invalid variable '{pair}', expected name=value"))
        })
        .collect()
}

/// Convert a serde_json::Value to a minijinja::Value
pub fn json_value_to_minijinja_value(json_value: &serde_json::Value) -> Value {
    match json_value {
        serde_json::Value::Null => Value::from(()),
        serde_json::Value::Bool(b) => Value::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::from_serialize(n)
            }
        }
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(arr) => Value::from(
            arr.iter()
                .map(json_value_to_minijinja_value)
                .collect::<Vec<_>>(),
        ),
        serde_json::Value::Object(obj) => Value::from_serialize(
            obj.iter()
                .map(|(k, v)| (k.clone(), json_value_to_minijinja_value(v)))
                .collect::<HashMap<String, Value>>(),
        ),
    }
}

/// Convert a serde_yaml::Value to a minijinja::Value
pub fn yaml_value_to_minijinja_value(yaml_value: &YamlValue) -> Value {
    match yaml_value {
        YamlValue::Null => Value::from(()),
        YamlValue::Bool(b) => Value::from(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::from_serialize(n)
            }
        }
        YamlValue::String(s) => Value::from(s.as_str()),
        YamlValue::Sequence(seq) => Value::from(
            seq.iter()
                .map(yaml_value_to_minijinja_value)
                .collect::<Vec<_>>(),
        ),
        YamlValue::Mapping(map) => Value::from_serialize(
            map.iter()
                .filter_map(|(k, v)| {
                    k.as_str()
                        .map(|key| (key.to_string(), yaml_value_to_minijinja_value(v)))
                })
                .collect::<HashMap<String, Value>>(),
        ),
        YamlValue::Tagged(tagged) => yaml_value_to_minijinja_value(&tagged.value),
    }
}
