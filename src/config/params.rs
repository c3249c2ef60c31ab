use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Runtime parameters passed to a config (credentials, URLs, limits).
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Create empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse from CLI args like "key=value".
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            params.values.insert(key.trim().to_string(), value.to_string());
        }
        Ok(params)
    }
}

/// Parameter definition in config.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParamDef {
    /// Whether this parameter must resolve to a value.
    #[serde(default)]
    pub required: bool,

    /// Environment variable consulted when the parameter is not passed explicitly.
    pub env: Option<String>,

    /// Value used when neither an explicit value nor the env variable is set.
    pub default: Option<String>,

    /// Description for `--check` output.
    pub description: Option<String>,

    /// Mask the resolved value in `--check` output.
    #[serde(default)]
    pub secret: bool,
}

impl ParamDef {
    /// Resolve a value: explicit param, then env variable, then default.
    pub(crate) fn resolve(&self, name: &str, params: &Params) -> Result<Option<String>> {
        if let Some(v) = params.get(name) {
            return Ok(Some(v.to_string()));
        }
        if let Some(var) = self.env.as_deref() {
            if let Ok(v) = std::env::var(var) {
                if !v.is_empty() {
                    return Ok(Some(v));
                }
            }
        }
        if let Some(ref default) = self.default {
            return Ok(Some(default.clone()));
        }
        if self.required {
            let hint = self
                .env
                .as_deref()
                .map(|var| format!(" (pass -P {}=... or set {})", name, var))
                .unwrap_or_default();
            return Err(Error::Config(format!(
                "missing required parameter: {}{}",
                name, hint
            )));
        }
        Ok(None)
    }
}

/// Substitute `${var}` patterns in a string.
///
/// Variables without a definition are left untouched.
pub fn substitute(
    template: &str,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(var_start) = result[start..].find("${") {
        let var_start = start + var_start;
        let Some(var_end) = result[var_start..].find('}') else {
            break;
        };
        let var_end = var_start + var_end;
        let var_name = result[var_start + 2..var_end].to_string();

        let value = match defs.get(&var_name) {
            Some(def) => def.resolve(&var_name, params)?.unwrap_or_default(),
            None => match params.get(&var_name) {
                Some(v) => v.to_string(),
                None => {
                    start = var_end + 1;
                    continue;
                }
            },
        };

        result.replace_range(var_start..=var_end, &value);
        start = var_start + value.len();
    }

    Ok(result)
}

/// Recursively substitute params in a serde_yaml::Value.
pub fn substitute_value(
    value: &mut serde_yaml::Value,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => {
            *s = substitute(s, params, defs)?;
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        _ => {}
    }
    Ok(())
}
