//! Typed access to environment settings
//!
//! Configuration loaders take an [`EnvLookup`] instead of reading the process
//! environment directly, so tests can feed a plain map.

use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Something that can resolve a variable name to a value
pub trait EnvLookup {
    /// Look up a variable, `None` when unset or empty
    fn get(&self, key: &str) -> Option<String>;
}

/// The process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvLookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// Failure to interpret an environment value
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {key}: '{value}' ({detail})")]
pub struct EnvError {
    /// Variable name
    pub key: String,
    /// Raw value
    pub value: String,
    /// Parser message
    pub detail: String,
}

/// Parse a variable into `T`, `Ok(None)` when unset
pub fn parse_var<T>(env: &impl EnvLookup, key: &str) -> Result<Option<T>, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env.get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| EnvError {
            key: key.to_string(),
            value: raw.clone(),
            detail: e.to_string(),
        }),
    }
}

/// Parse a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`)
pub fn parse_bool(env: &impl EnvLookup, key: &str) -> Result<Option<bool>, EnvError> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvError {
            key: key.to_string(),
            value: raw,
            detail: "expected a boolean".to_string(),
        }),
    }
}
