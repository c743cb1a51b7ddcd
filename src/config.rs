//! Environment-sourced configuration helpers
//!
//! Every stage reads a flat set of named values. Parsing goes through a
//! lookup function so tests can supply values without touching the process
//! environment; `from_env()` constructors pass [`env_lookup`].

use crate::error::{PipelineError, Result};
use std::str::FromStr;

/// Read a variable from the process environment
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Fetch a required, non-empty value
pub fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(PipelineError::config(key, "value is empty")),
        None => Err(PipelineError::config(key, "required setting is missing")),
    }
}

/// Fetch an optional value, falling back to `default`
pub fn optional_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse a value with `FromStr`, reporting the offending key on failure
pub fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| PipelineError::config(key, format!("cannot parse {:?}: {}", raw, e)))
}

/// Integer with a lower bound
pub fn parse_usize_at_least(key: &str, raw: &str, min: usize) -> Result<usize> {
    let value: usize = parse_value(key, raw)?;
    if value < min {
        return Err(PipelineError::config(
            key,
            format!("must be at least {}, got {}", min, value),
        ));
    }
    Ok(value)
}

/// Strict boolean: `true`/`false` in any case; nothing else
pub fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(PipelineError::config(
            key,
            format!("expected true or false, got {:?}", raw),
        )),
    }
}

/// Optional positive integer, where `None`/`null` means unbounded
pub fn parse_optional_positive(key: &str, raw: &str) -> Result<Option<usize>> {
    match raw.to_ascii_lowercase().as_str() {
        "none" | "null" => Ok(None),
        _ => parse_usize_at_least(key, raw, 1).map(Some),
    }
}
