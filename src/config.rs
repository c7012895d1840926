//! Environment-derived settings that must be present before any API call.
use crate::error::ConfigError;
use std::env;

/// Token variables checked in priority order.
pub const TOKEN_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Resolve the API token from the process environment.
pub fn token_from_env() -> Result<String, ConfigError> {
    resolve_token(|name| env::var(name).ok())
}

/// Resolve the API token through `lookup`, skipping blank values.
pub fn resolve_token<F>(lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    TOKEN_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or(ConfigError::MissingEnv("GH_TOKEN or GITHUB_TOKEN"))
}
