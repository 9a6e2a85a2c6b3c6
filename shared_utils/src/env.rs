use std::str::FromStr;

use thiserror::Error;

/// Failure reading a configuration value from the environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    Missing(String),

    /// The variable is set but its value does not parse into the wanted type.
    #[error("Invalid value for environment variable {name}: {message}")]
    Invalid { name: String, message: String },
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Empty values are treated as missing so that `FOO=` in a `.env` file does
/// not silently produce an empty token or URL.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, EnvError> {
    get_env_var_opt(name).ok_or_else(|| EnvError::Missing(name.to_string()))
}

/// Reads an optional environment variable. Unset and empty both yield `None`.
pub fn get_env_var_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads and parses an optional environment variable.
///
/// Returns `Ok(None)` when unset, an [`EnvError::Invalid`] when set but unparsable.
pub fn get_env_parsed<T>(name: &str) -> Result<Option<T>, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_var_opt(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| EnvError::Invalid {
            name: name.to_string(),
            message: e.to_string(),
        }),
    }
}
