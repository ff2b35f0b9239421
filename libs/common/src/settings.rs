//! Environment-backed configuration loading
//!
//! Every service reads its settings from process environment variables.
//! Keys are matched case-insensitively, so `JWT_SECRET` is looked up as
//! `jwt_secret`.

use config::{Config, ConfigError, Environment};

/// Build a configuration snapshot from the environment on top of `defaults`
pub fn load(defaults: &[(&str, &str)]) -> Result<Config, ConfigError> {
    defaults
        .iter()
        .try_fold(Config::builder(), |builder, (key, value)| {
            builder.set_default(*key, value.to_string())
        })?
        .add_source(Environment::default())
        .build()
}

/// Read an optional string, treating blank values as unset
pub fn optional_string(settings: &Config, key: &str) -> Option<String> {
    settings
        .get_string(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
