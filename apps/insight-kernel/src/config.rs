// [[RARO]]/apps/insight-kernel/src/config.rs
// Purpose: Boot-time configuration from environment variables.
// Architecture: Application Boot
// Dependencies: thiserror

use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_EVENTS_PER_RUN: usize = 50_000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KernelConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the append-only event log of a single run.
    pub max_events_per_run: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_events_per_run: DEFAULT_MAX_EVENTS_PER_RUN,
        }
    }
}

impl KernelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys fall back
    /// to defaults, set-but-invalid keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: lookup("INSIGHT_HOST")
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .unwrap_or(defaults.host),
            port: parse_var(&lookup, "INSIGHT_PORT")?.unwrap_or(defaults.port),
            max_events_per_run: parse_var(&lookup, "INSIGHT_MAX_EVENTS_PER_RUN")?
                .unwrap_or(defaults.max_events_per_run),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Zero("INSIGHT_PORT"));
        }
        if self.max_events_per_run == 0 {
            return Err(ConfigError::Zero("INSIGHT_MAX_EVENTS_PER_RUN"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = KernelConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = KernelConfig::from_lookup(lookup_from(&[
            ("INSIGHT_HOST", "127.0.0.1"),
            ("INSIGHT_PORT", " 8088 "),
            ("INSIGHT_MAX_EVENTS_PER_RUN", "250"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8088");
        assert_eq!(config.max_events_per_run, 250);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            KernelConfig::from_lookup(lookup_from(&[("INSIGHT_PORT", "http")])),
            Err(ConfigError::InvalidValue {
                key: "INSIGHT_PORT",
                value: "http".to_string()
            })
        );
        assert_eq!(
            KernelConfig::from_lookup(lookup_from(&[("INSIGHT_PORT", "0")])),
            Err(ConfigError::Zero("INSIGHT_PORT"))
        );
        let zero_cap = lookup_from(&[("INSIGHT_MAX_EVENTS_PER_RUN", "0")]);
        assert!(KernelConfig::from_lookup(zero_cap).is_err());
    }
}
