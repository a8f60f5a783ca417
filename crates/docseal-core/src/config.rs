//! # Environment Configuration Helpers
//!
//! Every crate reads its configuration once at process start through an
//! [`EnvSource`]. Production passes [`EnvSource::process`]; tests pass a
//! map so they never mutate the real process environment.
//!
//! Empty values are treated as unset, matching how `.env` files are usually
//! written (`S3_BUCKET=`).

use std::collections::HashMap;
use std::str::FromStr;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(var: &str, value: &str, reason: impl std::fmt::Display) -> Self {
        Self::Invalid {
            var: var.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where configuration values come from.
pub enum EnvSource {
    Process,
    Map(HashMap<String, String>),
}

impl EnvSource {
    /// The real process environment.
    pub fn process() -> Self {
        Self::Process
    }

    /// A fixed set of variables.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Non-empty value of `var`, if set.
    pub fn get(&self, var: &str) -> Option<String> {
        let raw = match self {
            Self::Process => std::env::var(var).ok(),
            Self::Map(map) => map.get(var).cloned(),
        };
        raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    /// Value of `var`, or an error naming it.
    pub fn require(&self, var: &str) -> Result<String, ConfigError> {
        self.get(var).ok_or_else(|| ConfigError::Missing(var.to_string()))
    }

    /// Value of `var`, or `default`.
    pub fn string_or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    /// Parse `var`, falling back to `default` when unset.
    pub fn parse_or<T>(&self, var: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(var) {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::invalid(var, &raw, e)),
            None => Ok(default),
        }
    }

    /// Boolean flag. Only `true`/`1`/`yes` (any case) count as set.
    pub fn flag(&self, var: &str, default: bool) -> bool {
        match self.get(var) {
            Some(raw) => matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_count_as_unset() {
        let env = EnvSource::from_pairs([("A", ""), ("B", "  x ")]);
        assert_eq!(env.get("A"), None);
        assert_eq!(env.get("B").as_deref(), Some("x"));
        assert_eq!(env.string_or("A", "dflt"), "dflt");
    }

    #[test]
    fn parse_or_reports_variable_and_value() {
        let env = EnvSource::from_pairs([("SIZE", "big")]);
        let err = env.parse_or::<u32>("SIZE", 1).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, ref value, .. } if var == "SIZE" && value == "big"));
        assert_eq!(env.parse_or::<u32>("OTHER", 7).unwrap(), 7);
    }

    #[test]
    fn flags_and_required() {
        let env = EnvSource::from_pairs([("ON", "TRUE"), ("OFF", "no")]);
        assert!(env.flag("ON", false));
        assert!(!env.flag("OFF", true));
        assert!(env.flag("UNSET", true));
        assert_eq!(
            env.require("MISSING").unwrap_err(),
            ConfigError::Missing("MISSING".into())
        );
    }
}
