use std::env;
use std::str::FromStr;

use super::types::{ConfigError, Environment};

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

/// Reads `key` (or `default` when unset) and parses it as `T`.
pub(super) fn env_parsed<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    parse_value(key, env_or_default(key, default))
}

pub(super) fn parse_value<T: FromStr>(field: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value })
}

/// Unset flags are off.
pub(super) fn env_flag(key: &str) -> bool {
    env_optional(key).is_some_and(|value| parse_bool(&value))
}

pub(super) fn parse_bool(value: &str) -> bool {
    ["1", "true", "yes", "on"].iter().any(|truthy| value.eq_ignore_ascii_case(truthy))
}

/// Accepts a JSON array or a comma separated list; blank input falls back
/// to the local frontend origins.
pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let raw = value.unwrap_or_default();
    let raw = raw.trim();

    let origins: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|_| ConfigError::InvalidCors(raw.to_string()))?
    } else {
        raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
    };

    if origins.is_empty() {
        Ok(DEFAULT_CORS_ORIGINS.iter().map(|origin| origin.to_string()).collect())
    } else {
        Ok(origins)
    }
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.map(|item| item.to_lowercase()).as_deref() {
        Some("production" | "prod") => Environment::Production,
        Some("staging") => Environment::Staging,
        Some("test" | "testing") => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_from_json_or_csv() {
        let json = parse_cors_origins(Some("[\"http://a\",\"http://b\"]".to_string()));
        let csv = parse_cors_origins(Some("http://a, http://b".to_string()));
        let expected = vec!["http://a".to_string(), "http://b".to_string()];
        assert_eq!(json.expect("cors json"), expected);
        assert_eq!(csv.expect("cors csv"), expected);
    }

    #[test]
    fn blank_cors_falls_back_to_local_frontends() {
        let parsed = parse_cors_origins(Some(" ".to_string())).expect("cors empty");
        assert_eq!(parsed.len(), DEFAULT_CORS_ORIGINS.len());
        assert!(parse_cors_origins(Some("[1, 2]".to_string())).is_err());
    }

    #[test]
    fn flags_are_case_insensitive() {
        assert!(parse_bool("1"));
        assert!(parse_bool("True"));
        assert!(parse_bool("YES"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn numeric_values_report_their_field() {
        assert_eq!(parse_value::<i32>("PERMISSION_ADMIN", "-1".to_string()).expect("i32"), -1);
        let err = parse_value::<u16>("REDIS_PORT", "70000".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for REDIS_PORT: 70000");
    }

    #[test]
    fn environment_aliases() {
        assert_eq!(parse_environment(Some("PROD".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }
}
