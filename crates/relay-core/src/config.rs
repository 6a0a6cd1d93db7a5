use std::time::Duration;

/// How much span detail the trace builder records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceVerbosity {
    /// Root span only.
    Minimal,
    /// Root span plus one child per reasoning step (default).
    Steps,
}

impl std::str::FromStr for TraceVerbosity {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "steps" => Ok(Self::Steps),
            other => Err(ConfigError::Invalid {
                key: "RELAY_TRACE_VERBOSITY",
                value: other.to_string(),
            }),
        }
    }
}

/// Runtime configuration. Environment-driven; there is no CLI surface.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Model identifier passed to the model client.
    pub model_id: String,
    /// Model endpoint URL.
    pub model_url: String,
    /// Tool gateway endpoint URL.
    pub gateway_url: String,
    /// Session store endpoint URL.
    pub memory_url: String,
    /// Memory resource identifier within the session store.
    pub memory_id: String,
    /// Deployment region, recorded on every root span.
    pub region: String,
    /// OIDC issuer base URL; `{issuer}/.well-known/openid-configuration`
    /// must resolve to the discovery document.
    pub issuer_url: String,
    /// Expected token audience (the configured client id).
    pub audience: String,
    /// Trace collector endpoint URL. Empty disables emission.
    pub trace_url: String,
    pub trace_verbosity: TraceVerbosity,
    /// Hard cap on reasoning steps per cycle.
    pub max_steps: u32,
    /// Per-tool-call timeout.
    pub tool_timeout: Duration,
    /// HTTP listen port.
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

impl RelayConfig {
    /// Load from the process environment. Endpoints and auth settings are
    /// required; tuning knobs fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary lookup. Keeps the parsing logic testable
    /// without touching process-global environment state.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            model_id: required(&lookup, "RELAY_MODEL_ID")?,
            model_url: required(&lookup, "RELAY_MODEL_URL")?,
            gateway_url: required(&lookup, "RELAY_GATEWAY_URL")?,
            memory_url: required(&lookup, "RELAY_MEMORY_URL")?,
            memory_id: required(&lookup, "RELAY_MEMORY_ID")?,
            region: optional(&lookup, "RELAY_REGION").unwrap_or_else(|| "us-east-1".into()),
            issuer_url: required(&lookup, "RELAY_ISSUER_URL")?,
            audience: required(&lookup, "RELAY_AUDIENCE")?,
            trace_url: optional(&lookup, "RELAY_TRACE_URL").unwrap_or_default(),
            trace_verbosity: optional(&lookup, "RELAY_TRACE_VERBOSITY")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(TraceVerbosity::Steps),
            max_steps: parsed(&lookup, "RELAY_MAX_STEPS")?.unwrap_or(8),
            tool_timeout: Duration::from_secs(
                parsed(&lookup, "RELAY_TOOL_TIMEOUT_SECS")?.unwrap_or(30),
            ),
            port: parsed(&lookup, "RELAY_PORT")?.unwrap_or(8080),
        })
    }
}

fn optional<L: Fn(&str) -> Option<String>>(lookup: &L, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.is_empty())
}

fn required<L: Fn(&str) -> Option<String>>(
    lookup: &L,
    key: &'static str,
) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or(ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr, L: Fn(&str) -> Option<String>>(
    lookup: &L,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match optional(lookup, key) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // Tests go through from_lookup with a plain map, so they never touch
    // process-global environment state and stay safe under parallel runs.

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("RELAY_MODEL_ID", "claude-sonnet-4-5"),
            ("RELAY_MODEL_URL", "https://model.example/v1"),
            ("RELAY_GATEWAY_URL", "https://gateway.example/mcp"),
            ("RELAY_MEMORY_URL", "https://memory.example"),
            ("RELAY_MEMORY_ID", "mem-1122"),
            ("RELAY_ISSUER_URL", "https://issuer.example"),
            ("RELAY_AUDIENCE", "relay-client"),
        ])
    }

    fn load(vars: &HashMap<&str, &str>) -> Result<RelayConfig, ConfigError> {
        RelayConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_applied_for_optional_keys() {
        let config = load(&base()).unwrap();
        assert_eq!(config.max_steps, 8);
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert_eq!(config.port, 8080);
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.trace_verbosity, TraceVerbosity::Steps);
        assert!(config.trace_url.is_empty());
    }

    #[test]
    fn overrides_win_over_defaults() {
        let mut vars = base();
        vars.insert("RELAY_MAX_STEPS", "3");
        vars.insert("RELAY_TOOL_TIMEOUT_SECS", "5");
        vars.insert("RELAY_PORT", "9000");
        vars.insert("RELAY_REGION", "eu-west-1");
        vars.insert("RELAY_TRACE_VERBOSITY", "minimal");
        vars.insert("RELAY_TRACE_URL", "https://traces.example/v1");

        let config = load(&vars).unwrap();
        assert_eq!(config.max_steps, 3);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 9000);
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.trace_verbosity, TraceVerbosity::Minimal);
        assert_eq!(config.trace_url, "https://traces.example/v1");
    }

    #[test]
    fn missing_required_key_named_in_error() {
        let mut vars = base();
        vars.remove("RELAY_GATEWAY_URL");
        match load(&vars) {
            Err(ConfigError::Missing("RELAY_GATEWAY_URL")) => {}
            other => panic!("expected Missing(RELAY_GATEWAY_URL), got {other:?}"),
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = base();
        vars.insert("RELAY_MODEL_ID", "");
        assert!(matches!(load(&vars), Err(ConfigError::Missing("RELAY_MODEL_ID"))));
    }

    #[test]
    fn invalid_numeric_rejected() {
        let mut vars = base();
        vars.insert("RELAY_MAX_STEPS", "not-a-number");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "RELAY_MAX_STEPS", .. }));
    }

    #[test]
    fn verbosity_parses() {
        assert_eq!("minimal".parse::<TraceVerbosity>().unwrap(), TraceVerbosity::Minimal);
        assert_eq!("steps".parse::<TraceVerbosity>().unwrap(), TraceVerbosity::Steps);
        assert!("loud".parse::<TraceVerbosity>().is_err());
    }
}
