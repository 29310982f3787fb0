//! Server Configuration

use std::str::FromStr;
use std::time::Duration;

use agent_core::Strategy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_ITERATIONS: usize = 15;
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Budget for one top-level invocation
    pub invoke_timeout: Duration,

    /// Iteration cap for the single-step loop
    pub max_iterations: usize,

    pub default_model: String,
    pub default_strategy: Strategy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            invoke_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            default_model: DEFAULT_MODEL.into(),
            default_strategy: Strategy::PlanAndExecute,
        }
    }
}

impl ServerConfig {
    /// Read `BIND_ADDR`, `INVOKE_TIMEOUT_SECS`, `MAX_ITERATIONS`,
    /// `DEFAULT_MODEL` and `DEFAULT_STRATEGY`. Invalid values keep their
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_addr: value("BIND_ADDR").unwrap_or(defaults.bind_addr),
            invoke_timeout: Duration::from_secs(parse_or(
                "INVOKE_TIMEOUT_SECS",
                value("INVOKE_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )),
            max_iterations: parse_or(
                "MAX_ITERATIONS",
                value("MAX_ITERATIONS"),
                defaults.max_iterations,
            ),
            default_model: value("DEFAULT_MODEL").unwrap_or(defaults.default_model),
            default_strategy: parse_or(
                "DEFAULT_STRATEGY",
                value("DEFAULT_STRATEGY"),
                defaults.default_strategy,
            ),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, "invalid setting, using default");
        default
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.invoke_timeout, Duration::from_secs(120));
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.default_model, "gpt-3.5-turbo");
        assert_eq!(config.default_strategy, Strategy::PlanAndExecute);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("INVOKE_TIMEOUT_SECS", "30"),
            ("DEFAULT_STRATEGY", "zero-shot-react"),
            ("DEFAULT_MODEL", "gpt-4"),
        ]);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.invoke_timeout, Duration::from_secs(30));
        assert_eq!(config.default_strategy, Strategy::SingleStepReasoning);
        assert_eq!(config.default_model, "gpt-4");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("MAX_ITERATIONS", "many"),
            ("DEFAULT_STRATEGY", "tree-of-thought"),
            ("DEFAULT_MODEL", "  "),
        ]);
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.default_strategy, Strategy::PlanAndExecute);
        assert_eq!(config.default_model, "gpt-3.5-turbo");
    }
}
