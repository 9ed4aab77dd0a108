//! Environment configuration table (SPEC_FULL.md §6).
//!
//! Precedence is CLI argument > environment variable > built-in default,
//! resolved once at startup and passed by value into the core rather than
//! read from a global (dependency injection, per the process-wide-registry
//! redesign note).

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub vertex_credentials_path: Option<String>,
    pub vertex_project_id: Option<String>,
    pub vertex_location: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub max_tool_iterations: usize,
    pub history_group_budget: usize,
    pub loop_delay: Duration,
    pub snippet_char_cap: usize,
    pub aggregate_char_cap: usize,
    pub http_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: None,
            api_key: None,
            vertex_credentials_path: None,
            vertex_project_id: None,
            vertex_location: None,
            openrouter_api_key: None,
            tavily_api_key: None,
            max_tool_iterations: 5,
            history_group_budget: 10,
            loop_delay: Duration::from_millis(1500),
            snippet_char_cap: 150,
            aggregate_char_cap: 2500,
            http_port: 8080,
        }
    }
}

/// CLI overrides accepted ahead of environment variables. Every field is
/// optional; unset fields fall through to the environment, then the default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl Config {
    /// Resolve configuration from `.env` (if present), process environment,
    /// and explicit CLI overrides, in that order of increasing precedence.
    pub fn load(overrides: ConfigOverrides) -> Self {
        let _ = dotenvy::dotenv();

        let mut cfg = Config {
            provider: env_or("SONA_PROVIDER", "local"),
            model: env::var("SONA_MODEL").ok(),
            api_key: env::var("SONA_API_KEY").ok(),
            vertex_credentials_path: env::var("ANTHROPIC_VERTEX_CREDENTIALS_PATH").ok(),
            vertex_project_id: env::var("ANTHROPIC_VERTEX_PROJECT_ID").ok(),
            vertex_location: env::var("ANTHROPIC_VERTEX_LOCATION").ok(),
            openrouter_api_key: env::var("OPENROUTER_API_KEY").ok(),
            tavily_api_key: env::var("TAVILY_API_KEY").ok(),
            max_tool_iterations: env_or_parse("SONA_MAX_TOOL_ITERATIONS", 5),
            history_group_budget: env_or_parse("SONA_HISTORY_GROUP_BUDGET", 10),
            loop_delay: Duration::from_secs_f64(env_or_parse("SONA_LOOP_DELAY_SECS", 1.5)),
            snippet_char_cap: env_or_parse("SONA_SNIPPET_CHAR_CAP", 150),
            aggregate_char_cap: env_or_parse("SONA_AGGREGATE_CHAR_CAP", 2500),
            http_port: env_or_parse("SONA_HTTP_PORT", 8080),
        };

        if let Some(provider) = overrides.provider {
            cfg.provider = provider;
        }
        if let Some(model) = overrides.model {
            cfg.model = Some(model);
        }
        if let Some(api_key) = overrides.api_key {
            cfg.api_key = Some(api_key);
        }

        cfg
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.max_tool_iterations, 5);
        assert_eq!(cfg.history_group_budget, 10);
        assert_eq!(cfg.loop_delay, Duration::from_millis(1500));
        assert_eq!(cfg.snippet_char_cap, 150);
        assert_eq!(cfg.aggregate_char_cap, 2500);
    }

    #[test]
    fn overrides_take_precedence_over_default() {
        let cfg = Config::load(ConfigOverrides {
            provider: Some("openrouter".to_string()),
            model: Some("anthropic/claude-sonnet-4".to_string()),
            api_key: None,
        });
        assert_eq!(cfg.provider, "openrouter");
        assert_eq!(cfg.model.as_deref(), Some("anthropic/claude-sonnet-4"));
    }
}
