//! Agent configuration, read once at startup.
//!
//! Environment variables:
//! - `AGENTCRAFT_PROVIDER`: `gemini` (default) or `openai`
//! - `GEMINI_API_KEY` / `OPENAI_API_KEY`: credential for the chosen provider (required,
//!   except `openai` with a base URL, which talks to a keyless local server)
//! - `AGENTCRAFT_BASE_URL`: provider endpoint override
//! - `AGENTCRAFT_MODEL`: model identifier
//! - `AGENTCRAFT_WORKING_DIR`: working root (default `./calculator`)
//! - `AGENTCRAFT_MAX_FILE_CHARS`: read budget in characters (default 10000)
//! - `AGENTCRAFT_SCRIPT_TIMEOUT_SECS`: script timeout (default 30)
//! - `AGENTCRAFT_MAX_ITERATIONS`: loop cap (default 20)
//! - `AGENTCRAFT_PYTHON`: interpreter for `run_python_file` (default `python3`)

use agentcraft_error::{Error, Result};
use agentcraft_runtime::{GatewayLimits, ProviderConfig, ProviderType};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_WORKING_DIR: &str = "./calculator";
pub const DEFAULT_MAX_FILE_CHARS: usize = 10_000;
pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub provider: ProviderType,
    pub api_key: String,
    /// Endpoint override, e.g. an OpenAI-compatible local server
    pub base_url: Option<String>,
    pub model: String,
    /// Directory every tool call is confined to
    pub working_dir: PathBuf,
    pub max_file_chars: usize,
    pub script_timeout: Duration,
    pub max_iterations: usize,
    pub interpreter: String,
    /// Echo tool arguments, results and token counts on stdout
    pub verbose: bool,
}

impl AgentConfig {
    /// Defaults for `provider` with the given credential
    pub fn new(provider: ProviderType, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: None,
            model: provider.default_model().to_string(),
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            max_file_chars: DEFAULT_MAX_FILE_CHARS,
            script_timeout: Duration::from_secs(DEFAULT_SCRIPT_TIMEOUT_SECS),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            interpreter: DEFAULT_INTERPRETER.to_string(),
            verbose: false,
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source shaped like the environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("AGENTCRAFT_PROVIDER") {
            Some(name) => ProviderType::parse(&name).ok_or_else(|| {
                Error::config_invalid(format!("Unknown provider \"{}\"", name))
                    .with_operation("config::from_env")
                    .with_context("variable", "AGENTCRAFT_PROVIDER")
            })?,
            None => ProviderType::Gemini,
        };

        let base_url = lookup("AGENTCRAFT_BASE_URL").filter(|v| !v.trim().is_empty());
        let key_var = provider.api_key_var();
        let api_key = match lookup(key_var).filter(|v| !v.trim().is_empty()) {
            Some(key) => key,
            // OpenAI-compatible local servers usually take no key.
            None if provider == ProviderType::OpenAI && base_url.is_some() => String::new(),
            None => {
                return Err(Error::config_invalid(format!(
                    "{} environment variable not set.",
                    key_var
                ))
                .with_operation("config::from_env")
                .with_context("variable", key_var))
            }
        };

        let mut config = Self::new(provider, api_key);
        config.base_url = base_url;
        if let Some(model) = lookup("AGENTCRAFT_MODEL") {
            config.model = model;
        }
        if let Some(dir) = lookup("AGENTCRAFT_WORKING_DIR") {
            config.working_dir = PathBuf::from(dir);
        }
        if let Some(python) = lookup("AGENTCRAFT_PYTHON") {
            config.interpreter = python;
        }
        config.max_file_chars =
            parse_var(&lookup, "AGENTCRAFT_MAX_FILE_CHARS", DEFAULT_MAX_FILE_CHARS)?;
        config.script_timeout = Duration::from_secs(parse_var(
            &lookup,
            "AGENTCRAFT_SCRIPT_TIMEOUT_SECS",
            DEFAULT_SCRIPT_TIMEOUT_SECS,
        )?);
        config.max_iterations =
            parse_var(&lookup, "AGENTCRAFT_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;

        config.validate()?;
        Ok(config)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Reject values the loop or the gateway cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::config_invalid("Maximum iterations must be at least 1")
                .with_operation("config::validate"));
        }
        if self.script_timeout.is_zero() {
            return Err(Error::config_invalid("Script timeout must be at least 1 second")
                .with_operation("config::validate"));
        }
        if self.max_file_chars == 0 {
            return Err(Error::config_invalid("Maximum file size must be at least 1 character")
                .with_operation("config::validate"));
        }
        if self.interpreter.trim().is_empty() {
            return Err(Error::config_invalid("Interpreter must not be empty")
                .with_operation("config::validate"));
        }
        Ok(())
    }

    /// Limits handed to the tool gateway
    pub fn gateway_limits(&self) -> GatewayLimits {
        GatewayLimits {
            max_file_chars: self.max_file_chars,
            script_timeout: self.script_timeout,
            interpreter: self.interpreter.clone(),
            ..GatewayLimits::default()
        }
    }

    /// Provider settings for [`agentcraft_runtime::AnyProvider::from_config`]
    pub fn provider_config(&self) -> ProviderConfig {
        let config = match (self.provider, &self.base_url) {
            (ProviderType::OpenAI, Some(url)) if self.api_key.is_empty() => {
                return ProviderConfig::local(url, &self.model);
            }
            (ProviderType::Gemini, _) => ProviderConfig::gemini(&self.api_key),
            (ProviderType::OpenAI, _) => ProviderConfig::openai(&self.api_key),
        };
        let config = config.with_model(&self.model);
        match &self.base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            Error::config_invalid(format!("Invalid value \"{}\" for {}: {}", raw, key, e))
                .with_operation("config::from_env")
                .with_context("variable", key)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcraft_error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();

        assert_eq!(config.provider, ProviderType::Gemini);
        assert_eq!(config.model, "gemini-2.0-flash-001");
        assert_eq!(config.working_dir, PathBuf::from("./calculator"));
        assert_eq!(config.max_file_chars, 10_000);
        assert_eq!(config.script_timeout, Duration::from_secs(30));
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.interpreter, "python3");
        assert!(!config.verbose);
    }

    #[test]
    fn test_missing_key() {
        let err = AgentConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.message(), "GEMINI_API_KEY environment variable not set.");

        let err = AgentConfig::from_lookup(lookup(&[
            ("AGENTCRAFT_PROVIDER", "openai"),
            ("GEMINI_API_KEY", "k"),
        ]))
        .unwrap_err();
        assert_eq!(err.message(), "OPENAI_API_KEY environment variable not set.");
    }

    #[test]
    fn test_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("AGENTCRAFT_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk"),
            ("AGENTCRAFT_BASE_URL", "http://localhost:11434/v1"),
            ("AGENTCRAFT_MODEL", "qwen2.5-coder"),
            ("AGENTCRAFT_WORKING_DIR", "/tmp/sandbox"),
            ("AGENTCRAFT_MAX_FILE_CHARS", "500"),
            ("AGENTCRAFT_SCRIPT_TIMEOUT_SECS", "5"),
            ("AGENTCRAFT_MAX_ITERATIONS", "3"),
            ("AGENTCRAFT_PYTHON", "python3.12"),
        ]))
        .unwrap();

        assert_eq!(config.provider, ProviderType::OpenAI);
        assert_eq!(config.max_file_chars, 500);
        assert_eq!(config.script_timeout, Duration::from_secs(5));
        assert_eq!(config.max_iterations, 3);

        let provider = config.provider_config();
        assert_eq!(provider.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(provider.default_model.as_deref(), Some("qwen2.5-coder"));

        let limits = config.gateway_limits();
        assert_eq!(limits.interpreter, "python3.12");
        assert_eq!(limits.script_extension, "py");
    }

    #[test]
    fn test_keyless_local_server() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("AGENTCRAFT_PROVIDER", "openai"),
            ("AGENTCRAFT_BASE_URL", "http://localhost:11434/v1"),
            ("AGENTCRAFT_MODEL", "qwen2.5-coder"),
        ]))
        .unwrap();

        let provider = config.provider_config();
        assert_eq!(provider.provider_type, ProviderType::OpenAI);
        assert!(provider.api_key.is_none());
        assert_eq!(provider.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(provider.default_model.as_deref(), Some("qwen2.5-coder"));
        assert_eq!(provider.timeout_secs, Some(300));

        // Gemini has no keyless endpoint.
        let err = AgentConfig::from_lookup(lookup(&[(
            "AGENTCRAFT_BASE_URL",
            "http://localhost:8080",
        )]))
        .unwrap_err();
        assert_eq!(err.message(), "GEMINI_API_KEY environment variable not set.");
    }

    #[test]
    fn test_invalid_values() {
        let err = AgentConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("AGENTCRAFT_MAX_ITERATIONS", "many"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("AGENTCRAFT_MAX_ITERATIONS"));

        let err = AgentConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("AGENTCRAFT_SCRIPT_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = AgentConfig::from_lookup(lookup(&[
            ("AGENTCRAFT_PROVIDER", "bard"),
            ("GEMINI_API_KEY", "k"),
        ]))
        .unwrap_err();
        assert!(err.message().contains("bard"));
    }

    #[test]
    fn test_builder_validation() {
        let config = AgentConfig::new(ProviderType::Gemini, "k").with_max_iterations(0);
        assert!(config.validate().is_err());

        let config = AgentConfig::new(ProviderType::Gemini, "k")
            .with_max_iterations(5)
            .with_model("gemini-2.5-pro")
            .with_verbose(true);
        assert!(config.validate().is_ok());
        assert_eq!(config.provider_config().default_model.as_deref(), Some("gemini-2.5-pro"));
    }
}
