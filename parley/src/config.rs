//! File and environment configuration.
//!
//! A JSON file is read first (`--config PATH`, else `parley.json` in the
//! working directory when present, else built-in defaults); environment
//! variables then override individual fields.

use std::path::Path;
use std::time::Duration;

use parley_orchestrator::{DEFAULT_SYSTEM_PREAMBLE, OrchestratorConfig};
use parley_provider_openai::OpenAi;
use parley_tool::{BUILTIN_TOOLS, GoogleSearchBackend, RegistryConfig, ToolRegistry, register_builtin};
use serde::{Deserialize, Serialize};

use crate::error::ParleyError;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "parley.json";

/// Configuration for a parley deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParleyConfig {
    /// Model identifier passed to the completions API.
    pub model: String,
    /// Override for the API base URL.
    pub base_url: Option<String>,
    /// Stream tokens as they arrive.
    pub stream: bool,
    /// Log at debug level by default.
    pub debug: bool,
    /// Model-generation rounds per turn.
    pub max_rounds: usize,
    /// Wall-clock bound on one turn, in seconds. `None` disables it.
    pub turn_deadline_secs: Option<u64>,
    /// Capacity of the per-turn event channel.
    pub channel_capacity: usize,
    /// Tool executions in flight per step.
    pub max_concurrent_tools: usize,
    /// Time budget for one tool execution, in seconds.
    pub tool_timeout_secs: u64,
    /// Enabled built-in tools.
    pub tools: Vec<String>,
    /// Instruction text preceding the tool listing.
    pub system_preamble: String,

    /// From `OPENAI_API_KEY` only.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// From `GOOGLE_API_KEY` only.
    #[serde(skip)]
    pub google_api_key: Option<String>,
    /// From `GOOGLE_SEARCH_ENGINE_ID` only.
    #[serde(skip)]
    pub google_search_engine_id: Option<String>,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            model: parley_provider_openai::DEFAULT_MODEL.to_string(),
            base_url: None,
            stream: true,
            debug: false,
            max_rounds: 5,
            turn_deadline_secs: Some(120),
            channel_capacity: 64,
            max_concurrent_tools: 10,
            tool_timeout_secs: 30,
            tools: BUILTIN_TOOLS.iter().map(ToString::to_string).collect(),
            system_preamble: DEFAULT_SYSTEM_PREAMBLE.to_string(),
            api_key: None,
            google_api_key: None,
            google_search_engine_id: None,
        }
    }
}

impl ParleyConfig {
    /// Read a JSON config file.
    ///
    /// # Errors
    ///
    /// [`ParleyError::Io`] if the file cannot be read, [`ParleyError::Json`]
    /// if it is not a valid config document.
    pub fn from_path(path: &Path) -> Result<Self, ParleyError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, then
    /// apply process environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Any read, parse, or validation failure.
    pub fn load(path: Option<&Path>) -> Result<Self, ParleyError> {
        let mut config = match path {
            Some(path) => Self::from_path(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_path(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// [`ParleyError::Config`] when a numeric or boolean variable does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ParleyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("AI_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(rounds) = lookup("PARLEY_MAX_ROUNDS") {
            self.max_rounds = rounds.trim().parse().map_err(|_| {
                ParleyError::Config(format!("PARLEY_MAX_ROUNDS must be a number, got {rounds:?}"))
            })?;
        }
        if let Some(debug) = lookup("PARLEY_DEBUG") {
            self.debug = parse_flag("PARLEY_DEBUG", &debug)?;
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.google_api_key = Some(key);
        }
        if let Some(cx) = lookup("GOOGLE_SEARCH_ENGINE_ID") {
            self.google_search_engine_id = Some(cx);
        }
        Ok(())
    }

    /// Check field ranges and tool names.
    ///
    /// # Errors
    ///
    /// [`ParleyError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ParleyError> {
        if self.max_rounds == 0 {
            return Err(ParleyError::Config("max_rounds must be at least 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ParleyError::Config("channel_capacity must be at least 1".into()));
        }
        if self.max_concurrent_tools == 0 {
            return Err(ParleyError::Config("max_concurrent_tools must be at least 1".into()));
        }
        if let Some(unknown) = self.tools.iter().find(|t| !BUILTIN_TOOLS.contains(&t.as_str())) {
            return Err(ParleyError::Config(format!(
                "unknown tool {unknown:?}; available: {}",
                BUILTIN_TOOLS.join(", ")
            )));
        }
        Ok(())
    }

    /// Orchestrator settings derived from this config.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .max_rounds(self.max_rounds)
            .system_preamble(self.system_preamble.clone())
            .channel_capacity(self.channel_capacity)
            .turn_deadline(self.turn_deadline_secs.map(Duration::from_secs))
    }

    /// Registry limits derived from this config.
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_concurrent_calls: self.max_concurrent_tools,
            call_timeout: Duration::from_secs(self.tool_timeout_secs),
        }
    }

    /// A registry holding every enabled tool.
    ///
    /// # Errors
    ///
    /// [`ParleyError::Config`] for an unknown tool name,
    /// [`ParleyError::Registry`] when a tool is listed twice.
    pub fn build_registry(&self) -> Result<ToolRegistry, ParleyError> {
        let mut registry = ToolRegistry::with_config(self.registry_config());
        for name in &self.tools {
            let search = GoogleSearchBackend::from_credentials(
                self.google_api_key.clone(),
                self.google_search_engine_id.clone(),
            );
            if !register_builtin(&mut registry, name, search)? {
                return Err(ParleyError::Config(format!("unknown tool {name:?}")));
            }
        }
        Ok(registry)
    }

    /// The OpenAI model client.
    ///
    /// # Errors
    ///
    /// [`ParleyError::Config`] when no API key is configured.
    pub fn build_model(&self) -> Result<OpenAi, ParleyError> {
        let key = self
            .api_key
            .clone()
            .ok_or_else(|| ParleyError::Config("OPENAI_API_KEY is not set".into()))?;
        let mut model = OpenAi::new(key).model(self.model.clone()).streaming(self.stream);
        if let Some(url) = &self.base_url {
            model = model.base_url(url.clone());
        }
        Ok(model)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ParleyError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ParleyError::Config(format!(
            "{name} must be true or false, got {other:?}"
        ))),
    }
}
