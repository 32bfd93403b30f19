use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::context::{ContextWindowManager, DEFAULT_RESPONSE_RESERVE};
use crate::error::{CtxWindowError, Result};
use crate::registry::{ModelProfile, ModelRegistry, DEFAULT_CONTEXT_WINDOW, DEFAULT_MODEL};
use crate::tokens::{CharEstimator, ModelFamily, TokenCounter, DEFAULT_CHARS_PER_TOKEN};

/// File name searched for in the working directory.
pub const CONFIG_FILE_NAME: &str = "ctxwindow.toml";

/// Top-level configuration for ctxwindow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_model: String,
    pub response_reserve: usize,
    pub default_context_window: usize,
    pub estimation: EstimationConfig,
    /// Extra or overriding registry entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelProfile>,
}

/// Characters-per-token ratios for the character estimator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EstimationConfig {
    /// Ratio for families without an explicit override.
    pub chars_per_token: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<f64>,
}

// --- Defaults ---

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            response_reserve: DEFAULT_RESPONSE_RESERVE,
            default_context_window: DEFAULT_CONTEXT_WINDOW,
            estimation: EstimationConfig::default(),
            models: Vec::new(),
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            openai: None,
            gemini: None,
        }
    }
}

impl EstimationConfig {
    fn ratio_for(&self, family: ModelFamily) -> f64 {
        match family {
            ModelFamily::OpenAi => self.openai.unwrap_or(self.chars_per_token),
            ModelFamily::Gemini => self.gemini.unwrap_or(self.chars_per_token),
            ModelFamily::Unknown => self.chars_per_token,
        }
    }
}

// --- Config methods ---

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CtxWindowError::io(format!("reading config from '{}'", path.display()), e)
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CtxWindowError::config_with_source("failed to parse config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the discovered config file, or defaults when none exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match find_config_file(explicit) {
            Some(path) => Self::load(&path),
            None if explicit.is_some() => Err(CtxWindowError::config(format!(
                "config file '{}' not found",
                explicit.map(|p| p.display().to_string()).unwrap_or_default()
            ))),
            None => Ok(Self::default()),
        }
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| CtxWindowError::config_with_source("failed to serialize config", e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CtxWindowError::io(
                    format!("creating config directory '{}'", parent.display()),
                    e,
                )
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            CtxWindowError::io(format!("writing config to '{}'", path.display()), e)
        })
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<()> {
        if self.default_model.trim().is_empty() {
            return Err(CtxWindowError::validation(
                "default_model",
                "must not be empty",
            ));
        }
        if self.default_context_window == 0 {
            return Err(CtxWindowError::validation(
                "default_context_window",
                "must be greater than 0",
            ));
        }
        let ratios = [
            ("estimation.chars_per_token", Some(self.estimation.chars_per_token)),
            ("estimation.openai", self.estimation.openai),
            ("estimation.gemini", self.estimation.gemini),
        ];
        for (field, ratio) in ratios {
            if let Some(r) = ratio {
                if !r.is_finite() || r <= 0.0 {
                    return Err(CtxWindowError::validation(field, "must be a positive number"));
                }
            }
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(CtxWindowError::validation("models.id", "must not be empty"));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(CtxWindowError::validation(
                    "models.id",
                    format!("duplicate model '{}'", model.id),
                ));
            }
            if model.context_window == 0 {
                return Err(CtxWindowError::validation(
                    "models.context_window",
                    format!("model '{}' must have a context window greater than 0", model.id),
                ));
            }
            let cost = model.cost_per_1k_tokens;
            if !(cost.input.is_finite() && cost.output.is_finite())
                || cost.input < 0.0
                || cost.output < 0.0
            {
                return Err(CtxWindowError::validation(
                    "models.cost_per_1k_tokens",
                    format!("model '{}' must have non-negative costs", model.id),
                ));
            }
        }
        Ok(())
    }

    /// Built-in registry extended with the configured models.
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::builtin()
            .with_models(self.models.iter().cloned())
            .with_default_context_window(self.default_context_window)
    }

    /// Token counter using the configured registry and ratios.
    pub fn token_counter(&self) -> TokenCounter {
        let mut counter = TokenCounter::new(Arc::new(self.registry()));
        for family in [ModelFamily::OpenAi, ModelFamily::Gemini, ModelFamily::Unknown] {
            counter = counter.with_estimator(
                family,
                CharEstimator::with_ratio(family, self.estimation.ratio_for(family)),
            );
        }
        counter
    }

    /// Context-window manager built from this config.
    pub fn manager(&self) -> ContextWindowManager {
        ContextWindowManager::new(self.token_counter()).with_response_reserve(self.response_reserve)
    }
}

/// Builder for constructing Config with selective overrides.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    pub fn with_reserve(mut self, reserve: usize) -> Self {
        self.config.response_reserve = reserve;
        self
    }

    pub fn with_default_context_window(mut self, tokens: usize) -> Self {
        self.config.default_context_window = tokens;
        self
    }

    pub fn with_chars_per_token(mut self, ratio: f64) -> Self {
        self.config.estimation.chars_per_token = ratio;
        self
    }

    pub fn with_model(mut self, model: ModelProfile) -> Self {
        self.config.models.push(model);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Discover the config file using standard search order:
/// 1. Explicit path (if provided)
/// 2. ./ctxwindow.toml
/// 3. ~/.ctxwindow.toml
/// 4. XDG config dir
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            return Some(p.to_path_buf());
        }
        return None;
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(home) = dirs_home() {
        let home_config = home.join(format!(".{CONFIG_FILE_NAME}"));
        if home_config.exists() {
            return Some(home_config);
        }
    }

    if let Some(proj_dirs) = ProjectDirs::from("", "", "ctxwindow") {
        let xdg = proj_dirs.config_dir().join(CONFIG_FILE_NAME);
        if xdg.exists() {
            return Some(xdg);
        }
    }

    None
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
