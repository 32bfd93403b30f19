//! Static model registry.
//!
//! Maps model identifiers to their provider, context-window size and
//! pricing. The registry is plain data: provider-specific behaviour is
//! limited to a handful of numeric fields, so there is no per-provider
//! type hierarchy. Unknown identifiers resolve to a conservative default
//! window of [`DEFAULT_CONTEXT_WINDOW`] tokens.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::CtxWindowError;

/// Context window used for models the registry does not know.
pub const DEFAULT_CONTEXT_WINDOW: usize = 4096;

/// Provider selected when none is specified.
pub const DEFAULT_PROVIDER: Provider = Provider::OpenAi;

/// Model selected when none is specified.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// AI provider serving a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CtxWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            _ => Err(CtxWindowError::unknown_provider(s)),
        }
    }
}

/// Price in USD per 1000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenCost {
    pub input: f64,
    pub output: f64,
}

/// Everything the registry knows about one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Identifier sent to the provider (e.g. `gpt-4o`).
    pub id: String,
    /// Display name.
    pub name: String,
    pub provider: Provider,
    /// Maximum prompt + reply tokens per request.
    pub context_window: usize,
    #[serde(default = "default_true")]
    pub supports_streaming: bool,
    #[serde(default)]
    pub cost_per_1k_tokens: TokenCost,
}

fn default_true() -> bool {
    true
}

impl ModelProfile {
    /// Estimated USD cost of a request with the given token counts.
    pub fn estimate_cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        (input_tokens as f64 / 1000.0) * self.cost_per_1k_tokens.input
            + (output_tokens as f64 / 1000.0) * self.cost_per_1k_tokens.output
    }
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

/// `(id, name, provider, context_window, input $/1k, output $/1k)`.
const BUILTIN_MODELS: &[(&str, &str, Provider, usize, f64, f64)] = &[
    ("gpt-4o", "GPT-4o", Provider::OpenAi, 128_000, 0.005, 0.015),
    ("gpt-4o-mini", "GPT-4o Mini", Provider::OpenAi, 128_000, 0.00015, 0.0006),
    ("gpt-4-turbo", "GPT-4 Turbo", Provider::OpenAi, 128_000, 0.01, 0.03),
    ("gpt-4", "GPT-4", Provider::OpenAi, 8192, 0.03, 0.06),
    ("gpt-3.5-turbo", "GPT-3.5 Turbo", Provider::OpenAi, 16_385, 0.0005, 0.0015),
    ("gemini-2.0-flash", "Gemini 2.0 Flash", Provider::Gemini, 1_000_000, 0.0, 0.0),
    ("gemini-2.5-flash-lite", "Gemini 2.5 Flash Lite", Provider::Gemini, 1_000_000, 0.0, 0.0),
    ("gemini-1.5-pro", "Gemini 1.5 Pro", Provider::Gemini, 1_000_000, 0.00125, 0.005),
    ("gemini-1.5-flash", "Gemini 1.5 Flash", Provider::Gemini, 1_000_000, 0.000075, 0.0003),
];

fn builtin_profiles() -> Vec<ModelProfile> {
    BUILTIN_MODELS
        .iter()
        .map(|&(id, name, provider, context_window, input, output)| ModelProfile {
            id: id.to_string(),
            name: name.to_string(),
            provider,
            context_window,
            supports_streaming: true,
            cost_per_1k_tokens: TokenCost { input, output },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable lookup table of model profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRegistry {
    models: Vec<ModelProfile>,
    default_context_window: usize,
}

impl ModelRegistry {
    /// The built-in OpenAI and Gemini models.
    pub fn builtin() -> Self {
        Self {
            models: builtin_profiles(),
            default_context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// Add `extra` profiles. A profile whose id is already present
    /// replaces the existing entry in place; new ids are appended.
    pub fn with_models(mut self, extra: impl IntoIterator<Item = ModelProfile>) -> Self {
        for profile in extra {
            match self.models.iter_mut().find(|m| m.id == profile.id) {
                Some(existing) => *existing = profile,
                None => self.models.push(profile),
            }
        }
        self
    }

    /// Change the window reported for unknown models. Zero is ignored.
    pub fn with_default_context_window(mut self, tokens: usize) -> Self {
        if tokens > 0 {
            self.default_context_window = tokens;
        }
        self
    }

    /// Context-window size for `model_id`, or the default for unknown ids.
    pub fn context_window(&self, model_id: &str) -> usize {
        self.find_model(model_id)
            .map_or(self.default_context_window, |m| m.context_window)
    }

    /// Window reported for unknown models.
    pub fn default_context_window(&self) -> usize {
        self.default_context_window
    }

    /// Models served by `provider`, in table order.
    pub fn models_for_provider(&self, provider: Provider) -> Vec<&ModelProfile> {
        self.models
            .iter()
            .filter(|m| m.provider == provider)
            .collect()
    }

    /// Exact-id lookup.
    pub fn find_model(&self, model_id: &str) -> Option<&ModelProfile> {
        self.models.iter().find(|m| m.id == model_id)
    }

    pub fn all_models(&self) -> &[ModelProfile] {
        &self.models
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Shared built-in registry.
pub fn builtin() -> &'static ModelRegistry {
    static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ModelRegistry::builtin)
}

/// Context window for `model_id` from the built-in registry.
pub fn context_window(model_id: &str) -> usize {
    builtin().context_window(model_id)
}

/// Built-in models served by `provider`.
pub fn models_for_provider(provider: Provider) -> Vec<&'static ModelProfile> {
    builtin().models_for_provider(provider)
}

/// Look up a built-in model.
pub fn find_model(model_id: &str) -> Option<&'static ModelProfile> {
    builtin().find_model(model_id)
}

/// All built-in models.
pub fn all_models() -> &'static [ModelProfile] {
    builtin().all_models()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
