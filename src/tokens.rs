//! Token estimation for context budgeting.
//!
//! Provides a trait-based architecture for token counting, with a built-in
//! character heuristic as the default implementation for every model
//! family. Real tokenizers can be plugged in per family by implementing
//! the [`TokenEstimator`] trait and handing it to
//! [`TokenCounter::with_estimator`].
//!
//! Counts are approximate but deterministic and monotonic in text length.
//! Counting two texts separately and summing can exceed the count of their
//! concatenation by at most one token, because each count rounds up.

use std::fmt;
use std::sync::Arc;

use crate::message::Message;
use crate::registry::{self, ModelRegistry, Provider};

/// Framing cost (role, delimiters) added once per message.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Conversation priming cost added once per counted message list.
pub const PRIMING_OVERHEAD_TOKENS: usize = 3;

/// Fallback ratio: roughly four characters per token.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

// ---------------------------------------------------------------------------
// Trait (extensibility point)
// ---------------------------------------------------------------------------

/// Estimates token counts for a given text.
///
/// Implementations must be deterministic, thread-safe and immutable once
/// constructed; a [`TokenCounter`] shares them across threads.
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in `text`.
    fn estimate(&self, text: &str) -> usize;

    /// Human-readable name of this estimator.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Model families
// ---------------------------------------------------------------------------

/// Tokenization families. Models within a family share an estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    OpenAi,
    Gemini,
    /// Anything else; counted with the fallback estimator.
    Unknown,
}

impl ModelFamily {
    /// Guess the family from an identifier the registry does not know.
    pub fn from_model_id(model_id: &str) -> Self {
        let lower = model_id.to_lowercase();
        if lower.starts_with("gpt-")
            || lower.starts_with("chatgpt")
            || lower.starts_with("o1")
            || lower.starts_with("o3")
        {
            Self::OpenAi
        } else if lower.starts_with("gemini") {
            Self::Gemini
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Unknown => "unknown",
        }
    }
}

impl From<Provider> for ModelFamily {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::OpenAi => Self::OpenAi,
            Provider::Gemini => Self::Gemini,
        }
    }
}

// ---------------------------------------------------------------------------
// Character-based estimator
// ---------------------------------------------------------------------------

/// Token estimator that uses a character-count heuristic.
///
/// Characters are Unicode scalar values, so multi-byte text is not
/// over-counted relative to ASCII.
#[derive(Debug, Clone)]
pub struct CharEstimator {
    family: ModelFamily,
    chars_per_token: f64,
}

impl CharEstimator {
    /// Create an estimator with the default ratio.
    pub fn new(family: ModelFamily) -> Self {
        Self::with_ratio(family, DEFAULT_CHARS_PER_TOKEN)
    }

    /// Create an estimator with a custom characters-per-token ratio.
    /// Non-positive or non-finite ratios fall back to the default.
    pub fn with_ratio(family: ModelFamily, chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self {
            family,
            chars_per_token,
        }
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }
}

impl TokenEstimator for CharEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as f64;
        (chars / self.chars_per_token).ceil() as usize
    }

    fn name(&self) -> &str {
        self.family.as_str()
    }
}

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// Counts tokens for text and message lists, choosing an estimator by the
/// model's family as recorded in the registry.
#[derive(Clone)]
pub struct TokenCounter {
    registry: Arc<ModelRegistry>,
    openai: Arc<dyn TokenEstimator>,
    gemini: Arc<dyn TokenEstimator>,
    fallback: Arc<dyn TokenEstimator>,
}

impl TokenCounter {
    /// Character estimators for every family, resolving models against
    /// `registry`.
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            openai: Arc::new(CharEstimator::new(ModelFamily::OpenAi)),
            gemini: Arc::new(CharEstimator::new(ModelFamily::Gemini)),
            fallback: Arc::new(CharEstimator::new(ModelFamily::Unknown)),
        }
    }

    /// Replace the estimator used for `family`.
    pub fn with_estimator(
        mut self,
        family: ModelFamily,
        estimator: impl TokenEstimator + 'static,
    ) -> Self {
        let estimator: Arc<dyn TokenEstimator> = Arc::new(estimator);
        match family {
            ModelFamily::OpenAi => self.openai = estimator,
            ModelFamily::Gemini => self.gemini = estimator,
            ModelFamily::Unknown => self.fallback = estimator,
        }
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Family for `model_id`: the registry's provider when known,
    /// otherwise a guess from the id.
    pub fn family_for(&self, model_id: &str) -> ModelFamily {
        self.registry
            .find_model(model_id)
            .map(|m| ModelFamily::from(m.provider))
            .unwrap_or_else(|| ModelFamily::from_model_id(model_id))
    }

    /// Estimator that will be used for `model_id`.
    pub fn estimator_for(&self, model_id: &str) -> &dyn TokenEstimator {
        match self.family_for(model_id) {
            ModelFamily::OpenAi => self.openai.as_ref(),
            ModelFamily::Gemini => self.gemini.as_ref(),
            ModelFamily::Unknown => self.fallback.as_ref(),
        }
    }

    /// Tokens in `text` for `model_id`. Never fails.
    pub fn count_tokens(&self, text: &str, model_id: &str) -> usize {
        self.estimator_for(model_id).estimate(text)
    }

    /// Cost of one message inside a list: content plus framing overhead.
    pub fn count_message_tokens(&self, message: &Message, model_id: &str) -> usize {
        self.count_tokens(&message.content, model_id) + MESSAGE_OVERHEAD_TOKENS
    }

    /// Tokens for a whole message list, including framing per message and
    /// the priming overhead. An empty list counts as the priming overhead.
    pub fn count_messages_tokens<'a>(
        &self,
        messages: impl IntoIterator<Item = &'a Message>,
        model_id: &str,
    ) -> usize {
        let estimator = self.estimator_for(model_id);
        messages
            .into_iter()
            .map(|m| estimator.estimate(&m.content) + MESSAGE_OVERHEAD_TOKENS)
            .sum::<usize>()
            + PRIMING_OVERHEAD_TOKENS
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new(Arc::new(registry::builtin().clone()))
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter")
            .field("models", &self.registry.all_models().len())
            .field("openai", &self.openai.name())
            .field("gemini", &self.gemini.name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Count tokens in `text` with the default counter.
pub fn count_tokens(text: &str, model_id: &str) -> usize {
    TokenCounter::default().count_tokens(text, model_id)
}

/// Count tokens for `messages` with the default counter.
pub fn count_messages_tokens(messages: &[Message], model_id: &str) -> usize {
    TokenCounter::default().count_messages_tokens(messages, model_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
