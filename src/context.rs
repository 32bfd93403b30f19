//! Context-window pruning.
//!
//! Fits a conversation into a model's token budget by keeping every system
//! message and the most recent run of conversational messages that fits.
//! Selection happens in two passes: a reverse scan records which message
//! indices to keep, then the output is rebuilt from the original order.
//!
//! Everything here is a pure function of its inputs and the registry. A
//! budget smaller than the system messages alone still returns all system
//! messages, so the result can exceed the nominal limit in that case.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{CtxWindowError, Result};
use crate::message::{Message, Role};
use crate::registry::ModelRegistry;
use crate::tokens::TokenCounter;

/// Tokens held back for the model's reply unless configured otherwise.
pub const DEFAULT_RESPONSE_RESERVE: usize = 1000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-call budget controls for [`ContextWindowManager::prune`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneOptions {
    /// Tokens subtracted from the context window for the reply.
    pub response_reserve: usize,
    /// Explicit budget; replaces `context_window - response_reserve`.
    pub max_tokens_override: Option<usize>,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            response_reserve: DEFAULT_RESPONSE_RESERVE,
            max_tokens_override: None,
        }
    }
}

impl PruneOptions {
    pub fn with_reserve(mut self, response_reserve: usize) -> Self {
        self.response_reserve = response_reserve;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens_override = Some(max_tokens);
        self
    }
}

/// Outcome of planning a prune: which input indices survive and the token
/// arithmetic behind the decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrunePlan {
    pub model: String,
    pub context_window: usize,
    pub effective_limit: usize,
    /// Cost of the full input.
    pub total_tokens: usize,
    /// Cost of the kept messages.
    pub kept_tokens: usize,
    /// Indices into the input of kept messages, ascending.
    pub kept: Vec<usize>,
    /// Indices into the input of dropped messages, ascending.
    pub dropped: Vec<usize>,
    /// True when the input already fit and is returned untouched.
    pub identity: bool,
}

impl PrunePlan {
    /// Rebuild the pruned list from the original input, keeping input order.
    ///
    /// # Panics
    ///
    /// `messages` must be the slice the plan was built from. A shorter
    /// slice panics on an out-of-range index.
    pub fn apply<'a>(&self, messages: &'a [Message]) -> Cow<'a, [Message]> {
        if self.identity {
            return Cow::Borrowed(messages);
        }
        Cow::Owned(self.kept.iter().map(|&i| messages[i].clone()).collect())
    }

    /// Whether the kept messages exceed the effective limit. Only possible
    /// when the system messages alone do not fit.
    pub fn over_budget(&self) -> bool {
        self.kept_tokens > self.effective_limit
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Decides which messages of a conversation fit a model's context window.
#[derive(Debug, Clone)]
pub struct ContextWindowManager {
    counter: TokenCounter,
    response_reserve: usize,
}

impl ContextWindowManager {
    pub fn new(counter: TokenCounter) -> Self {
        Self {
            counter,
            response_reserve: DEFAULT_RESPONSE_RESERVE,
        }
    }

    /// Manager over `registry` with the default character estimators.
    pub fn with_registry(registry: Arc<ModelRegistry>) -> Self {
        Self::new(TokenCounter::new(registry))
    }

    /// Reserve used by [`remaining_tokens`](Self::remaining_tokens),
    /// [`would_exceed_limit`](Self::would_exceed_limit) and
    /// [`default_options`](Self::default_options).
    pub fn with_response_reserve(mut self, response_reserve: usize) -> Self {
        self.response_reserve = response_reserve;
        self
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.counter.registry()
    }

    pub fn response_reserve(&self) -> usize {
        self.response_reserve
    }

    /// Prune options carrying this manager's reserve.
    pub fn default_options(&self) -> PruneOptions {
        PruneOptions::default().with_reserve(self.response_reserve)
    }

    /// Token budget messages must fit into.
    ///
    /// Fails with [`CtxWindowError::InvalidBudget`] when the budget is zero
    /// or the reserve consumes the whole window.
    pub fn effective_limit(&self, model_id: &str, options: &PruneOptions) -> Result<usize> {
        let context_window = self.registry().context_window(model_id);
        let limit = match options.max_tokens_override {
            Some(max) => max,
            None => context_window.saturating_sub(options.response_reserve),
        };
        if limit == 0 {
            return Err(CtxWindowError::invalid_budget(
                model_id,
                context_window,
                options.response_reserve,
                options.max_tokens_override,
            ));
        }
        Ok(limit)
    }

    /// Decide which messages to keep without building the output.
    pub fn plan(
        &self,
        messages: &[Message],
        model_id: &str,
        options: &PruneOptions,
    ) -> Result<PrunePlan> {
        let context_window = self.registry().context_window(model_id);
        let effective_limit = self.effective_limit(model_id, options)?;
        let total_tokens = self.counter.count_messages_tokens(messages, model_id);

        let mut plan = PrunePlan {
            model: model_id.to_string(),
            context_window,
            effective_limit,
            total_tokens,
            kept_tokens: total_tokens,
            kept: (0..messages.len()).collect(),
            dropped: Vec::new(),
            identity: true,
        };
        if total_tokens <= effective_limit {
            return Ok(plan);
        }

        let (system, conversation): (Vec<usize>, Vec<usize>) =
            (0..messages.len()).partition(|&i| messages[i].role == Role::System);

        let mut running = self
            .counter
            .count_messages_tokens(system.iter().map(|&i| &messages[i]), model_id);
        let mut keep = vec![false; messages.len()];
        for &i in &system {
            keep[i] = true;
        }

        // Newest first; the first message that does not fit ends the scan.
        // Each candidate is charged as a one-message request, priming included.
        for &i in conversation.iter().rev() {
            let cost = self
                .counter
                .count_messages_tokens(std::iter::once(&messages[i]), model_id);
            if running + cost > effective_limit {
                break;
            }
            running += cost;
            keep[i] = true;
        }

        let (kept, dropped): (Vec<usize>, Vec<usize>) =
            (0..messages.len()).partition(|&i| keep[i]);
        plan.kept_tokens = running;
        plan.kept = kept;
        plan.dropped = dropped;
        plan.identity = false;
        Ok(plan)
    }

    /// Messages that fit the budget for `model_id`.
    ///
    /// Returns the input borrowed when it already fits. Otherwise returns
    /// all system messages and the newest conversational messages that
    /// fit, in their original order.
    pub fn prune<'a>(
        &self,
        messages: &'a [Message],
        model_id: &str,
        options: &PruneOptions,
    ) -> Result<Cow<'a, [Message]>> {
        Ok(self.plan(messages, model_id, options)?.apply(messages))
    }

    /// Tokens still available for new content, after the reply reserve.
    pub fn remaining_tokens(&self, messages: &[Message], model_id: &str) -> usize {
        self.registry()
            .context_window(model_id)
            .saturating_sub(self.counter.count_messages_tokens(messages, model_id))
            .saturating_sub(self.response_reserve)
    }

    /// Whether appending a user message with `candidate` would push the
    /// conversation past the window minus the reply reserve.
    pub fn would_exceed_limit(&self, messages: &[Message], candidate: &str, model_id: &str) -> bool {
        let candidate = Message::user(candidate);
        let total = self
            .counter
            .count_messages_tokens(messages.iter().chain(std::iter::once(&candidate)), model_id);
        total + self.response_reserve > self.registry().context_window(model_id)
    }
}

impl Default for ContextWindowManager {
    fn default() -> Self {
        Self::new(TokenCounter::default())
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Prune with the built-in registry and default estimators.
pub fn prune<'a>(
    messages: &'a [Message],
    model_id: &str,
    options: &PruneOptions,
) -> Result<Cow<'a, [Message]>> {
    ContextWindowManager::default().prune(messages, model_id, options)
}

/// Remaining tokens with the default 1000-token reserve.
pub fn remaining_tokens(messages: &[Message], model_id: &str) -> usize {
    ContextWindowManager::default().remaining_tokens(messages, model_id)
}

/// Limit check with the default 1000-token reserve.
pub fn would_exceed_limit(messages: &[Message], candidate: &str, model_id: &str) -> bool {
    ContextWindowManager::default().would_exceed_limit(messages, candidate, model_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
