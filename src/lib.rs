//! Token-aware context-window management for OpenAI and Gemini chats.
//!
//! The core is three pure operations on a message list: [`prune`] fits it
//! into a model's token budget, [`remaining_tokens`] reports headroom and
//! [`would_exceed_limit`] checks a candidate message before sending it.
//! Budgets come from the static [`registry`]; sizes come from the
//! pluggable estimators in [`tokens`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod output;
pub mod registry;
pub mod tokens;
pub mod utils;

pub use context::{
    prune, remaining_tokens, would_exceed_limit, ContextWindowManager, PruneOptions, PrunePlan,
    DEFAULT_RESPONSE_RESERVE,
};
pub use error::{CtxWindowError, Result};
pub use message::{Conversation, Message, Role};
pub use registry::{ModelProfile, ModelRegistry, Provider, TokenCost, DEFAULT_CONTEXT_WINDOW};
pub use tokens::{CharEstimator, ModelFamily, TokenCounter, TokenEstimator};
