use std::io;
use thiserror::Error;

/// Core error type for ctxwindow.
#[derive(Error, Debug)]
pub enum CtxWindowError {
    /// The token budget for a prune resolved to zero or less.
    #[error(
        "invalid token budget for '{model}': context window {context_window}, \
         response reserve {response_reserve}{}",
        override_suffix(.max_tokens_override)
    )]
    InvalidBudget {
        model: String,
        context_window: usize,
        response_reserve: usize,
        max_tokens_override: Option<usize>,
    },

    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("parse error: {context}")]
    Parse {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("unknown provider '{name}' (expected 'openai' or 'gemini')")]
    UnknownProvider { name: String },
}

impl CtxWindowError {
    pub fn invalid_budget(
        model: impl Into<String>,
        context_window: usize,
        response_reserve: usize,
        max_tokens_override: Option<usize>,
    ) -> Self {
        Self::InvalidBudget {
            model: model.into(),
            context_window,
            response_reserve,
            max_tokens_override,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn parse(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Parse {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider { name: name.into() }
    }

    /// Returns true if this error is caused by user input (vs internal/system).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidBudget { .. }
                | Self::Parse { .. }
                | Self::Validation { .. }
                | Self::UnknownProvider { .. }
        )
    }

    /// Returns true if retrying the operation might succeed.
    ///
    /// Nothing the pruning core does is transient; only file I/O qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

fn override_suffix(max_tokens_override: &Option<usize>) -> String {
    max_tokens_override.map_or(String::new(), |o| format!(", max tokens override {o}"))
}

pub type Result<T> = std::result::Result<T, CtxWindowError>;
