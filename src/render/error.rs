//! Render error types.

use thiserror::Error;

/// Error type returned by context providers and lazy context values.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the template engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] handlebars::TemplateError),

    #[error(transparent)]
    Render(#[from] handlebars::RenderError),
}

/// Reasons a page render falls back to its original source.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("context provider failed: {0}")]
    Provider(#[source] BoxError),

    #[error("context value `{key}` failed: {source}")]
    ContextValue {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("compile failed: {0}")]
    Compile(#[source] EngineError),

    #[error("render failed: {0}")]
    Render(#[source] EngineError),
}
