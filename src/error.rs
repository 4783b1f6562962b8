//! Crate-wide error type
//!
//! None of these variants are meant to be fatal to a session: callers log
//! and degrade rather than propagate most of them out to the embedding
//! host. `InvalidInput` and
//! `Cancelled` are the two kinds a caller is expected to check for deliberately.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FovError {
    #[error("missing collaborator: {0}")]
    MissingCollaborator(String),

    #[error("curriculum lookup failed: {0}")]
    CurriculumLookupFailure(String),

    #[error("summarizer failed: {0}")]
    SummarizerFailure(String),

    #[error("context would exceed budget: {used} tokens used, {budget} allowed")]
    ContextOverBudget { used: usize, budget: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FovError>;
