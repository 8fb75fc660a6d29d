//! Backfill engine error taxonomy.

use thiserror::Error;

/// Maximum number of characters of an upstream body kept in a fatal error.
pub const BODY_SNIPPET_LEN: usize = 200;

#[derive(Error, Debug)]
pub enum BackfillError {
    /// Retryable status or transport failure that outlived every attempt.
    #[error("upstream still failing after {attempts} attempts: {last}")]
    Transient { attempts: u32, last: String },

    /// Non-retryable HTTP status. Raised on first sight.
    #[error("HTTP {status}: {body}")]
    Fatal { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),

    /// A single window returned at least as many fills as the upstream will ever serve.
    #[error("wallet {wallet} returned {count} fills, at or above the cap of {cap}")]
    TooManyFills {
        wallet: String,
        count: usize,
        cap: usize,
    },

    /// The wallet produced nothing across a full empty-chunk streak.
    #[error("wallet {wallet} returned no fills across {empty_chunks} chunks")]
    NoResults { wallet: String, empty_chunks: u32 },

    #[error("invalid backfill plan: {0}")]
    InvalidPlan(String),

    /// State repository or sink failure, passed through untouched.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl BackfillError {
    pub fn fatal(status: u16, body: &str) -> Self {
        Self::Fatal {
            status,
            body: body.chars().take(BODY_SNIPPET_LEN).collect(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

pub type Result<T> = std::result::Result<T, BackfillError>;

/// Whether any layer of `err` is a [`BackfillError`] that a later rerun could clear.
pub fn is_retryable_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<BackfillError>())
        .any(BackfillError::is_retryable)
}
