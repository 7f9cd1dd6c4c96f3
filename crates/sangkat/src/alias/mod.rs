//! Informal names for locations.
//!
//! Two sources feed the [`AliasResolver`]: a hand-maintained [`AliasDictionary`] and the
//! [`LearnedAliasTracker`], which promotes search terms that users repeatedly follow to
//! the same location.

pub mod dictionary;
pub mod learned;
pub mod resolver;

pub use dictionary::{AliasDictionary, AliasSnapshot};
pub use error::AliasError;
pub use learned::{
    AliasFilter, AliasRow, AliasSort, AliasStats, AliasStore, LearnedAlias, LearnedAliasTracker,
    MemoryAliasStore, PromotionThresholds,
};
pub use resolver::{AliasResolver, Resolution, ResolutionSource};

/// Canonical form of a search term or alias key.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum AliasError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Invalid location code: {0}")]
        InvalidCode(#[from] crate::index::IndexError),
        #[error("Learned alias ({term:?}, {code}) already exists")]
        Conflict { term: String, code: String },
        #[error("Learned alias ({term:?}, {code}) not found")]
        NotFound { term: String, code: String },
        #[error("Gave up creating learned alias ({term:?}, {code}) after {attempts} attempts")]
        RetriesExhausted {
            term: String,
            code: String,
            attempts: usize,
        },
    }
    pub type Result<T> = std::result::Result<T, AliasError>;
}
