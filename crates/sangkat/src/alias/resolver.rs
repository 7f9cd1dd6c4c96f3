use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AliasDictionary, LearnedAliasTracker, normalize_term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// A promoted learned alias rewrote the query to a location code.
    Learned,
    /// The static dictionary rewrote the query.
    Dictionary,
    Unchanged,
}

/// Outcome of alias resolution for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The query as the caller gave it.
    pub original: String,
    /// What to search for instead.
    pub term: String,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn unchanged(query: &str) -> Self {
        Self {
            original: query.to_string(),
            term: query.to_string(),
            source: ResolutionSource::Unchanged,
        }
    }

    pub fn changed(&self) -> bool {
        self.source != ResolutionSource::Unchanged
    }
}

/// Rewrites informal queries to official search terms. Learned aliases take precedence
/// over the dictionary.
#[derive(Debug, Clone)]
pub struct AliasResolver {
    dictionary: Arc<AliasDictionary>,
    learned: Arc<LearnedAliasTracker>,
}

impl AliasResolver {
    pub fn new(dictionary: Arc<AliasDictionary>, learned: Arc<LearnedAliasTracker>) -> Self {
        Self {
            dictionary,
            learned,
        }
    }

    pub fn dictionary(&self) -> &Arc<AliasDictionary> {
        &self.dictionary
    }

    pub fn learned(&self) -> &Arc<LearnedAliasTracker> {
        &self.learned
    }

    pub fn resolve(&self, query: &str) -> Resolution {
        let normalized = normalize_term(query);
        if normalized.is_empty() {
            return Resolution::unchanged(query);
        }

        let rewrite = self
            .learned
            .promoted_code(&normalized)
            .map(|code| (String::from(code), ResolutionSource::Learned))
            .or_else(|| {
                self.dictionary
                    .lookup(&normalized)
                    .map(|target| (target, ResolutionSource::Dictionary))
            });

        match rewrite {
            Some((term, source)) => {
                debug!(query, term = %term, ?source, "Resolved alias");
                Resolution {
                    original: query.to_string(),
                    term,
                    source,
                }
            }
            None => Resolution::unchanged(query),
        }
    }
}
