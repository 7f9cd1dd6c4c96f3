//! Query answering.
//!
//! A query is rewritten by the alias resolver, run against the full-text index, and
//! topped up either with a literal Khmer pass or with fuzzy candidates.

mod search_orchestration;

pub use search_orchestration::{
    MAX_LIMIT, MatchKind, SearchConfig, SearchHit, SearchResponse, bulk_search_inner,
    contains_khmer, fuzzy_probes, search_inner, search_resolved,
};
