//! Combines alias resolution, full-text matching and similarity scoring into one ranked
//! result list.

use ahash::AHashSet as HashSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::{
    SearchConfigBuilder,
    alias::{AliasResolver, Resolution},
    index::{LocationCode, LocationIndex, LocationRecord},
    similarity::{MIN_FUZZY_SCORE, rank_candidates_above},
};

/// Hard cap on hits per query.
pub const MAX_LIMIT: usize = 50;
const DEFAULT_MAX_FUZZY_CANDIDATES: usize = 300;
const VOWEL_SWAPS: [(&str, &str); 4] = [("ou", "uo"), ("uo", "ou"), ("ia", "ai"), ("ai", "ia")];

/// How a hit was found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchKind {
    /// Full-text index match, in relevance order.
    Exact,
    /// Literal match on the Khmer name.
    Script,
    /// Similarity match on the Latin name.
    Fuzzy { score: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub record: LocationRecord,
    /// `"District, Province"` for a commune, the province for a district, empty otherwise.
    pub parent_label: String,
    pub match_kind: MatchKind,
}

impl SearchHit {
    pub fn new(index: &LocationIndex, record: &LocationRecord, match_kind: MatchKind) -> Self {
        Self {
            record: record.clone(),
            parent_label: index.parent_label(record),
            match_kind,
        }
    }

    pub fn code(&self) -> &str {
        self.record.code()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query as the caller typed it, even when an alias rewrote it.
    pub query: String,
    pub resolution: Resolution,
    pub hits: Vec<SearchHit>,
}

impl SearchResponse {
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            resolution: Resolution::unchanged(query),
            hits: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn first(&self) -> Option<&SearchHit> {
        self.hits.first()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.hits.iter().map(SearchHit::code).collect()
    }
}

/// Configuration for location search operations.
///
/// Use [`SearchConfigBuilder`] for presets and validation.
///
/// ```rust
/// use sangkat::SearchConfig;
///
/// let config = SearchConfig::builder().limit(10).fuzzy(false).build()?;
/// assert_eq!(config.limit, 10);
/// # Ok::<(), sangkat::error::SangkatError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of hits, `1..=50`
    pub limit: usize,
    /// Run the similarity pass for Latin queries
    pub fuzzy: bool,
    /// Run the literal Khmer pass for Khmer queries
    pub script_pass: bool,
    /// Minimum similarity score for fuzzy hits
    pub min_fuzzy_score: f64,
    /// Records pre-selected for similarity scoring
    pub max_fuzzy_candidates: usize,
    /// Count searches towards learned alias click rates
    pub track_searches: bool,
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }

    pub(crate) fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: MAX_LIMIT,
            fuzzy: true,
            script_pass: true,
            min_fuzzy_score: MIN_FUZZY_SCORE,
            max_fuzzy_candidates: DEFAULT_MAX_FUZZY_CANDIDATES,
            track_searches: true,
        }
    }
}

/// True when `text` has a character in the Khmer block U+1780..=U+17FF.
pub fn contains_khmer(text: &str) -> bool {
    text.chars().any(|c| ('\u{1780}'..='\u{17FF}').contains(&c))
}

/// Substring probes that pre-select fuzzy candidates: the first two characters of each
/// token and of its `ou/uo` and `ia/ai` swapped spellings.
pub fn fuzzy_probes(term: &str) -> Vec<String> {
    let mut probes: Vec<String> = Vec::new();
    for token in term.to_lowercase().split_whitespace() {
        let variants = std::iter::once(token.to_string()).chain(
            VOWEL_SWAPS
                .iter()
                .filter(|(from, _)| token.contains(from))
                .map(|(from, to)| token.replace(from, to)),
        );
        for variant in variants {
            let probe: String = variant.chars().take(2).collect();
            if probe.chars().count() == 2 && !probes.contains(&probe) {
                probes.push(probe);
            }
        }
    }
    probes
}

fn fuzzy_candidates<'a>(
    index: &'a LocationIndex,
    term: &str,
    seen: &HashSet<LocationCode>,
    max_candidates: usize,
) -> Vec<&'a LocationRecord> {
    let probes = fuzzy_probes(term);
    if probes.is_empty() {
        return Vec::new();
    }
    index
        .records()
        .iter()
        .filter(|r| !seen.contains(&r.code))
        .filter(|r| {
            let name = r.name_primary.to_lowercase();
            probes.iter().any(|p| name.contains(p.as_str()))
        })
        .take(max_candidates)
        .collect()
}

/// Ordered, code-deduplicated hit list that stops accepting at `limit`.
struct HitCollector {
    limit: usize,
    seen: HashSet<LocationCode>,
    hits: Vec<SearchHit>,
}

impl HitCollector {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: HashSet::new(),
            hits: Vec::with_capacity(limit),
        }
    }

    fn is_full(&self) -> bool {
        self.hits.len() >= self.limit
    }

    fn push(&mut self, index: &LocationIndex, record: &LocationRecord, kind: MatchKind) {
        if !self.is_full() && self.seen.insert(record.code.clone()) {
            self.hits.push(SearchHit::new(index, record, kind));
        }
    }
}

/// Answer one query. Never fails: a broken index degrades to substring matching and
/// an empty query yields an empty response.
#[instrument(name = "Location Search", level = "debug", skip_all, fields(query = query, limit = config.limit))]
pub fn search_inner(
    query: &str,
    index: &LocationIndex,
    resolver: &AliasResolver,
    config: &SearchConfig,
) -> SearchResponse {
    if query.trim().is_empty() {
        return SearchResponse::empty(query);
    }
    search_resolved(query, resolver.resolve(query), index, config)
}

/// Run the index passes on `resolution.term` as given. Callers that already resolved
/// the query use this so an alias target is never rewritten a second time.
pub fn search_resolved(
    query: &str,
    resolution: Resolution,
    index: &LocationIndex,
    config: &SearchConfig,
) -> SearchResponse {
    let term = resolution.term.trim();
    if term.is_empty() {
        return SearchResponse {
            query: query.to_string(),
            resolution,
            hits: Vec::new(),
        };
    }
    let limit = config.effective_limit();

    let mut hits = HitCollector::new(limit);
    let exact = index.exact_search(term);
    trace!(exact = exact.len(), "Exact pass complete");
    for record in exact {
        hits.push(index, record, MatchKind::Exact);
    }

    if !hits.is_full() {
        if contains_khmer(term) {
            if config.script_pass {
                for record in index.secondary_name_scan(term) {
                    hits.push(index, record, MatchKind::Script);
                }
            }
        } else if config.fuzzy {
            let candidates = fuzzy_candidates(index, term, &hits.seen, config.max_fuzzy_candidates);
            let ranked = rank_candidates_above(
                term,
                candidates.iter().copied(),
                |r| r.name_primary.as_str(),
                config.min_fuzzy_score,
            );
            debug!(
                candidates = candidates.len(),
                matches = ranked.len(),
                "Fuzzy pass complete"
            );
            for (record, score) in ranked {
                let score = score.min(1.0);
                hits.push(index, record, MatchKind::Fuzzy { score });
            }
        }
    }

    let hits = hits.hits;
    debug!(hits = hits.len(), resolved = resolution.changed(), "Search complete");
    SearchResponse {
        query: query.to_string(),
        resolution,
        hits,
    }
}

/// [`search_inner`] over many queries in parallel, results in input order.
#[instrument(name = "Bulk Location Search", level = "info", skip_all, fields(num_queries = queries.len()))]
pub fn bulk_search_inner<Q>(
    queries: &[Q],
    index: &LocationIndex,
    resolver: &AliasResolver,
    config: &SearchConfig,
) -> Vec<SearchResponse>
where
    Q: AsRef<str> + Sync,
{
    queries
        .par_iter()
        .map(|query| search_inner(query.as_ref(), index, resolver, config))
        .collect()
}
