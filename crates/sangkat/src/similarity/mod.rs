//! String similarity used by the fuzzy search pass.
//!
//! Everything here is a pure function over `&str`: no allocation survives the call and
//! nothing panics on empty or short input, it simply scores `0.0`.

mod phonetic;

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use itertools::Itertools;
pub use phonetic::soundex;

/// Candidates scoring below this are dropped by [`rank_candidates`].
pub const MIN_FUZZY_SCORE: f64 = 0.3;
/// Weight of the shared-phonetic-code bonus in [`similarity_score`].
const PHONETIC_WEIGHT: f64 = 0.3;
const PREFIX_SIMILARITY: f64 = 0.9;

/// Sørensen–Dice coefficient over the multiset of character bigrams.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    let a_bigrams: Vec<(char, char)> = a.chars().tuple_windows().collect();
    let b_bigrams: Vec<(char, char)> = b.chars().tuple_windows().collect();
    if a_bigrams.is_empty() || b_bigrams.is_empty() {
        return 0.0;
    }

    let mut remaining: HashMap<(char, char), usize> = HashMap::new();
    for bigram in &b_bigrams {
        *remaining.entry(*bigram).or_default() += 1;
    }
    let mut shared = 0usize;
    for bigram in &a_bigrams {
        if let Some(count) = remaining.get_mut(bigram)
            && *count > 0
        {
            *count -= 1;
            shared += 1;
        }
    }
    (2 * shared) as f64 / (a_bigrams.len() + b_bigrams.len()) as f64
}

/// Word-level similarity: exact, prefix, otherwise bigram overlap.
pub fn term_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        1.0
    } else if a.starts_with(b) || b.starts_with(a) {
        PREFIX_SIMILARITY
    } else {
        bigram_similarity(a, b)
    }
}

/// Score `candidate` against `query`. Case-insensitive.
///
/// A candidate containing the whole query scores `1.0`. Otherwise each query word takes
/// its best [`term_similarity`] against the candidate's words, the results are averaged,
/// and words sharing a Soundex code add a bonus, so the score can reach
/// `1.0 + PHONETIC_WEIGHT`.
pub fn similarity_score(query: &str, candidate: &str) -> f64 {
    let query = query.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if candidate.contains(&query) {
        return 1.0;
    }

    let query_terms: Vec<&str> = query.split_whitespace().collect();
    let candidate_terms: Vec<&str> = candidate.split_whitespace().collect();

    let term_total: f64 = query_terms
        .iter()
        .map(|q| {
            candidate_terms
                .iter()
                .map(|c| term_similarity(q, c))
                .fold(0.0, f64::max)
        })
        .sum();
    let term_average = term_total / query_terms.len() as f64;

    let candidate_codes: HashSet<String> = candidate_terms
        .iter()
        .map(|t| soundex(t))
        .filter(|code| !code.is_empty())
        .collect();
    let shared_codes = query_terms
        .iter()
        .map(|t| soundex(t))
        .filter(|code| !code.is_empty())
        .unique()
        .filter(|code| candidate_codes.contains(code))
        .count();
    let phonetic_bonus = PHONETIC_WEIGHT * shared_codes as f64 / query_terms.len().max(1) as f64;

    term_average + phonetic_bonus
}

/// Score every candidate and keep those at or above [`MIN_FUZZY_SCORE`], best first.
///
/// Equal scores keep the order the candidates were given in.
pub fn rank_candidates<'a, T>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> &str,
) -> Vec<(&'a T, f64)>
where
    T: 'a,
{
    rank_candidates_above(query, candidates, key, MIN_FUZZY_SCORE)
}

/// [`rank_candidates`] with a caller supplied cutoff.
pub fn rank_candidates_above<'a, T>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> &str,
    min_score: f64,
) -> Vec<(&'a T, f64)>
where
    T: 'a,
{
    let mut scored: Vec<(&'a T, f64)> = candidates
        .into_iter()
        .map(|candidate| (candidate, similarity_score(query, key(candidate))))
        .filter(|(_, score)| *score >= min_score)
        .collect();
    // `sort_by` is stable, which preserves candidate order on ties.
    scored.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    scored
}
