//! Click telemetry that turns informal search terms into aliases.
//!
//! Every `(search term, location code)` pair a user clicks gets a row. Searches for the
//! term bump `search_count` on all of its rows, clicks bump `click_count`, and a click more
//! than an hour after the previous one counts as a new contributor. Once a row clears all
//! [`PromotionThresholds`] it is promoted and the resolver starts rewriting the term to
//! the row's code.
//!
//! Counters are atomics on rows shared through `Arc`, so concurrent clicks on an existing
//! row never take a lock. Only row creation goes through the store's write lock.

use std::{
    cmp::Reverse,
    collections::BTreeMap,
    fmt::Debug,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
    },
};

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{
    error::{AliasError, Result},
    normalize_term,
};
use crate::index::LocationCode;

/// Minimum length of a normalized term for searches to be counted.
pub const MIN_TERM_CHARS: usize = 2;
/// Clicks spaced further apart than this many milliseconds count as different contributors.
pub const CONTRIBUTOR_WINDOW_MS: i64 = 60 * 60 * 1000;
const MAX_CREATE_ATTEMPTS: usize = 3;
const NEVER_CLICKED: i64 = i64::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromotionThresholds {
    pub min_clicks: u64,
    pub min_click_rate: f64,
    pub min_unique_contributors: u64,
}

impl Default for PromotionThresholds {
    fn default() -> Self {
        Self {
            min_clicks: 10,
            min_click_rate: 0.6,
            min_unique_contributors: 5,
        }
    }
}

/// Point-in-time copy of one row, also the on-disk snapshot format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedAlias {
    pub search_term: String,
    pub location_code: LocationCode,
    pub click_count: u64,
    pub search_count: u64,
    pub unique_contributors: u64,
    pub promoted: bool,
    pub last_clicked_at: Option<DateTime<Utc>>,
}

impl LearnedAlias {
    /// `click_count / search_count`, zero before any search.
    pub fn click_rate(&self) -> f64 {
        if self.search_count == 0 {
            0.0
        } else {
            self.click_count as f64 / self.search_count as f64
        }
    }

    pub fn meets(&self, thresholds: &PromotionThresholds) -> bool {
        self.click_count >= thresholds.min_clicks
            && self.click_rate() >= thresholds.min_click_rate
            && self.unique_contributors >= thresholds.min_unique_contributors
    }
}

/// Live counters for one `(term, code)` pair.
#[derive(Debug)]
pub struct AliasRow {
    click_count: AtomicU64,
    search_count: AtomicU64,
    unique_contributors: AtomicU64,
    promoted: AtomicBool,
    last_clicked_ms: AtomicI64,
}

impl Default for AliasRow {
    fn default() -> Self {
        Self {
            click_count: AtomicU64::new(0),
            search_count: AtomicU64::new(0),
            unique_contributors: AtomicU64::new(0),
            promoted: AtomicBool::new(false),
            last_clicked_ms: AtomicI64::new(NEVER_CLICKED),
        }
    }
}

impl AliasRow {
    fn from_snapshot(alias: &LearnedAlias) -> Self {
        Self {
            click_count: AtomicU64::new(alias.click_count),
            search_count: AtomicU64::new(alias.search_count),
            unique_contributors: AtomicU64::new(alias.unique_contributors),
            promoted: AtomicBool::new(alias.promoted),
            last_clicked_ms: AtomicI64::new(
                alias
                    .last_clicked_at
                    .map_or(NEVER_CLICKED, |at| at.timestamp_millis()),
            ),
        }
    }

    fn record_search(&self) {
        self.search_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a click at `now`. Returns true when it also counted as a new contributor.
    fn record_click(&self, now: DateTime<Utc>) -> bool {
        self.click_count.fetch_add(1, Ordering::AcqRel);
        let now_ms = now.timestamp_millis();
        let previous = self.last_clicked_ms.swap(now_ms, Ordering::AcqRel);
        let new_contributor = previous == NEVER_CLICKED
            || now_ms.saturating_sub(previous) > CONTRIBUTOR_WINDOW_MS;
        if new_contributor {
            self.unique_contributors.fetch_add(1, Ordering::AcqRel);
        }
        new_contributor
    }

    fn set_promoted(&self, promoted: bool) -> bool {
        self.promoted.swap(promoted, Ordering::AcqRel) != promoted
    }

    pub fn is_promoted(&self) -> bool {
        self.promoted.load(Ordering::Acquire)
    }

    pub fn click_count(&self) -> u64 {
        self.click_count.load(Ordering::Acquire)
    }

    pub fn snapshot(&self, search_term: &str, location_code: &LocationCode) -> LearnedAlias {
        let last_ms = self.last_clicked_ms.load(Ordering::Acquire);
        LearnedAlias {
            search_term: search_term.to_string(),
            location_code: location_code.clone(),
            click_count: self.click_count.load(Ordering::Acquire),
            search_count: self.search_count.load(Ordering::Acquire),
            unique_contributors: self.unique_contributors.load(Ordering::Acquire),
            promoted: self.is_promoted(),
            last_clicked_at: (last_ms != NEVER_CLICKED)
                .then(|| DateTime::from_timestamp_millis(last_ms))
                .flatten(),
        }
    }
}

/// Storage of learned alias rows keyed by normalized term and code.
///
/// `create` must fail with [`AliasError::Conflict`] when the key already exists; the
/// tracker relies on that to resolve concurrent first clicks.
pub trait AliasStore: Send + Sync + Debug {
    fn find(&self, term: &str, code: &LocationCode) -> Option<Arc<AliasRow>>;

    fn create(&self, term: &str, code: &LocationCode) -> Result<Arc<AliasRow>>;

    /// All rows for `term`, in code order.
    fn rows_for_term(&self, term: &str) -> Vec<(LocationCode, Arc<AliasRow>)>;

    fn remove(&self, term: &str, code: &LocationCode) -> Option<Arc<AliasRow>>;

    /// Every row, ordered by term then code.
    fn all(&self) -> Vec<(String, LocationCode, Arc<AliasRow>)>;

    /// Insert or overwrite a row from a snapshot.
    fn restore(&self, alias: &LearnedAlias);
}

/// In-process [`AliasStore`].
#[derive(Debug, Default)]
pub struct MemoryAliasStore {
    rows: RwLock<HashMap<String, HashMap<LocationCode, Arc<AliasRow>>>>,
}

impl MemoryAliasStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AliasStore for MemoryAliasStore {
    fn find(&self, term: &str, code: &LocationCode) -> Option<Arc<AliasRow>> {
        self.rows.read().get(term)?.get(code).cloned()
    }

    fn create(&self, term: &str, code: &LocationCode) -> Result<Arc<AliasRow>> {
        let mut rows = self.rows.write();
        let by_code = rows.entry(term.to_string()).or_default();
        if by_code.contains_key(code) {
            return Err(AliasError::Conflict {
                term: term.to_string(),
                code: code.to_string(),
            });
        }
        let row = Arc::new(AliasRow::default());
        by_code.insert(code.clone(), Arc::clone(&row));
        Ok(row)
    }

    fn rows_for_term(&self, term: &str) -> Vec<(LocationCode, Arc<AliasRow>)> {
        let rows = self.rows.read();
        let mut found: Vec<_> = rows
            .get(term)
            .into_iter()
            .flatten()
            .map(|(code, row)| (code.clone(), Arc::clone(row)))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    fn remove(&self, term: &str, code: &LocationCode) -> Option<Arc<AliasRow>> {
        let mut rows = self.rows.write();
        let by_code = rows.get_mut(term)?;
        let removed = by_code.remove(code);
        if by_code.is_empty() {
            rows.remove(term);
        }
        removed
    }

    fn all(&self) -> Vec<(String, LocationCode, Arc<AliasRow>)> {
        let rows = self.rows.read();
        let mut all: Vec<_> = rows
            .iter()
            .flat_map(|(term, by_code)| {
                by_code
                    .iter()
                    .map(|(code, row)| (term.clone(), code.clone(), Arc::clone(row)))
            })
            .collect();
        all.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        all
    }

    fn restore(&self, alias: &LearnedAlias) {
        self.rows
            .write()
            .entry(normalize_term(&alias.search_term))
            .or_default()
            .insert(
                alias.location_code.clone(),
                Arc::new(AliasRow::from_snapshot(alias)),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasFilter {
    #[default]
    All,
    Promoted,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasSort {
    /// Most clicked first.
    #[default]
    Clicks,
    /// Highest click rate first.
    Rate,
    /// Most searched first.
    Searches,
    /// Alphabetical by term.
    Term,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasStats {
    pub total: usize,
    pub promoted: usize,
    pub pending: usize,
    /// Mean click rate over rows with at least one search.
    pub average_click_rate: f64,
}

/// Records telemetry and applies the promotion rules.
#[derive(Debug)]
pub struct LearnedAliasTracker {
    store: Arc<dyn AliasStore>,
    thresholds: PromotionThresholds,
}

impl Default for LearnedAliasTracker {
    fn default() -> Self {
        Self::new(Arc::new(MemoryAliasStore::new()))
    }
}

impl LearnedAliasTracker {
    pub fn new(store: Arc<dyn AliasStore>) -> Self {
        Self::with_thresholds(store, PromotionThresholds::default())
    }

    pub fn with_thresholds(store: Arc<dyn AliasStore>, thresholds: PromotionThresholds) -> Self {
        Self { store, thresholds }
    }

    pub fn thresholds(&self) -> &PromotionThresholds {
        &self.thresholds
    }

    /// Count a search for `term` against every location already clicked for it.
    ///
    /// Returns the number of rows updated. Terms shorter than two characters are ignored.
    pub fn record_search(&self, term: &str) -> usize {
        let term = normalize_term(term);
        if term.chars().count() < MIN_TERM_CHARS {
            return 0;
        }
        let rows = self.store.rows_for_term(&term);
        for (_, row) in &rows {
            row.record_search();
        }
        rows.len()
    }

    /// Count a click from the results of `term` onto `code`.
    ///
    /// Returns `None` when either argument is blank.
    pub fn record_click(&self, term: &str, code: &str) -> Result<Option<LearnedAlias>> {
        self.record_click_at(term, code, Utc::now())
    }

    /// [`Self::record_click`] with an explicit clock.
    #[instrument(name = "Record alias click", skip(self), level = "debug")]
    pub fn record_click_at(
        &self,
        term: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<LearnedAlias>> {
        let term = normalize_term(term);
        if term.is_empty() || code.trim().is_empty() {
            return Ok(None);
        }
        let code = LocationCode::parse(code)?;
        let row = self.find_or_create(&term, &code)?;

        row.record_click(now);
        let alias = row.snapshot(&term, &code);
        if !alias.promoted && alias.meets(&self.thresholds) && row.set_promoted(true) {
            info!(
                term = %term,
                code = %code,
                clicks = alias.click_count,
                click_rate = alias.click_rate(),
                contributors = alias.unique_contributors,
                "Promoted learned alias"
            );
            return Ok(Some(row.snapshot(&term, &code)));
        }
        Ok(Some(alias))
    }

    fn find_or_create(&self, term: &str, code: &LocationCode) -> Result<Arc<AliasRow>> {
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            if let Some(row) = self.store.find(term, code) {
                return Ok(row);
            }
            match self.store.create(term, code) {
                Ok(row) => return Ok(row),
                Err(AliasError::Conflict { .. }) => {
                    debug!(term, %code, attempt, "Learned alias created concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        warn!(term, %code, "Learned alias creation kept conflicting");
        Err(AliasError::RetriesExhausted {
            term: term.to_string(),
            code: code.to_string(),
            attempts: MAX_CREATE_ATTEMPTS,
        })
    }

    pub fn get(&self, term: &str, code: &str) -> Option<LearnedAlias> {
        let term = normalize_term(term);
        let code = LocationCode::parse(code).ok()?;
        self.store
            .find(&term, &code)
            .map(|row| row.snapshot(&term, &code))
    }

    /// The promoted code for `term`. Competing promotions go to the most clicked row,
    /// ties to the lowest code.
    pub fn promoted_code(&self, term: &str) -> Option<LocationCode> {
        let term = normalize_term(term);
        self.store
            .rows_for_term(&term)
            .into_iter()
            .filter(|(_, row)| row.is_promoted())
            .min_by_key(|(code, row)| (Reverse(row.click_count()), code.clone()))
            .map(|(code, _)| code)
    }

    /// Every promoted term with the code it resolves to.
    pub fn promoted_aliases(&self) -> BTreeMap<String, LocationCode> {
        let mut best: BTreeMap<String, (u64, LocationCode)> = BTreeMap::new();
        for (term, code, row) in self.store.all() {
            if !row.is_promoted() {
                continue;
            }
            let clicks = row.click_count();
            // `all` is code ordered, so an equal count keeps the lower code.
            let better = best
                .get(&term)
                .is_none_or(|(best_clicks, _)| clicks > *best_clicks);
            if better {
                best.insert(term, (clicks, code));
            }
        }
        best.into_iter()
            .map(|(term, (_, code))| (term, code))
            .collect()
    }

    /// Mark a row promoted by hand, regardless of its counters.
    pub fn promote(&self, term: &str, code: &str) -> Result<LearnedAlias> {
        self.set_promoted(term, code, true)
    }

    /// Withdraw a promotion. Telemetry alone never does this.
    pub fn demote(&self, term: &str, code: &str) -> Result<LearnedAlias> {
        self.set_promoted(term, code, false)
    }

    fn set_promoted(&self, term: &str, code: &str, promoted: bool) -> Result<LearnedAlias> {
        let term = normalize_term(term);
        let code = LocationCode::parse(code)?;
        let row = self.store.find(&term, &code).ok_or_else(|| AliasError::NotFound {
            term: term.clone(),
            code: code.to_string(),
        })?;
        if row.set_promoted(promoted) {
            info!(term = %term, code = %code, promoted, "Learned alias promotion changed by admin");
        }
        Ok(row.snapshot(&term, &code))
    }

    pub fn remove(&self, term: &str, code: &str) -> Result<LearnedAlias> {
        let term = normalize_term(term);
        let code = LocationCode::parse(code)?;
        let row = self.store.remove(&term, &code).ok_or_else(|| AliasError::NotFound {
            term: term.clone(),
            code: code.to_string(),
        })?;
        info!(term = %term, code = %code, "Learned alias removed");
        Ok(row.snapshot(&term, &code))
    }

    pub fn list(&self, filter: AliasFilter, sort: AliasSort) -> Vec<LearnedAlias> {
        let mut aliases: Vec<LearnedAlias> = self
            .store
            .all()
            .into_iter()
            .map(|(term, code, row)| row.snapshot(&term, &code))
            .filter(|alias| match filter {
                AliasFilter::All => true,
                AliasFilter::Promoted => alias.promoted,
                AliasFilter::Pending => !alias.promoted,
            })
            .collect();
        match sort {
            AliasSort::Clicks => aliases.sort_by_key(|a| Reverse(a.click_count)),
            AliasSort::Searches => aliases.sort_by_key(|a| Reverse(a.search_count)),
            AliasSort::Rate => aliases.sort_by(|a, b| b.click_rate().total_cmp(&a.click_rate())),
            AliasSort::Term => {}
        }
        aliases
    }

    pub fn stats(&self) -> AliasStats {
        let aliases = self.list(AliasFilter::All, AliasSort::Term);
        let promoted = aliases.iter().filter(|a| a.promoted).count();
        let rates: Vec<f64> = aliases
            .iter()
            .filter(|a| a.search_count > 0)
            .map(LearnedAlias::click_rate)
            .collect();
        let average_click_rate = if rates.is_empty() {
            0.0
        } else {
            rates.iter().sum::<f64>() / rates.len() as f64
        };
        AliasStats {
            total: aliases.len(),
            promoted,
            pending: aliases.len() - promoted,
            average_click_rate,
        }
    }

    /// Write every row as a JSON array.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let aliases = self.list(AliasFilter::All, AliasSort::Term);
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, &aliases)?;
        info!(path = ?path.as_ref(), rows = aliases.len(), "Saved learned aliases");
        Ok(aliases.len())
    }

    /// Load rows written by [`Self::save_json`], overwriting rows with the same key.
    pub fn load_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let aliases: Vec<LearnedAlias> = serde_json::from_reader(reader)?;
        for alias in &aliases {
            self.store.restore(alias);
        }
        info!(path = ?path.as_ref(), rows = aliases.len(), "Loaded learned aliases");
        Ok(aliases.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 19, 8, 0, 0).unwrap()
    }

    /// Ten clicks from `contributors` distinct sessions, with 16 searches in between.
    fn drive_to_boundary(tracker: &LearnedAliasTracker, contributors: i64) -> LearnedAlias {
        let mut now = t0();
        tracker.record_click_at("tuol", "120300", now).unwrap();
        for _ in 0..16 {
            tracker.record_search("tuol");
        }
        for click in 2..=10 {
            now += if click <= contributors {
                Duration::hours(2)
            } else {
                Duration::minutes(1)
            };
            tracker.record_click_at("tuol", "120300", now).unwrap();
        }
        tracker.get("tuol", "120300").unwrap()
    }

    #[test]
    fn test_promotion_boundary() {
        let tracker = LearnedAliasTracker::default();
        let alias = drive_to_boundary(&tracker, 5);
        assert_eq!(alias.click_count, 10);
        assert_eq!(alias.search_count, 16);
        assert_eq!(alias.unique_contributors, 5);
        assert!(alias.promoted);
        assert_eq!(tracker.promoted_code("Tuol").unwrap().as_str(), "120300");
    }

    #[test]
    fn test_four_contributors_is_not_enough() {
        let tracker = LearnedAliasTracker::default();
        let alias = drive_to_boundary(&tracker, 4);
        assert_eq!(alias.click_count, 10);
        assert_eq!(alias.unique_contributors, 4);
        assert!(!alias.promoted);
        assert_eq!(tracker.promoted_code("tuol"), None);
    }

    #[test]
    fn test_contributor_window_is_exclusive() {
        let tracker = LearnedAliasTracker::default();
        tracker.record_click_at("pp", "12", t0()).unwrap();
        let alias = tracker
            .record_click_at("pp", "12", t0() + Duration::hours(1))
            .unwrap()
            .unwrap();
        assert_eq!(alias.unique_contributors, 1);
        let alias = tracker
            .record_click_at("pp", "12", t0() + Duration::hours(2) + Duration::seconds(1))
            .unwrap()
            .unwrap();
        assert_eq!(alias.unique_contributors, 2);
        assert_eq!(alias.last_clicked_at, Some(t0() + Duration::hours(2) + Duration::seconds(1)));
    }

    #[test]
    fn test_search_needs_existing_rows_and_normalizes() {
        let tracker = LearnedAliasTracker::default();
        assert_eq!(tracker.record_search("phnom"), 0);

        tracker.record_click_at("phnom", "120000", t0()).unwrap();
        tracker.record_click_at("phnom", "120202", t0()).unwrap();
        assert_eq!(tracker.record_search("Phnom"), 2);
        assert_eq!(tracker.record_search("phnom"), 2);
        assert_eq!(tracker.record_search(" PHNOM "), 2);
        assert_eq!(tracker.get("phnom", "120000").unwrap().search_count, 3);

        assert_eq!(tracker.record_search("p"), 0);
        assert_eq!(tracker.record_search("  "), 0);
    }

    #[test]
    fn test_blank_clicks_ignored_and_bad_codes_rejected() {
        let tracker = LearnedAliasTracker::default();
        assert!(tracker.record_click("", "120000").unwrap().is_none());
        assert!(tracker.record_click("phnom", " ").unwrap().is_none());
        assert!(matches!(
            tracker.record_click("phnom", "12x"),
            Err(AliasError::InvalidCode(_))
        ));
        assert_eq!(tracker.stats().total, 0);
    }

    #[test]
    fn test_create_conflict_is_retried_as_update() {
        let store = Arc::new(MemoryAliasStore::new());
        let code = LocationCode::parse("120101").unwrap();
        store.create("bkk", &code).unwrap();
        assert!(matches!(
            store.create("bkk", &code),
            Err(AliasError::Conflict { .. })
        ));

        let tracker = LearnedAliasTracker::new(store);
        let alias = tracker.record_click_at("bkk", "120101", t0()).unwrap().unwrap();
        assert_eq!(alias.click_count, 1);
        assert_eq!(tracker.stats().total, 1);
    }

    /// Store where another writer creates the row between the first `find` and `create`.
    #[derive(Debug, Default)]
    struct RacingStore {
        inner: MemoryAliasStore,
        raced: AtomicBool,
    }

    impl AliasStore for RacingStore {
        fn find(&self, term: &str, code: &LocationCode) -> Option<Arc<AliasRow>> {
            if !self.raced.swap(true, Ordering::AcqRel) {
                self.inner.create(term, code).unwrap();
                return None;
            }
            self.inner.find(term, code)
        }

        fn create(&self, term: &str, code: &LocationCode) -> Result<Arc<AliasRow>> {
            self.inner.create(term, code)
        }

        fn rows_for_term(&self, term: &str) -> Vec<(LocationCode, Arc<AliasRow>)> {
            self.inner.rows_for_term(term)
        }

        fn remove(&self, term: &str, code: &LocationCode) -> Option<Arc<AliasRow>> {
            self.inner.remove(term, code)
        }

        fn all(&self) -> Vec<(String, LocationCode, Arc<AliasRow>)> {
            self.inner.all()
        }

        fn restore(&self, alias: &LearnedAlias) {
            self.inner.restore(alias);
        }
    }

    #[test]
    fn test_row_created_between_find_and_create_gets_the_click() {
        let store = Arc::new(RacingStore::default());
        let tracker = LearnedAliasTracker::new(Arc::clone(&store) as Arc<dyn AliasStore>);

        let alias = tracker.record_click_at("bkk", "120101", t0()).unwrap().unwrap();
        assert_eq!(alias.click_count, 1);
        assert_eq!(alias.unique_contributors, 1);
        assert!(store.raced.load(Ordering::Acquire));

        let rows = store.inner.all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2.click_count.load(Ordering::Acquire), 1);
    }

    #[test]
    fn test_concurrent_first_clicks_share_one_row() {
        let tracker = Arc::new(LearnedAliasTracker::default());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let tracker = Arc::clone(&tracker);
                scope.spawn(move || {
                    for _ in 0..25 {
                        tracker.record_click_at("market", "120307", t0()).unwrap();
                    }
                });
            }
        });
        let alias = tracker.get("market", "120307").unwrap();
        assert_eq!(alias.click_count, 200);
        assert_eq!(alias.unique_contributors, 1);
        assert_eq!(tracker.stats().total, 1);
    }

    #[test]
    fn test_competing_promotions_prefer_most_clicks_then_lowest_code() {
        let tracker = LearnedAliasTracker::default();
        for code in ["120201", "120101"] {
            tracker.record_click_at("market", code, t0()).unwrap();
            tracker.promote("market", code).unwrap();
        }
        assert_eq!(tracker.promoted_code("market").unwrap().as_str(), "120101");
        assert_eq!(tracker.promoted_aliases()["market"].as_str(), "120101");

        tracker
            .record_click_at("market", "120201", t0() + Duration::minutes(1))
            .unwrap();
        assert_eq!(tracker.promoted_code("market").unwrap().as_str(), "120201");
        assert_eq!(tracker.promoted_aliases()["market"].as_str(), "120201");
    }

    #[test]
    fn test_admin_operations_and_stats() {
        let tracker = LearnedAliasTracker::default();
        tracker.record_click_at("bkk", "120101", t0()).unwrap();
        tracker.record_click_at("bkk", "120101", t0()).unwrap();
        tracker.record_click_at("wat", "120202", t0()).unwrap();
        tracker.record_search("bkk");
        tracker.record_search("bkk");
        tracker.record_search("bkk");
        tracker.record_search("bkk");

        assert!(tracker.promote("bkk", "120101").unwrap().promoted);
        let stats = tracker.stats();
        assert_eq!((stats.total, stats.promoted, stats.pending), (2, 1, 1));
        assert!((stats.average_click_rate - 0.5).abs() < 1e-9);

        let by_clicks = tracker.list(AliasFilter::All, AliasSort::Clicks);
        assert_eq!(by_clicks[0].search_term, "bkk");
        let pending = tracker.list(AliasFilter::Pending, AliasSort::Term);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].search_term, "wat");

        assert!(!tracker.demote("bkk", "120101").unwrap().promoted);
        assert!(tracker.promoted_aliases().is_empty());

        tracker.remove("wat", "120202").unwrap();
        assert!(matches!(
            tracker.remove("wat", "120202"),
            Err(AliasError::NotFound { .. })
        ));
        assert_eq!(tracker.stats().total, 1);
    }

    #[test]
    fn test_json_snapshot_round_trip() {
        let tracker = LearnedAliasTracker::default();
        drive_to_boundary(&tracker, 5);
        tracker.record_click_at("wat", "120202", t0()).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(tracker.save_json(file.path()).unwrap(), 2);

        let restored = LearnedAliasTracker::default();
        assert_eq!(restored.load_json(file.path()).unwrap(), 2);
        assert_eq!(
            restored.list(AliasFilter::All, AliasSort::Term),
            tracker.list(AliasFilter::All, AliasSort::Term)
        );
        assert_eq!(restored.promoted_code("tuol").unwrap().as_str(), "120300");
    }

    #[derive(Debug, Clone)]
    enum Event {
        Search,
        Click { minutes_later: i64 },
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            Just(Event::Search),
            (0i64..180).prop_map(|minutes_later| Event::Click { minutes_later }),
        ]
    }

    proptest! {
        #[test]
        fn promotion_is_monotonic(events in prop::collection::vec(event(), 1..120)) {
            let tracker = LearnedAliasTracker::default();
            let mut now = t0();
            let mut was_promoted = false;
            for event in events {
                match event {
                    Event::Search => {
                        tracker.record_search("kep");
                    }
                    Event::Click { minutes_later } => {
                        now += Duration::minutes(minutes_later);
                        tracker.record_click_at("kep", "080000", now).unwrap();
                    }
                }
                let promoted = tracker.get("kep", "080000").is_some_and(|a| a.promoted);
                prop_assert!(!was_promoted || promoted, "promotion was withdrawn by telemetry");
                was_promoted = promoted;
            }
        }

        #[test]
        fn counters_never_decrease(events in prop::collection::vec(event(), 1..60)) {
            let tracker = LearnedAliasTracker::default();
            let mut now = t0();
            let mut last = (0, 0, 0);
            for event in events {
                match event {
                    Event::Search => {
                        tracker.record_search("kep");
                    }
                    Event::Click { minutes_later } => {
                        now += Duration::minutes(minutes_later);
                        tracker.record_click_at("kep", "080000", now).unwrap();
                    }
                }
                if let Some(a) = tracker.get("kep", "080000") {
                    let current = (a.click_count, a.search_count, a.unique_contributors);
                    prop_assert!(current.0 >= last.0 && current.1 >= last.1 && current.2 >= last.2);
                    last = current;
                }
            }
        }
    }
}
