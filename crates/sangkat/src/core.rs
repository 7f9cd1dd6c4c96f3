//! The [`LocationSearcher`] facade.
//!
//! It owns the location index, the alias dictionary and the learned alias tracker, and
//! records search telemetry as queries pass through it.
//!
//! ```rust
//! use sangkat::LocationSearcher;
//!
//! let searcher = LocationSearcher::from_test_data()?;
//! let response = searcher.search("bkk1");
//! assert_eq!(response.first().map(|hit| hit.code()), Some("120101"));
//! # Ok::<(), sangkat::error::SangkatError>(())
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use sangkat_data_processing::{
    ALIASES_JSON, DataError, LEARNED_ALIASES_JSON, POSTAL_CODES_CSV, TestDataConfig,
    create_test_data, get_data_dir, test_data::SAMPLE_ALIASES,
};
use tracing::{debug, info, instrument};

use crate::{
    alias::{AliasDictionary, AliasResolver, LearnedAlias, LearnedAliasTracker},
    error::{Result, SangkatError},
    export::{BulkExport, text_listing},
    index::{LocationCode, LocationIndex, LocationKind, LocationRecord},
    intent::{Intent, IntentConfig, IntentExecutor, IntentOutcome},
    search::{SearchConfig, SearchResponse, bulk_search_inner, search_inner},
};

/// Search, intent execution and alias learning over one location table.
///
/// Cloning is cheap: the index and both alias stores are shared.
///
/// ```rust
/// use sangkat::{LocationSearcher, SearchConfig};
///
/// let searcher = LocationSearcher::from_test_data()?;
/// let config = SearchConfig::builder().limit(3).build()?;
/// let response = searcher.search_with_config("phnom pen", &config);
/// assert!(response.len() <= 3);
/// assert!(response.codes().contains(&"120000"));
/// # Ok::<(), sangkat::error::SangkatError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocationSearcher {
    index: Arc<LocationIndex>,
    resolver: AliasResolver,
    config: SearchConfig,
    intent_config: IntentConfig,
}

impl LocationSearcher {
    /// Create a searcher from pre-built components with default configuration.
    pub fn from_components(
        index: LocationIndex,
        dictionary: AliasDictionary,
        learned: Arc<LearnedAliasTracker>,
    ) -> Self {
        Self {
            index: Arc::new(index),
            resolver: AliasResolver::new(Arc::new(dictionary), learned),
            config: SearchConfig::default(),
            intent_config: IntentConfig::default(),
        }
    }

    /// Load `postal_codes.csv`, and `aliases.json` / `learned_aliases.json` when present,
    /// from `data_dir`.
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        LocationSearcherBuilder::new().data_dir(data_dir).build()
    }

    /// [`Self::from_data_dir`] on the directory named by `SANGKAT_DATA_DIR`.
    pub fn from_default_data_dir() -> Result<Self> {
        LocationSearcherBuilder::new().build()
    }

    /// A searcher over the generated sample dataset and sample aliases.
    #[instrument(name = "Create LocationSearcher with Test Data", level = "info")]
    pub fn from_test_data() -> Result<Self> {
        let t_init = std::time::Instant::now();
        let file = create_test_data(&TestDataConfig::sample())?;
        let index = LocationIndex::from_csv(file.path())?;
        let searcher = Self::from_components(
            index,
            AliasDictionary::from_entries(SAMPLE_ALIASES),
            Arc::default(),
        );
        info!(
            elapsed_seconds = ?t_init.elapsed(),
            records = searcher.index.len(),
            "LocationSearcher test data initialization complete"
        );
        Ok(searcher)
    }

    pub fn builder() -> LocationSearcherBuilder {
        LocationSearcherBuilder::new()
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_intent_config(mut self, intent_config: IntentConfig) -> Self {
        self.intent_config = intent_config;
        self
    }

    // === Search ===

    pub fn search(&self, query: &str) -> SearchResponse {
        self.search_with_config(query, &self.config)
    }

    /// Search with a per-call limit. The limit is clamped to `1..=50`.
    pub fn search_with_limit(&self, query: &str, limit: usize) -> SearchResponse {
        let config = SearchConfig {
            limit,
            ..self.config.clone()
        };
        self.search_with_config(query, &config)
    }

    pub fn search_with_config(&self, query: &str, config: &SearchConfig) -> SearchResponse {
        self.track_search(query, config);
        search_inner(query, &self.index, &self.resolver, config)
    }

    /// Independent searches in parallel, responses in input order.
    pub fn search_bulk<Q>(&self, queries: &[Q]) -> Vec<SearchResponse>
    where
        Q: AsRef<str> + Sync,
    {
        self.search_bulk_with_config(queries, &self.config)
    }

    pub fn search_bulk_with_config<Q>(&self, queries: &[Q], config: &SearchConfig) -> Vec<SearchResponse>
    where
        Q: AsRef<str> + Sync,
    {
        for query in queries {
            self.track_search(query.as_ref(), config);
        }
        bulk_search_inner(queries, &self.index, &self.resolver, config)
    }

    fn track_search(&self, query: &str, config: &SearchConfig) {
        if config.track_searches {
            let rows = self.resolver.learned().record_search(query);
            if rows > 0 {
                debug!(query, rows, "Counted search against learned aliases");
            }
        }
    }

    // === Learning ===

    /// Count a click on `code` from the results of `term`.
    pub fn record_click(&self, term: &str, code: &str) -> Result<Option<LearnedAlias>> {
        Ok(self.resolver.learned().record_click(term, code)?)
    }

    /// Promoted learned aliases, term to code.
    pub fn promoted_aliases(&self) -> BTreeMap<String, LocationCode> {
        self.resolver.learned().promoted_aliases()
    }

    /// Re-read the alias dictionary. The previous dictionary stays active on failure.
    pub fn reload_aliases(&self) -> Result<usize> {
        Ok(self.resolver.dictionary().reload()?)
    }

    /// Persist learned aliases for a later [`LocationSearcherBuilder::learned_snapshot`].
    pub fn save_learned_aliases(&self, path: impl AsRef<Path>) -> Result<usize> {
        Ok(self.resolver.learned().save_json(path)?)
    }

    // === Intents ===

    pub fn execute_intent(&self, intent: &Intent) -> IntentOutcome {
        IntentExecutor::new(&self.index, &self.resolver, &self.config, &self.intent_config)
            .execute(intent)
    }

    /// Parse and run classifier output. Malformed JSON yields an empty outcome.
    pub fn execute_intent_json(&self, json: &str) -> IntentOutcome {
        Intent::from_json(json).map_or_else(IntentOutcome::empty, |intent| self.execute_intent(&intent))
    }

    // === Hierarchy ===

    pub fn get(&self, code: &str) -> Option<&LocationRecord> {
        self.index.get(code)
    }

    /// Units of `kind` under `code`; empty for an unknown code.
    pub fn children_of(&self, code: &str, kind: LocationKind) -> Vec<&LocationRecord> {
        self.index
            .get(code)
            .map(|parent| self.index.children_of(&parent.code, kind))
            .unwrap_or_default()
    }

    pub fn siblings_of(&self, code: &str) -> Vec<&LocationRecord> {
        self.index
            .get(code)
            .map(|record| self.index.siblings_of(record))
            .unwrap_or_default()
    }

    // === Export ===

    pub fn export(&self) -> BulkExport {
        BulkExport::build(&self.index, &self.resolver.dictionary().snapshot())
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export())?)
    }

    pub fn text_listing(&self, generated: NaiveDate) -> String {
        text_listing(&self.index, generated)
    }

    // === Utility Methods ===

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    pub fn dictionary(&self) -> &AliasDictionary {
        self.resolver.dictionary()
    }

    pub fn learned(&self) -> &LearnedAliasTracker {
        self.resolver.learned()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn intent_config(&self) -> &IntentConfig {
        &self.intent_config
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocationSearcherBuilder {
    data_dir: Option<PathBuf>,
    postal_codes: Option<PathBuf>,
    aliases: Option<PathBuf>,
    learned_snapshot: Option<PathBuf>,
    learned: Option<Arc<LearnedAliasTracker>>,
    config: SearchConfig,
    intent_config: IntentConfig,
}

impl LocationSearcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding `postal_codes.csv` and the optional alias files.
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Override the postal-code CSV location.
    pub fn postal_codes(mut self, path: impl AsRef<Path>) -> Self {
        self.postal_codes = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the alias dictionary location. Unlike the default file, it must exist.
    pub fn aliases(mut self, path: impl AsRef<Path>) -> Self {
        self.aliases = Some(path.as_ref().to_path_buf());
        self
    }

    /// Learned aliases saved by [`LocationSearcher::save_learned_aliases`]. Must exist.
    pub fn learned_snapshot(mut self, path: impl AsRef<Path>) -> Self {
        self.learned_snapshot = Some(path.as_ref().to_path_buf());
        self
    }

    /// Share a tracker between searchers. No snapshot is loaded into it by default.
    pub fn learned_tracker(mut self, tracker: Arc<LearnedAliasTracker>) -> Self {
        self.learned = Some(tracker);
        self
    }

    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn intent_config(mut self, intent_config: IntentConfig) -> Self {
        self.intent_config = intent_config;
        self
    }

    #[instrument(name = "Build LocationSearcher", level = "info", skip(self))]
    pub fn build(self) -> Result<LocationSearcher> {
        let t_init = std::time::Instant::now();
        let data_dir = self
            .data_dir
            .unwrap_or_else(|| get_data_dir().to_path_buf());

        let postal_codes = self
            .postal_codes
            .unwrap_or_else(|| data_dir.join(POSTAL_CODES_CSV));
        if !postal_codes.exists() {
            return Err(SangkatError::DataProcessing(DataError::RequiredFileNotFound(
                postal_codes,
            )));
        }
        let index = LocationIndex::from_csv(&postal_codes)?;

        let dictionary = match self.aliases {
            Some(path) => AliasDictionary::from_path(path)?,
            None => {
                let path = data_dir.join(ALIASES_JSON);
                if path.exists() {
                    AliasDictionary::from_path(path)?
                } else {
                    info!(path = ?path, "No alias dictionary found, starting empty");
                    AliasDictionary::default()
                }
            }
        };

        let learned = match (self.learned, self.learned_snapshot) {
            (Some(tracker), Some(path)) => {
                tracker.load_json(path)?;
                tracker
            }
            (Some(tracker), None) => tracker,
            (None, snapshot) => {
                let tracker = Arc::new(LearnedAliasTracker::default());
                match snapshot {
                    Some(path) => {
                        tracker.load_json(path)?;
                    }
                    None => {
                        let path = data_dir.join(LEARNED_ALIASES_JSON);
                        if path.exists() {
                            tracker.load_json(path)?;
                        }
                    }
                }
                tracker
            }
        };

        let searcher = LocationSearcher::from_components(index, dictionary, learned)
            .with_config(self.config)
            .with_intent_config(self.intent_config);
        info!(
            elapsed_seconds = ?t_init.elapsed(),
            records = searcher.index.len(),
            aliases = searcher.dictionary().len(),
            full_text = searcher.index.has_full_text(),
            "LocationSearcher initialization complete"
        );
        Ok(searcher)
    }
}
