//! Sangkat - Cambodian Postal Code Search
//!
//! Sangkat finds Cambodian provinces, districts and communes (sangkat / khum) from whatever
//! a user types: a postal code, an official Latin or Khmer name, a misspelling, or an
//! informal nickname such as `bkk1`. Nicknames come from a static alias dictionary and from
//! learned aliases that are promoted once enough users click the same result.
//!
//! # Quick Start
//!
//! ```rust
//! use sangkat::LocationSearcher;
//!
//! let searcher = LocationSearcher::from_test_data()?;
//!
//! // Typos still find the province
//! let response = searcher.search("phnom pen");
//! assert!(response.codes().iter().take(3).any(|code| *code == "120000"));
//!
//! // Informal names resolve through the alias dictionary
//! let response = searcher.search("bkk1");
//! if let Some(hit) = response.first() {
//!     println!("{} ({}) in {}", hit.record.name_primary, hit.code(), hit.parent_label);
//! }
//!
//! // Clicks feed the learned aliases
//! searcher.record_click("bkk", "120101")?;
//! # Ok::<(), sangkat::error::SangkatError>(())
//! ```
//!
//! # Features
//!
//! - **Full-text search**: Tantivy prefix matching over codes and both scripts
//! - **Typo tolerance**: bigram and Soundex scoring when the index has no answer
//! - **Aliases**: reloadable dictionary plus click-driven learned aliases
//! - **Intents**: run structured classifier output such as "communes in Phnom Penh"
//! - **Exports**: compact JSON and a plain-text directory for offline use
//!
//! # Data
//!
//! The location table is read from `postal_codes.csv` in the directory named by
//! `SANGKAT_DATA_DIR` (default `./sangkat_data`), next to the optional `aliases.json` and
//! `learned_aliases.json`.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod alias;
mod config;
mod core;
pub mod error;
mod export;
pub mod index;
pub mod intent;
mod search;
pub mod similarity;

pub use core::{LocationSearcher, LocationSearcherBuilder};

pub use alias::{
    AliasDictionary, AliasFilter, AliasSort, AliasStats, LearnedAlias, LearnedAliasTracker,
    PromotionThresholds, Resolution, ResolutionSource,
};
pub use config::{IntentConfigBuilder, SearchConfigBuilder};
pub use export::{BulkExport, ExportRow, text_listing};
pub use index::{LocationCode, LocationIndex, LocationKind, LocationRecord};
pub use intent::{
    Intent, IntentConfig, IntentContext, IntentKind, IntentOutcome, looks_like_natural_language,
};
pub use sangkat_data_processing as data_processing;
pub use search::{MAX_LIMIT, MatchKind, SearchConfig, SearchHit, SearchResponse, contains_khmer};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Sangkat library.
///
/// `RUST_LOG` wins when set; otherwise `level` is used. Tantivy is capped at `warn`.
/// Later calls are no-ops.
///
/// # Examples
///
/// ```rust
/// use sangkat::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// init_logging(Level::DEBUG)?;
/// # Ok::<(), sangkat::error::SangkatError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::SangkatError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    })
}
