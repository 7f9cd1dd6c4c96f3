//! Structured queries produced by an external natural-language classifier.
//!
//! The classifier turns "communes in Phnom Penh" into an [`Intent`]; the
//! [`IntentExecutor`] maps each intent onto index lookups. Anything malformed,
//! low-confidence or missing its required field produces an empty [`IntentOutcome`].

mod executor;

pub use executor::{IntentConfig, IntentExecutor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{index::LocationKind, search::SearchHit};

/// Words that suggest a query is a sentence rather than a place name.
const NATURAL_LANGUAGE_MARKERS: [&str; 11] = [
    "in",
    "of",
    "near",
    "around",
    "postal code",
    "zip",
    "communes",
    "districts",
    "provinces",
    "list",
    "where",
];
const MIN_NATURAL_LANGUAGE_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    SearchLocation,
    ListByParent,
    SearchLandmark,
    SearchNearby,
    #[serde(other)]
    Unknown,
}

/// Classifier output. Every field except `intent` may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub intent: IntentKind,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl Intent {
    pub fn new(intent: IntentKind, confidence: f64) -> Self {
        Self {
            intent,
            location_name: None,
            location_type: None,
            parent_name: None,
            landmark: None,
            confidence,
        }
    }

    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    pub fn with_location_type(mut self, kind: LocationKind) -> Self {
        self.location_type = Some(kind.as_str().to_string());
        self
    }

    pub fn with_parent_name(mut self, name: impl Into<String>) -> Self {
        self.parent_name = Some(name.into());
        self
    }

    pub fn with_landmark(mut self, landmark: impl Into<String>) -> Self {
        self.landmark = Some(landmark.into());
        self
    }

    /// Parse classifier JSON. Malformed input yields `None`.
    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json)
            .inspect_err(|e| debug!(error = %e, "Discarding malformed intent"))
            .ok()
    }

    /// The requested location kind; unknown values are treated as absent.
    pub fn kind(&self) -> Option<LocationKind> {
        self.location_type.as_deref().and_then(|t| t.parse().ok())
    }

    pub(crate) fn location_name(&self) -> Option<&str> {
        present(self.location_name.as_deref())
    }

    pub(crate) fn parent_name(&self) -> Option<&str> {
        present(self.parent_name.as_deref())
    }

    pub(crate) fn landmark(&self) -> Option<&str> {
        present(self.landmark.as_deref())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// What an executed intent did, for display and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IntentContext {
    SearchLocation {
        search_term: String,
        location_type: Option<LocationKind>,
    },
    ListByParent {
        parent_name: String,
        parent_code: String,
        child_type: LocationKind,
    },
    SearchLandmark {
        landmark: String,
        resolved_to: Option<String>,
    },
    SearchNearby {
        reference: String,
        reference_code: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentOutcome {
    pub hits: Vec<SearchHit>,
    pub context: Option<IntentContext>,
}

impl IntentOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.hits.iter().map(SearchHit::code).collect()
    }
}

/// Heuristic gate for sending a query to the classifier: at least three words and a
/// marker such as `in`, `near` or `postal code` as whole words.
pub fn looks_like_natural_language(query: &str) -> bool {
    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.len() < MIN_NATURAL_LANGUAGE_WORDS {
        return false;
    }
    NATURAL_LANGUAGE_MARKERS.iter().any(|marker| {
        let marker_words: Vec<&str> = marker.split_whitespace().collect();
        words
            .windows(marker_words.len())
            .any(|window| window == marker_words.as_slice())
    })
}
