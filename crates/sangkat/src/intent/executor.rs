use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Intent, IntentContext, IntentKind, IntentOutcome};
use crate::{
    alias::AliasResolver,
    index::{LocationIndex, LocationKind, LocationRecord},
    search::{MatchKind, SearchConfig, SearchHit, search_inner, search_resolved},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Intents below this confidence are ignored
    pub min_confidence: f64,
    pub max_children: usize,
    /// Sibling cap for districts and communes
    pub max_siblings: usize,
    /// Sibling cap for provinces
    pub max_province_siblings: usize,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            max_children: 50,
            max_siblings: 20,
            max_province_siblings: 10,
        }
    }
}

/// Runs [`Intent`]s against the index. Borrowing, so one can be built per call.
#[derive(Debug, Clone, Copy)]
pub struct IntentExecutor<'a> {
    index: &'a LocationIndex,
    resolver: &'a AliasResolver,
    search_config: &'a SearchConfig,
    config: &'a IntentConfig,
}

impl<'a> IntentExecutor<'a> {
    pub fn new(
        index: &'a LocationIndex,
        resolver: &'a AliasResolver,
        search_config: &'a SearchConfig,
        config: &'a IntentConfig,
    ) -> Self {
        Self {
            index,
            resolver,
            search_config,
            config,
        }
    }

    #[instrument(name = "Execute Intent", level = "debug", skip_all, fields(intent = ?intent.intent, confidence = intent.confidence))]
    pub fn execute(&self, intent: &Intent) -> IntentOutcome {
        if intent.confidence.is_nan() || intent.confidence < self.config.min_confidence {
            debug!("Intent below confidence floor");
            return IntentOutcome::empty();
        }
        let outcome = match intent.intent {
            IntentKind::SearchLocation => self.search_location(intent),
            IntentKind::ListByParent => self.list_by_parent(intent),
            IntentKind::SearchLandmark => self.search_landmark(intent),
            IntentKind::SearchNearby => self.search_nearby(intent),
            IntentKind::Unknown => None,
        };
        let outcome = outcome.unwrap_or_default();
        debug!(hits = outcome.hits.len(), "Intent executed");
        outcome
    }

    fn search(&self, term: &str) -> Vec<SearchHit> {
        search_inner(term, self.index, self.resolver, self.search_config).hits
    }

    fn hits(&self, records: impl IntoIterator<Item = &'a LocationRecord>) -> Vec<SearchHit> {
        records
            .into_iter()
            .map(|record| SearchHit::new(self.index, record, MatchKind::Exact))
            .collect()
    }

    fn search_location(&self, intent: &Intent) -> Option<IntentOutcome> {
        let name = intent.location_name()?;
        let kind = intent.kind();
        let mut hits = self.search(name);
        if let Some(kind) = kind
            && hits.iter().any(|h| h.record.kind == kind)
        {
            hits.retain(|h| h.record.kind == kind);
        }
        Some(IntentOutcome {
            hits,
            context: Some(IntentContext::SearchLocation {
                search_term: name.to_string(),
                location_type: kind,
            }),
        })
    }

    fn list_by_parent(&self, intent: &Intent) -> Option<IntentOutcome> {
        let parent_name = intent.parent_name()?;
        let found = self.search(parent_name);
        // A fuzzy province must not outrank an exact district.
        let parent = found
            .iter()
            .find(|h| {
                h.record.kind == LocationKind::Province
                    && !matches!(h.match_kind, MatchKind::Fuzzy { .. })
            })
            .or_else(|| found.first())?;
        let parent = self.index.get(parent.code())?;

        let child_type = match intent.kind() {
            Some(kind) if parent.kind.contains(kind) => kind,
            _ => parent.kind.child()?,
        };
        let children = self.index.children_of(&parent.code, child_type);
        Some(IntentOutcome {
            hits: self.hits(children.into_iter().take(self.config.max_children)),
            context: Some(IntentContext::ListByParent {
                parent_name: parent.name_primary.clone(),
                parent_code: parent.code().to_string(),
                child_type,
            }),
        })
    }

    fn search_landmark(&self, intent: &Intent) -> Option<IntentOutcome> {
        let landmark = intent.landmark()?;
        let resolution = self.resolver.resolve(landmark);
        let resolved_to = resolution.changed().then(|| resolution.term.clone());
        let hits = search_resolved(landmark, resolution, self.index, self.search_config).hits;
        Some(IntentOutcome {
            hits,
            context: Some(IntentContext::SearchLandmark {
                landmark: landmark.to_string(),
                resolved_to,
            }),
        })
    }

    fn search_nearby(&self, intent: &Intent) -> Option<IntentOutcome> {
        let name = intent.location_name().or_else(|| intent.landmark())?;
        let reference = self.search(name).into_iter().next()?;
        let record = self.index.get(reference.code())?;
        let cap = match record.kind {
            LocationKind::Province => self.config.max_province_siblings,
            LocationKind::District | LocationKind::Commune => self.config.max_siblings,
        };
        let context = IntentContext::SearchNearby {
            reference: record.name_primary.clone(),
            reference_code: record.code().to_string(),
        };
        let mut hits = vec![reference];
        hits.extend(self.hits(self.index.siblings_of(record).into_iter().take(cap)));
        Some(IntentOutcome {
            hits,
            context: Some(context),
        })
    }
}
