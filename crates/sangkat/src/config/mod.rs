use crate::{
    error::SangkatError,
    intent::IntentConfig,
    search::{MAX_LIMIT, SearchConfig},
};

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Create a builder optimized for fast searches (fewer results, fewer fuzzy candidates)
    pub fn fast() -> Self {
        let mut builder = Self::new();
        builder.config.limit = 10;
        builder.config.max_fuzzy_candidates = 100;
        builder
    }

    /// Create a builder optimized for comprehensive searches (full limit, looser fuzzy cutoff)
    pub fn comprehensive() -> Self {
        let mut builder = Self::new();
        builder.config.limit = MAX_LIMIT;
        builder.config.min_fuzzy_score = 0.25;
        builder
    }

    /// Set the maximum number of results to return, clamped to `1..=50` on build
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit;
        self
    }

    /// Enable or disable the similarity pass
    pub fn fuzzy(mut self, enabled: bool) -> Self {
        self.config.fuzzy = enabled;
        self
    }

    /// Enable or disable the literal Khmer pass
    pub fn script_pass(mut self, enabled: bool) -> Self {
        self.config.script_pass = enabled;
        self
    }

    /// Configure the similarity pass
    pub fn fuzzy_search(mut self, min_score: f64, max_candidates: usize) -> Self {
        self.config.min_fuzzy_score = min_score;
        self.config.max_fuzzy_candidates = max_candidates;
        self
    }

    /// Count searches towards learned alias promotion
    pub fn track_searches(mut self, enabled: bool) -> Self {
        self.config.track_searches = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(mut self) -> Result<SearchConfig, SangkatError> {
        let score = self.config.min_fuzzy_score;
        if !(0.0..=1.0).contains(&score) {
            return Err(SangkatError::ConfigError(format!(
                "Fuzzy score threshold must be within 0.0..=1.0, got {score}"
            )));
        }
        if self.config.fuzzy && self.config.max_fuzzy_candidates == 0 {
            return Err(SangkatError::ConfigError(
                "Fuzzy search needs at least one candidate".to_string(),
            ));
        }
        self.config.limit = self.config.limit.clamp(1, MAX_LIMIT);
        Ok(self.config)
    }
}

/// Builder for intent execution parameters
#[derive(Debug, Clone, Default)]
pub struct IntentConfigBuilder {
    config: IntentConfig,
}

impl IntentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore classifier output below this confidence
    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.config.min_confidence = confidence;
        self
    }

    pub fn max_children(mut self, max: usize) -> Self {
        self.config.max_children = max;
        self
    }

    /// Sibling caps for `search_nearby`: districts and communes, then provinces
    pub fn max_siblings(mut self, max: usize, max_provinces: usize) -> Self {
        self.config.max_siblings = max;
        self.config.max_province_siblings = max_provinces;
        self
    }

    pub fn build(self) -> Result<IntentConfig, SangkatError> {
        let confidence = self.config.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(SangkatError::ConfigError(format!(
                "Confidence floor must be within 0.0..=1.0, got {confidence}"
            )));
        }
        Ok(IntentConfig {
            max_children: self.config.max_children.min(MAX_LIMIT),
            ..self.config
        })
    }
}
