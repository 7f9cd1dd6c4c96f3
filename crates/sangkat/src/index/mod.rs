//! Full-text search index over the postal-code directory.
//!
//! Records live in a plain `Vec` that is the source of truth; a Tantivy index held in RAM
//! sits beside it and maps query tokens to record ordinals. When the Tantivy side cannot
//! be built or queried the index degrades to a substring scan over the same records.

mod record;

use std::path::Path;

use ahash::AHashMap as HashMap;
pub use error::IndexError;
use error::Result;
pub use record::{LocationCode, LocationKind, LocationRecord};
use sangkat_data_processing::LocationRow;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term,
    collector::TopDocs,
    query::{BooleanQuery, BoostQuery, Occur, Query, RegexQuery, TermQuery},
    schema::{
        FAST, Field, INDEXED, IndexRecordOption, STORED, Schema, SchemaBuilder, TextFieldIndexing,
        TextOptions, Value,
    },
    tokenizer::{LowerCaser, TextAnalyzer, WhitespaceTokenizer},
};
use tracing::{debug, info, instrument, trace, warn};

/// Upper bound on records returned by [`LocationIndex::exact_search`].
pub const EXACT_SEARCH_LIMIT: usize = 50;

const NAME_TOKENIZER: &str = "location_name";
const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Field layout and boosts for the location index.
///
/// Codes use the `raw` tokenizer so `1201` only ever matches as a code prefix; names are
/// split on whitespace and lowercased, which keeps Khmer words (no spaces, combining
/// marks) intact as single tokens.
#[derive(Debug, Clone, Copy)]
struct LocationIndexDef {
    ordinal: Field,
    code: Field,
    name_primary: Field,
    name_secondary: Field,
}

impl LocationIndexDef {
    fn schema() -> (Schema, Self) {
        let mut schema_builder = SchemaBuilder::new();

        let name_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(NAME_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let code_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("raw")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let ordinal = schema_builder.add_u64_field("ordinal", STORED | INDEXED | FAST);
        let code = schema_builder.add_text_field("code", code_options);
        let name_primary = schema_builder.add_text_field("name_primary", name_options.clone());
        let name_secondary = schema_builder.add_text_field("name_secondary", name_options);
        (
            schema_builder.build(),
            Self {
                ordinal,
                code,
                name_primary,
                name_secondary,
            },
        )
    }

    /// Code matches dominate, then the Latin name, then the Khmer name.
    fn field_boosts(self) -> [(Field, f32); 3] {
        [
            (self.code, 10.0),
            (self.name_primary, 3.0),
            (self.name_secondary, 2.0),
        ]
    }

    fn index_data(self, writer: &mut IndexWriter, records: &[LocationRecord]) -> Result<()> {
        for (ordinal, record) in records.iter().enumerate() {
            let mut doc = TantivyDocument::default();
            doc.add_u64(self.ordinal, ordinal as u64);
            doc.add_text(self.code, record.code());
            doc.add_text(self.name_primary, &record.name_primary);
            if let Some(name) = &record.name_secondary {
                doc.add_text(self.name_secondary, name);
            }
            writer.add_document(doc)?;
        }
        Ok(())
    }
}

/// Tantivy side of the index.
#[derive(Clone)]
struct FTSIndex {
    // Kept so the directory outlives the reader.
    _index: Index,
    reader: IndexReader,
    def: LocationIndexDef,
}

impl FTSIndex {
    #[instrument(name = "Create FTS Index", skip_all, fields(num_records = records.len()))]
    fn build(records: &[LocationRecord]) -> Result<Self> {
        let (schema, def) = LocationIndexDef::schema();
        let index = Index::create_in_ram(schema);
        index.tokenizers().register(
            NAME_TOKENIZER,
            TextAnalyzer::builder(WhitespaceTokenizer::default())
                .filter(LowerCaser)
                .build(),
        );

        let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BUDGET)?;
        def.index_data(&mut index_writer, records)?;
        index_writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        info!("Index creation complete");
        Ok(Self {
            _index: index,
            reader,
            def,
        })
    }

    /// Every token must prefix-match at least one field; a token that is also a whole
    /// indexed word picks up an extra BM25-scored clause.
    fn build_query(&self, query_str: &str) -> Result<Box<dyn Query>> {
        let tokens: Vec<String> = query_str.split_whitespace().map(str::to_lowercase).collect();
        if tokens.is_empty() {
            return Err(anyhow::anyhow!("Query string is empty.").into());
        }

        let mut token_clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let pattern = format!("{}.*", regex::escape(token));
            let mut field_clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
            for (field, boost) in self.def.field_boosts() {
                let prefix_query = RegexQuery::from_pattern(&pattern, field)?;
                field_clauses.push((
                    Occur::Should,
                    Box::new(BoostQuery::new(Box::new(prefix_query), boost)),
                ));
                let exact_query = TermQuery::new(
                    Term::from_field_text(field, token),
                    IndexRecordOption::WithFreqs,
                );
                field_clauses.push((
                    Occur::Should,
                    Box::new(BoostQuery::new(Box::new(exact_query), boost)),
                ));
            }
            token_clauses.push((Occur::Must, Box::new(BooleanQuery::new(field_clauses))));
        }

        let query = BooleanQuery::new(token_clauses);
        trace!(?query, "Final query constructed");
        Ok(Box::new(query))
    }

    #[instrument(name = "Search Text Index", skip_all, level = "debug", fields(query = query_str, limit))]
    fn search(&self, query_str: &str, limit: usize) -> Result<Vec<usize>> {
        let query = self.build_query(query_str)?;
        let searcher = self.reader.searcher();

        let t_search = std::time::Instant::now();
        let top_docs = searcher.search(&*query, &TopDocs::with_limit(limit))?;
        debug!(
            num_results = top_docs.len(),
            search_execution_seconds = t_search.elapsed().as_secs_f32(),
            "Tantivy search execution complete"
        );

        top_docs
            .into_iter()
            .map(|(_score, doc_address)| {
                let doc = searcher.doc::<TantivyDocument>(doc_address)?;
                let ordinal = doc
                    .get_first(self.def.ordinal)
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| anyhow::anyhow!("Document without ordinal: {doc_address:?}"))?;
                Ok(ordinal as usize)
            })
            .collect()
    }
}

/// The authoritative location table plus its full-text index.
///
/// Read-only after construction, so it can be shared freely between threads.
#[derive(Clone)]
pub struct LocationIndex {
    records: Vec<LocationRecord>,
    by_code: HashMap<LocationCode, usize>,
    fts: Option<FTSIndex>,
}

impl std::fmt::Debug for LocationIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationIndex")
            .field("records", &self.records.len())
            .field("has_fts", &self.fts.is_some())
            .finish()
    }
}

impl LocationIndex {
    /// Build the index from records. Later duplicates of a code are dropped.
    ///
    /// A Tantivy failure is not fatal: the index is returned in substring-scan mode.
    pub fn new(records: Vec<LocationRecord>) -> Self {
        let mut index = Self::substring_only(records);
        match FTSIndex::build(&index.records) {
            Ok(fts) => index.fts = Some(fts),
            Err(e) => warn!(error = ?e, "Full-text index unavailable, using substring scan"),
        }
        index
    }

    /// An index that never consults Tantivy.
    pub fn substring_only(records: Vec<LocationRecord>) -> Self {
        let mut by_code = HashMap::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if by_code.contains_key(&record.code) {
                warn!(code = %record.code, name = %record.name_primary, "Duplicate code, keeping first record");
                continue;
            }
            by_code.insert(record.code.clone(), unique.len());
            unique.push(record);
        }
        Self {
            records: unique,
            by_code,
            fts: None,
        }
    }

    /// Convert import rows, skipping (and logging) rows that break the code rules.
    pub fn from_rows(rows: impl IntoIterator<Item = LocationRow>) -> Self {
        let records = rows
            .into_iter()
            .filter_map(|row| {
                let code = row.postal_code.clone();
                LocationRecord::try_from(row)
                    .inspect_err(|e| warn!(%code, error = %e, "Skipping invalid location row"))
                    .ok()
            })
            .collect();
        Self::new(records)
    }

    /// Load and index a `postal_code,name_en,name_km,type` CSV export.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let rows = sangkat_data_processing::load_location_rows(path.as_ref())?;
        Ok(Self::from_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_full_text(&self) -> bool {
        self.fts.is_some()
    }

    pub fn records(&self) -> &[LocationRecord] {
        &self.records
    }

    pub fn get(&self, code: &str) -> Option<&LocationRecord> {
        let code = LocationCode::parse(code).ok()?;
        self.by_code.get(&code).map(|&i| &self.records[i])
    }

    pub fn parent_of(&self, record: &LocationRecord) -> Option<&LocationRecord> {
        let parent = record.parent_code()?;
        self.by_code.get(&parent).map(|&i| &self.records[i])
    }

    /// Display label for where a record sits: `"District, Province"` for a commune, the
    /// province for a district, empty for a province.
    pub fn parent_label(&self, record: &LocationRecord) -> String {
        match record.kind {
            LocationKind::Province => String::new(),
            LocationKind::District => self
                .parent_of(record)
                .map(|p| p.name_primary.clone())
                .unwrap_or_default(),
            LocationKind::Commune => {
                let district = self.parent_of(record);
                let province = self
                    .by_code
                    .get(&record.code.ancestor(LocationKind::Province))
                    .map(|&i| &self.records[i]);
                [district, province]
                    .into_iter()
                    .flatten()
                    .map(|r| r.name_primary.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
    }

    /// Ranked prefix search over code, primary and secondary names.
    ///
    /// Falls back to [`Self::substring_scan`] when the full-text index is missing or fails.
    pub fn exact_search(&self, term: &str) -> Vec<&LocationRecord> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }
        let Some(fts) = &self.fts else {
            return self.substring_scan(term);
        };
        match fts.search(term, EXACT_SEARCH_LIMIT) {
            Ok(ordinals) => ordinals
                .into_iter()
                .filter_map(|ordinal| self.records.get(ordinal))
                .collect(),
            Err(e) => {
                warn!(error = ?e, term, "Full-text search failed, using substring scan");
                self.substring_scan(term)
            }
        }
    }

    /// Case-insensitive substring match on code and both names, in insertion order.
    pub fn substring_scan(&self, term: &str) -> Vec<&LocationRecord> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| {
                r.code().contains(&needle)
                    || r.name_primary.to_lowercase().contains(&needle)
                    || r
                        .name_secondary
                        .as_ref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .take(EXACT_SEARCH_LIMIT)
            .collect()
    }

    /// Records whose secondary name contains `term` verbatim, in insertion order.
    pub fn secondary_name_scan(&self, term: &str) -> Vec<&LocationRecord> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| r.name_secondary.as_deref().is_some_and(|n| n.contains(term)))
            .take(EXACT_SEARCH_LIMIT)
            .collect()
    }

    /// All records of `kind` inside the unit identified by `code`, ordered by name.
    ///
    /// Empty when `kind` is not strictly below the unit's own kind.
    pub fn children_of(&self, code: &LocationCode, kind: LocationKind) -> Vec<&LocationRecord> {
        let parent_kind = code.inferred_kind();
        if !parent_kind.contains(kind) {
            return Vec::new();
        }
        let prefix = code.prefix_for(parent_kind);
        let mut children: Vec<&LocationRecord> = self
            .records
            .iter()
            .filter(|r| r.kind == kind && r.code().starts_with(prefix))
            .collect();
        sort_by_name(&mut children);
        children
    }

    /// Same-kind records under the same parent, excluding `record`, ordered by name.
    pub fn siblings_of(&self, record: &LocationRecord) -> Vec<&LocationRecord> {
        let prefix = record.sibling_prefix();
        let mut siblings: Vec<&LocationRecord> = self
            .records
            .iter()
            .filter(|r| r.kind == record.kind && r.code != record.code && r.code().starts_with(prefix))
            .collect();
        sort_by_name(&mut siblings);
        siblings
    }
}

fn sort_by_name(records: &mut [&LocationRecord]) {
    records.sort_by(|a, b| {
        a.name_primary
            .cmp(&b.name_primary)
            .then_with(|| a.code.cmp(&b.code))
    });
}

mod error {
    use thiserror::Error;

    use super::LocationKind;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error("Data processing error: {0}")]
        DataProcessing(#[from] sangkat_data_processing::DataError),
        #[error("Invalid postal code: {0:?}")]
        InvalidCode(String),
        #[error("Unknown location kind: {0:?}")]
        UnknownKind(String),
        #[error("Code {code} cannot belong to a {kind}")]
        KindMismatch { code: String, kind: LocationKind },
        #[error("Location {0} has no primary name")]
        MissingName(String),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}
