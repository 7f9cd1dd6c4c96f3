//! Hand-maintained informal name mapping, e.g. `"bkk1" -> "Boeng Keng Kang Muoy"`.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use tracing::{info, instrument, warn};

use super::{
    error::{AliasError, Result},
    normalize_term,
};
use crate::index::LocationRecord;

/// Immutable view of the dictionary at one point in time.
#[derive(Debug, Clone, Default)]
pub struct AliasSnapshot {
    entries: HashMap<String, String>,
}

impl AliasSnapshot {
    /// Keys are normalized, targets are kept as written. Blank keys or targets are dropped.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|(term, target)| {
                let term = normalize_term(term.as_ref());
                let target = target.as_ref().trim();
                (!term.is_empty() && !target.is_empty()).then(|| (term, target.to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.entries.get(&normalize_term(term)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by term.
    pub fn entries(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .map(|(term, target)| (term.as_str(), target.as_str()))
            .collect()
    }

    /// Lowercased target to the informal terms pointing at it, terms sorted.
    pub fn reverse_aliases(&self) -> BTreeMap<String, Vec<String>> {
        let mut reverse: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for (term, target) in &self.entries {
            reverse
                .entry(target.to_lowercase())
                .or_default()
                .insert(term.as_str());
        }
        reverse
            .into_iter()
            .map(|(target, terms)| (target, terms.into_iter().map(ToString::to_string).collect()))
            .collect()
    }

    /// Terms whose target is the record's primary name or its code, sorted.
    pub fn aliases_for(&self, record: &LocationRecord) -> Vec<String> {
        let name = record.name_primary.to_lowercase();
        let mut terms: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, target)| target.to_lowercase() == name || target.as_str() == record.code())
            .map(|(term, _)| term.clone())
            .collect();
        terms.sort();
        terms
    }
}

#[derive(Debug, Clone)]
enum AliasSource {
    File(PathBuf),
    Inline(Arc<AliasSnapshot>),
}

/// Reloadable alias dictionary.
///
/// Readers take an `Arc` of the current [`AliasSnapshot`]; [`AliasDictionary::reload`]
/// builds a new snapshot and swaps it in, so a reader never sees a half-loaded map.
#[derive(Debug)]
pub struct AliasDictionary {
    source: AliasSource,
    snapshot: RwLock<Arc<AliasSnapshot>>,
}

impl Default for AliasDictionary {
    fn default() -> Self {
        Self::from_snapshot(AliasSnapshot::default())
    }
}

impl AliasDictionary {
    pub fn from_snapshot(snapshot: AliasSnapshot) -> Self {
        let snapshot = Arc::new(snapshot);
        Self {
            source: AliasSource::Inline(Arc::clone(&snapshot)),
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_snapshot(AliasSnapshot::from_entries(entries))
    }

    /// Load a flat JSON object `{ "informal term": "Official Name or code" }`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = read_snapshot(&path)?;
        Ok(Self {
            source: AliasSource::File(path),
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<AliasSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn lookup(&self, term: &str) -> Option<String> {
        self.snapshot().get(term).map(ToString::to_string)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Rebuild from the original source. On failure the previous snapshot stays active.
    #[instrument(name = "Reload alias dictionary", skip(self), level = "info")]
    pub fn reload(&self) -> Result<usize> {
        let snapshot = match &self.source {
            AliasSource::File(path) => read_snapshot(path).inspect_err(|e| {
                warn!(path = ?path, error = %e, "Alias reload failed, keeping previous dictionary");
            })?,
            AliasSource::Inline(snapshot) => AliasSnapshot::clone(snapshot),
        };
        let count = snapshot.len();
        *self.snapshot.write() = Arc::new(snapshot);
        info!(aliases = count, "Alias dictionary reloaded");
        Ok(count)
    }

    /// Swap in a new set of entries directly.
    pub fn replace<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        *self.snapshot.write() = Arc::new(AliasSnapshot::from_entries(entries));
    }
}

fn read_snapshot(path: &Path) -> Result<AliasSnapshot> {
    let file = File::open(path)?;
    let raw: std::collections::HashMap<String, String> = serde_json::from_reader(BufReader::new(file))?;
    let snapshot = AliasSnapshot::from_entries(raw);
    if snapshot.is_empty() {
        warn!(path = ?path, "Alias dictionary is empty");
    }
    Ok(snapshot)
}

impl TryFrom<&Path> for AliasDictionary {
    type Error = AliasError;

    fn try_from(path: &Path) -> Result<Self> {
        Self::from_path(path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sangkat_data_processing::test_data::{SAMPLE_ALIASES, create_test_aliases};

    use super::*;
    use crate::index::{LocationCode, LocationKind};

    #[test]
    fn test_keys_are_normalized() {
        let dictionary = AliasDictionary::from_entries([(" BKK1 ", "Boeng Keng Kang Muoy"), ("", "x")]);
        assert_eq!(dictionary.len(), 1);
        assert_eq!(dictionary.lookup("bkk1").as_deref(), Some("Boeng Keng Kang Muoy"));
        assert_eq!(dictionary.lookup("  Bkk1").as_deref(), Some("Boeng Keng Kang Muoy"));
        assert_eq!(dictionary.lookup("bkk3"), None);
    }

    #[test]
    fn test_load_from_file() {
        let file = create_test_aliases().unwrap();
        let dictionary = AliasDictionary::from_path(file.path()).unwrap();
        assert_eq!(dictionary.len(), SAMPLE_ALIASES.len());
        assert_eq!(dictionary.lookup("kampot city").as_deref(), Some("070800"));
    }

    #[test]
    fn test_reload_picks_up_changes_and_survives_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bkk1": "Boeng Keng Kang Muoy"}}"#).unwrap();
        file.flush().unwrap();

        let dictionary = AliasDictionary::from_path(file.path()).unwrap();
        let before = dictionary.snapshot();
        assert_eq!(before.len(), 1);

        std::fs::write(file.path(), r#"{"bkk1": "Boeng Keng Kang Muoy", "bkk2": "Boeng Keng Kang Pir"}"#)
            .unwrap();
        assert_eq!(dictionary.reload().unwrap(), 2);
        assert_eq!(dictionary.lookup("bkk2").as_deref(), Some("Boeng Keng Kang Pir"));
        // Old readers keep their snapshot.
        assert_eq!(before.len(), 1);

        std::fs::write(file.path(), "not json").unwrap();
        assert!(dictionary.reload().is_err());
        assert_eq!(dictionary.len(), 2);
    }

    #[test]
    fn test_reverse_aliases_and_aliases_for() {
        let dictionary = AliasDictionary::from_entries(SAMPLE_ALIASES);
        let snapshot = dictionary.snapshot();
        let reverse = snapshot.reverse_aliases();
        assert_eq!(
            reverse["preah sihanouk"],
            vec!["kompong som", "sihanoukville", "snv"]
        );

        let krong_kampot = LocationRecord::new(
            LocationCode::parse("070800").unwrap(),
            "Krong Kampot",
            None,
            LocationKind::District,
        )
        .unwrap();
        assert_eq!(snapshot.aliases_for(&krong_kampot), vec!["kampot city"]);
    }
}
