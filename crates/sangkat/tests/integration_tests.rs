//! Integration tests for Sangkat location search
//!
//! These tests run against the full public API with the generated sample dataset.

use std::{fs, io::Write};

use sangkat::{
    Intent, IntentKind, LocationKind, LocationSearcher, MatchKind, ResolutionSource,
    SearchConfigBuilder,
    data_processing::{POSTAL_CODES_CSV, TestDataConfig, create_test_data},
};
use tempfile::TempDir;

fn setup_test_env() {
    let _ = sangkat::init_logging(tracing::Level::WARN);
}

fn searcher() -> LocationSearcher {
    setup_test_env();
    LocationSearcher::from_test_data().expect("Should create searcher")
}

#[test]
fn test_full_workflow() {
    let searcher = searcher();

    // 1. Misspelled province
    let response = searcher.search("phnom pen");
    assert!(
        response.codes().iter().take(3).any(|c| *c == "120000"),
        "Phnom Penh should rank in the top 3: {:?}",
        response.codes()
    );

    // 2. Dictionary alias, reported under the caller's query
    let response = searcher.search("BKK1");
    assert_eq!(response.query, "BKK1");
    assert_eq!(response.resolution.source, ResolutionSource::Dictionary);
    let first = response.first().expect("bkk1 should resolve");
    assert_eq!(first.code(), "120101");
    assert_eq!(first.parent_label, "Chamkar Mon, Phnom Penh");
    assert_eq!(first.match_kind, MatchKind::Exact);

    // 3. Configured search
    let config = SearchConfigBuilder::fast().limit(3).build().unwrap();
    let limited = searcher.search_with_config("tuol", &config);
    assert!(limited.len() <= 3, "Should respect limit");
    assert!(!limited.is_empty());

    // 4. Khmer script
    let response = searcher.search("ទួល");
    assert!(response.codes().contains(&"120300"));
    assert!(response.codes().iter().all(|c| c.starts_with("12")));
}

#[test]
fn test_limit_is_clamped() {
    let searcher = searcher();
    assert!(searcher.search_with_limit("k", 0).len() <= 1);
    assert!(searcher.search_with_limit("k", 1000).len() <= 50);
    let codes = searcher.search_with_limit("Kampong", 2).codes().len();
    assert!(codes <= 2);
}

#[test]
fn test_list_districts_by_parent() {
    let searcher = searcher();
    let intent = Intent::new(IntentKind::ListByParent, 0.9)
        .with_parent_name("Phnom Penh")
        .with_location_type(LocationKind::District);
    let outcome = searcher.execute_intent(&intent);

    assert!(!outcome.is_empty());
    for hit in &outcome.hits {
        assert_eq!(hit.record.kind, LocationKind::District);
        assert!(hit.code().starts_with("12"), "{} is outside Phnom Penh", hit.code());
    }
}

#[test]
fn test_learned_alias_promotion_flow() {
    let searcher = searcher();

    // Ten clicks in five sessions more than an hour apart, sixteen searches in total.
    let mut now = chrono::Utc::now() - chrono::Duration::days(1);
    let learned = searcher.learned();
    for session in 0..5 {
        for click in 0..2 {
            let alias = learned
                .record_click_at("riverside", "120201", now)
                .unwrap()
                .unwrap();
            let last_click = session == 4 && click == 1;
            assert_eq!(alias.promoted, last_click, "session {session} click {click}");
            now += chrono::Duration::minutes(1);
        }
        now += chrono::Duration::hours(2);
        if session == 0 {
            for _ in 0..16 {
                searcher.search(" Riverside ");
            }
        }
    }

    let promoted = searcher.promoted_aliases();
    assert_eq!(promoted.get("riverside").map(|c| c.as_str()), Some("120201"));

    let response = searcher.search("riverside");
    assert_eq!(response.resolution.source, ResolutionSource::Learned);
    assert_eq!(response.codes().first(), Some(&"120201"));
}

#[test]
fn test_search_normalization_shares_counters() {
    let searcher = searcher();
    searcher.record_click("Phnom", "120000").unwrap();
    for query in ["Phnom", "phnom", " PHNOM "] {
        searcher.search(query);
    }
    let alias = searcher.learned().get("phnom", "120000").unwrap();
    assert_eq!(alias.search_count, 3);
    assert_eq!(alias.click_count, 1);
}

#[test]
fn test_bulk_search_preserves_order() {
    let searcher = searcher();
    let queries = ["Kampot", "bkk2", "", "Battambang"];
    let responses = searcher.search_bulk(&queries);

    assert_eq!(responses.len(), 4);
    for (query, response) in queries.iter().zip(&responses) {
        assert_eq!(&response.query, query);
    }
    assert_eq!(responses[1].codes().first(), Some(&"120102"));
    assert!(responses[2].is_empty());
    assert_eq!(responses[3].codes().first(), Some(&"020000"));
}

#[test]
fn test_dirty_csv_import() {
    setup_test_env();
    let file = create_test_data(&TestDataConfig::dirty()).unwrap();
    let dir = TempDir::new().unwrap();
    fs::copy(file.path(), dir.path().join(POSTAL_CODES_CSV)).unwrap();

    let searcher = LocationSearcher::from_data_dir(dir.path()).unwrap();
    let clean = create_test_data(&TestDataConfig::sample()).unwrap();
    let clean_rows = fs::read_to_string(clean.path()).unwrap().lines().count() - 1;

    // One invalid code and one duplicate dropped, two rows repaired.
    assert_eq!(searcher.index().len(), clean_rows + 2);
    assert!(searcher.get("12A100").is_none());
    assert_eq!(
        searcher.get("120000").map(|r| r.name_primary.as_str()),
        Some("Phnom Penh")
    );

    let district = searcher.get("120400").expect("short code is padded");
    assert_eq!(district.kind, LocationKind::District);
    let province = searcher.get("080000").expect("leading zero is restored");
    assert_eq!(province.kind, LocationKind::Province);
    assert_eq!(province.name_secondary.as_deref(), Some("កែប"));
}

#[test]
fn test_export_and_listing() {
    let searcher = searcher();
    let export = searcher.export();
    assert_eq!(export.data.len(), searcher.index().len());
    assert_eq!(export.aliases.get("snv").map(String::as_str), Some("Preah Sihanouk"));

    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let listing = searcher.text_listing(date);
    let body: Vec<&str> = listing.lines().filter(|l| l.contains(" | ") && !l.starts_with('#')).collect();
    // Header row plus one line per record.
    assert_eq!(body.len(), searcher.index().len() + 1);
}

#[test]
fn test_aliases_file_reload() {
    setup_test_env();
    let csv = create_test_data(&TestDataConfig::sample()).unwrap();
    let mut aliases = tempfile::NamedTempFile::new().unwrap();
    write!(aliases, r#"{{"old market": "Phsar Thmei Muoy"}}"#).unwrap();
    aliases.flush().unwrap();

    let searcher = LocationSearcher::builder()
        .postal_codes(csv.path())
        .aliases(aliases.path())
        .build()
        .unwrap();
    assert_eq!(searcher.search("old market").codes().first(), Some(&"120201"));

    fs::write(aliases.path(), r#"{"psar": "Phsar Thmei Muoy", "riverside": "Doun Penh"}"#).unwrap();
    assert_eq!(searcher.reload_aliases().unwrap(), 2);
    assert_eq!(searcher.search("riverside").codes().first(), Some(&"120200"));
    assert_eq!(searcher.search("old market").resolution.source, ResolutionSource::Unchanged);
}
