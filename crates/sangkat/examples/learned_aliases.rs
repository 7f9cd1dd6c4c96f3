//! Alias learning and intents
//!
//! This example shows how clicks turn a user's search term into a learned alias,
//! and how classifier output is executed as an intent.

use chrono::{Duration, Utc};
use sangkat::{AliasFilter, AliasSort, LocationSearcher, looks_like_natural_language};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sangkat::init_logging(tracing::Level::INFO)?;
    let searcher = LocationSearcher::from_test_data()?;

    // Users searching "riverside" keep choosing Phsar Thmei Muoy.
    let mut now = Utc::now() - Duration::days(1);
    for _ in 0..16 {
        searcher.search("riverside");
        if searcher.learned().get("riverside", "120201").is_none() {
            searcher.learned().record_click_at("riverside", "120201", now)?;
        }
    }
    for _ in 0..9 {
        now += Duration::minutes(90);
        searcher.learned().record_click_at("riverside", "120201", now)?;
    }

    for alias in searcher.learned().list(AliasFilter::All, AliasSort::Clicks) {
        println!(
            "{} -> {}: {} clicks / {} searches, {} contributors, promoted: {}",
            alias.search_term,
            alias.location_code,
            alias.click_count,
            alias.search_count,
            alias.unique_contributors,
            alias.promoted
        );
    }
    println!("Now 'riverside' finds {:?}", searcher.search("riverside").codes());

    let query = "list communes in Phnom Penh";
    if looks_like_natural_language(query) {
        // Stand-in for a classifier response.
        let classified = r#"{"intent":"list_by_parent","parent_name":"Phnom Penh","location_type":"commune","confidence":0.9}"#;
        let outcome = searcher.execute_intent_json(classified);
        println!("\n'{query}' -> {:?}", outcome.context);
        for hit in &outcome.hits {
            println!("  {} {}", hit.code(), hit.record.name_primary);
        }
    }

    Ok(())
}
