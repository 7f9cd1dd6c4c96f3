//! Basic location search functionality
//!
//! This example demonstrates the fundamental search operations:
//! - Creating a searcher over the sample dataset
//! - Searching by name, typo, code and Khmer script
//! - Reading hits and their match kinds

use sangkat::{LocationSearcher, MatchKind, SearchConfigBuilder, SearchResponse};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sangkat::init_logging(tracing::Level::WARN)?;
    let searcher = LocationSearcher::from_test_data()?;

    for query in ["Phnom Penh", "phnom pen", "120101", "ទួល", "bkk1"] {
        println!("\nSearching for '{query}':");
        print_response(&searcher.search(query), 3);
    }

    println!("\nFast search for 'Kampong' (limited results):");
    let config = SearchConfigBuilder::fast().limit(2).build()?;
    print_response(&searcher.search_with_config("Kampong", &config), 2);

    Ok(())
}

fn print_response(response: &SearchResponse, limit: usize) {
    if response.resolution.changed() {
        println!("  (alias: '{}' -> '{}')", response.query, response.resolution.term);
    }
    for (i, hit) in response.hits.iter().take(limit).enumerate() {
        let how = match hit.match_kind {
            MatchKind::Exact => "exact".to_string(),
            MatchKind::Script => "khmer".to_string(),
            MatchKind::Fuzzy { score } => format!("fuzzy {score:.2}"),
        };
        println!(
            "  {}. {} {} [{}] {} ({how})",
            i + 1,
            hit.code(),
            hit.record.name_primary,
            hit.record.kind,
            hit.parent_label,
        );
    }
    if response.len() > limit {
        println!("  ... and {} more results", response.len() - limit);
    }
}
