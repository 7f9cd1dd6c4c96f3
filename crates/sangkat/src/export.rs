//! Whole-directory dumps for offline clients.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    alias::AliasSnapshot,
    index::{LocationIndex, LocationKind, LocationRecord},
};

const COUNTRY_NAME: &str = "Cambodia";

/// One record in the compact export. Single-letter keys keep the payload small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    /// Code
    pub c: String,
    /// Latin name
    pub e: String,
    /// Khmer name
    pub k: Option<String>,
    /// Kind
    pub t: LocationKind,
    /// Parent label
    pub p: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkExport {
    pub data: Vec<ExportRow>,
    pub aliases: BTreeMap<String, String>,
}

impl BulkExport {
    /// Every record in code order plus the current dictionary.
    pub fn build(index: &LocationIndex, aliases: &AliasSnapshot) -> Self {
        let data = sorted_by_code(index)
            .map(|record| ExportRow {
                c: record.code().to_string(),
                e: record.name_primary.clone(),
                k: record.name_secondary.clone(),
                t: record.kind,
                p: index.parent_label(record),
            })
            .collect();
        let aliases = aliases
            .entries()
            .into_iter()
            .map(|(term, target)| (term.to_string(), target.to_string()))
            .collect();
        Self { data, aliases }
    }
}

fn sorted_by_code(index: &LocationIndex) -> impl Iterator<Item = &LocationRecord> {
    index.records().iter().sorted_by(|a, b| a.code.cmp(&b.code))
}

/// Plain-text directory, one `CODE | TYPE | NAME_EN | NAME_KM | PARENT` line per record.
pub fn text_listing(index: &LocationIndex, generated: NaiveDate) -> String {
    let mut lines = vec![
        format!("# {COUNTRY_NAME} Postal Codes - Complete Database"),
        "# Format: POSTAL_CODE | TYPE | NAME_EN | NAME_KM | PARENT_LOCATION".to_string(),
        format!("# Generated: {}", generated.format("%Y-%m-%d")),
        format!("# Total records: {}", index.len()),
        "#".to_string(),
        "# Province codes: first 2 digits".to_string(),
        "# District codes: 4 digits (province + district)".to_string(),
        "# Commune codes: 6 digits (province + district + commune)".to_string(),
        String::new(),
        "POSTAL_CODE | TYPE | NAME_EN | NAME_KM | PARENT".to_string(),
        "-".repeat(80),
    ];

    lines.extend(sorted_by_code(index).map(|record| {
        let parent = match record.kind {
            LocationKind::Province => COUNTRY_NAME.to_string(),
            LocationKind::District | LocationKind::Commune => index.parent_label(record),
        };
        format!(
            "{} | {:<8} | {} | {} | {}",
            record.code,
            record.kind.as_str(),
            record.name_primary,
            record.name_secondary.as_deref().unwrap_or("-"),
            parent
        )
    }));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use sangkat_data_processing::test_data::{SAMPLE_ALIASES, SAMPLE_ROWS};

    use super::*;
    use crate::index::tests::sample_index;

    #[test]
    fn test_bulk_export_shape() {
        let index = sample_index();
        let export = BulkExport::build(&index, &AliasSnapshot::from_entries(SAMPLE_ALIASES));
        assert_eq!(export.data.len(), SAMPLE_ROWS.len());
        assert_eq!(export.aliases.len(), SAMPLE_ALIASES.len());

        let json = serde_json::to_value(&export).unwrap();
        let commune = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["c"] == "120101")
            .unwrap();
        assert_eq!(commune["e"], "Boeng Keng Kang Muoy");
        assert_eq!(commune["t"], "commune");
        assert_eq!(commune["p"], "Chamkar Mon, Phnom Penh");
        assert_eq!(json["aliases"]["bkk1"], "Boeng Keng Kang Muoy");

        let province = export.data.iter().find(|row| row.c == "120000").unwrap();
        assert_eq!(province.p, "");
        let codes: Vec<&str> = export.data.iter().map(|row| row.c.as_str()).collect();
        assert!(codes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_text_listing() {
        let index = sample_index();
        let date = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let listing = text_listing(&index, date);
        assert!(listing.contains("# Generated: 2026-01-20"));
        assert!(listing.contains(&format!("# Total records: {}", SAMPLE_ROWS.len())));
        assert!(listing.contains("\n120000 | province | Phnom Penh | ភ្នំពេញ | Cambodia"));
        assert!(listing.contains("\n120100 | district | Chamkar Mon | ចំការមន | Phnom Penh"));
        assert!(listing.contains(
            "\n120101 | commune  | Boeng Keng Kang Muoy | បឹងកេងកងទី១ | Chamkar Mon, Phnom Penh"
        ));

        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 11 + SAMPLE_ROWS.len());
        assert_eq!(lines[8], "");
        assert_eq!(lines[10], "-".repeat(80));
        assert!(!listing.ends_with('\n'));
    }
}
