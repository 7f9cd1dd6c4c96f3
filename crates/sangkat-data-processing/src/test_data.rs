use std::io::Write;

use tempfile::NamedTempFile;
use tracing::info;

use super::error::Result;

/// Configuration for test data generation
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    /// Only the Phnom Penh province/district/commune chain
    pub minimal: bool,
    /// Append rows that the importer must reject or repair
    pub include_dirty_rows: bool,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self::sample()
    }
}

impl TestDataConfig {
    /// Minimal data for unit tests
    pub fn minimal() -> Self {
        Self {
            minimal: true,
            include_dirty_rows: false,
        }
    }

    /// Sample data for integration tests
    pub fn sample() -> Self {
        Self {
            minimal: false,
            include_dirty_rows: false,
        }
    }

    /// Sample data plus malformed rows
    pub fn dirty() -> Self {
        Self {
            minimal: false,
            include_dirty_rows: true,
        }
    }
}

/// `(postal_code, name_en, name_km, type)`
pub const MINIMAL_ROWS: [(&str, &str, &str, &str); 3] = [
    ("120000", "Phnom Penh", "ភ្នំពេញ", "province"),
    ("120100", "Chamkar Mon", "ចំការមន", "district"),
    ("120101", "Boeng Keng Kang Muoy", "បឹងកេងកងទី១", "commune"),
];

pub const SAMPLE_ROWS: [(&str, &str, &str, &str); 27] = [
    ("020000", "Battambang", "បាត់ដំបង", "province"),
    ("020100", "Banan", "បាណន់", "district"),
    ("020101", "Kantueu Muoy", "កន្ទឺ១", "commune"),
    ("020300", "Krong Battambang", "ក្រុងបាត់ដំបង", "district"),
    ("020301", "Svay Pao", "ស្វាយប៉ោ", "commune"),
    ("030000", "Kampong Cham", "កំពង់ចាម", "province"),
    ("070000", "Kampot", "កំពត", "province"),
    ("070800", "Krong Kampot", "ក្រុងកំពត", "district"),
    ("120000", "Phnom Penh", "ភ្នំពេញ", "province"),
    ("120100", "Chamkar Mon", "ចំការមន", "district"),
    ("120101", "Boeng Keng Kang Muoy", "បឹងកេងកងទី១", "commune"),
    ("120102", "Boeng Keng Kang Pir", "បឹងកេងកងទី២", "commune"),
    ("120103", "Tonle Basak", "ទន្លេបាសាក់", "commune"),
    ("120200", "Doun Penh", "ដូនពេញ", "district"),
    ("120201", "Phsar Thmei Muoy", "ផ្សារថ្មីទី១", "commune"),
    ("120202", "Wat Phnom", "វត្តភ្នំ", "commune"),
    ("120300", "Tuol Kouk", "ទួលគោក", "district"),
    ("120301", "Tuol Sangkae", "ទួលសង្កែ", "commune"),
    ("120307", "Tuol Tumpung Muoy", "ទួលទំពូងទី១", "commune"),
    ("170000", "Siem Reap", "សៀមរាប", "province"),
    ("170700", "Krong Siem Reap", "ក្រុងសៀមរាប", "district"),
    ("170701", "Sala Kamreuk", "សាលាកំរើក", "commune"),
    ("170702", "Svay Dankum", "ស្វាយដង្គំ", "commune"),
    ("180000", "Preah Sihanouk", "ព្រះសីហនុ", "province"),
    ("180100", "Krong Preah Sihanouk", "ក្រុងព្រះសីហនុ", "district"),
    ("180101", "Sangkat Muoy", "សង្កាត់មួយ", "commune"),
    ("250000", "Tboung Khmum", "ត្បូងឃ្មុំ", "province"),
];

/// Rows the engine must skip (bad code, duplicate) or repair (missing kind, short code).
const DIRTY_ROWS: [(&str, &str, &str, &str); 4] = [
    ("12A100", "Not A Code", "", "district"),
    ("120000", "Phnom Penh Duplicate", "", "province"),
    ("1204", "Boeng Keng Kang", "", ""),
    ("80000", "Kep", "កែប", ""),
];

/// Informal names used by the sample alias dictionary.
pub const SAMPLE_ALIASES: [(&str, &str); 12] = [
    ("bkk1", "Boeng Keng Kang Muoy"),
    ("bkk2", "Boeng Keng Kang Pir"),
    ("russian market", "Tuol Tumpung Muoy"),
    ("central market", "Phsar Thmei Muoy"),
    ("pub street", "Sala Kamreuk"),
    ("angkor wat", "Siem Reap"),
    ("pp", "Phnom Penh"),
    ("sihanoukville", "Preah Sihanouk"),
    ("snv", "Preah Sihanouk"),
    ("kompong som", "Preah Sihanouk"),
    ("kampot town", "Kampot"),
    ("kampot city", "070800"),
];

/// Write test postal-code data to a temporary CSV file.
pub fn create_test_data(config: &TestDataConfig) -> Result<NamedTempFile> {
    info!("Creating test data with config: {:?}", config);

    let mut file = NamedTempFile::new()?;
    writeln!(file, "postal_code,name_en,name_km,type")?;

    let rows: &[(&str, &str, &str, &str)] = if config.minimal {
        &MINIMAL_ROWS
    } else {
        &SAMPLE_ROWS
    };
    for (code, name_en, name_km, kind) in rows {
        writeln!(file, "{code},{name_en},{name_km},{kind}")?;
    }
    if config.include_dirty_rows {
        for (code, name_en, name_km, kind) in DIRTY_ROWS {
            writeln!(file, "{code},{name_en},{name_km},{kind}")?;
        }
    }

    file.flush()?;
    Ok(file)
}

/// Write the sample alias dictionary to a temporary JSON file.
pub fn create_test_aliases() -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    let map: serde_json::Map<String, serde_json::Value> = SAMPLE_ALIASES
        .iter()
        .map(|(term, target)| ((*term).to_string(), serde_json::Value::from(*target)))
        .collect();
    serde_json::to_writer_pretty(&mut file, &map)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_data_has_header_and_three_rows() {
        let file = create_test_data(&TestDataConfig::minimal()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "postal_code,name_en,name_km,type");
        assert_eq!(lines.len(), 1 + MINIMAL_ROWS.len());
    }

    #[test]
    fn test_sample_hierarchy_is_consistent() {
        for (code, _, _, kind) in SAMPLE_ROWS {
            assert_eq!(code.len(), 6);
            let parent_prefix = match kind {
                "commune" => Some(format!("{}00", &code[..4])),
                "district" => Some(format!("{}0000", &code[..2])),
                _ => None,
            };
            if let Some(parent) = parent_prefix {
                assert!(
                    SAMPLE_ROWS.iter().any(|(c, ..)| *c == parent),
                    "{code} has no parent {parent}"
                );
            }
        }
    }

    #[test]
    fn test_aliases_file_is_flat_json() {
        let file = create_test_aliases().unwrap();
        let parsed: std::collections::HashMap<String, String> =
            serde_json::from_reader(std::fs::File::open(file.path()).unwrap()).unwrap();
        assert_eq!(parsed.len(), SAMPLE_ALIASES.len());
        assert_eq!(parsed["bkk1"], "Boeng Keng Kang Muoy");
    }
}
