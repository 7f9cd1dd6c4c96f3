use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use tracing::warn;

pub mod processed;
pub mod raw;
pub mod test_data;

static TEST_DATA_DIR: Lazy<tempfile::TempDir> = Lazy::new(|| {
    tempfile::TempDir::new().expect("Failed to create global temporary test data directory")
});

pub const DATA_DIR_DEFAULT: &str = "./sangkat_data";
pub const DATA_DIR_ENV: &str = "SANGKAT_DATA_DIR";

/// File names expected inside the data directory.
pub const POSTAL_CODES_CSV: &str = "postal_codes.csv";
pub const ALIASES_JSON: &str = "aliases.json";
pub const LEARNED_ALIASES_JSON: &str = "learned_aliases.json";

/// Centralized function to determine if we should use test data.
pub fn should_use_test_data() -> bool {
    let is_test_environment = cfg!(test) || cfg!(doctest);

    #[cfg(feature = "test_data")]
    let explicit_test_data = std::env::var("USE_TEST_DATA")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);
    #[cfg(not(feature = "test_data"))]
    let explicit_test_data = false;

    is_test_environment || explicit_test_data
}

/// Global data directory path that automatically determines the appropriate location.
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if should_use_test_data() {
        let temp_dir = TEST_DATA_DIR.path().to_path_buf();
        warn!(temp_dir = ?temp_dir, "Using temporary data directory for tests");
        temp_dir
    } else {
        let dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DATA_DIR_DEFAULT.to_string());
        PathBuf::from(dir)
    }
});

pub fn get_data_dir() -> &'static Path {
    DATA_DIR.as_path()
}

mod error {
    use polars::prelude::PolarsError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Required data file not found: {0}")]
        RequiredFileNotFound(std::path::PathBuf),
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use error::{DataError, Result};

pub use processed::{LocationRow, load_location_rows, location_rows_from_df};
pub use raw::read_postal_codes_csv;
pub use test_data::{TestDataConfig, create_test_aliases, create_test_data};

/// Load the postal-code rows from `<data_dir>/postal_codes.csv`.
pub fn load_default_location_rows() -> Result<Vec<LocationRow>> {
    let path = get_data_dir().join(POSTAL_CODES_CSV);
    if !path.exists() {
        return Err(DataError::RequiredFileNotFound(path));
    }
    load_location_rows(&path)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_is_temporary_under_test() {
        assert!(should_use_test_data());
        assert_eq!(get_data_dir(), TEST_DATA_DIR.path());
    }

    #[test]
    fn test_missing_default_csv_is_reported() {
        let result = load_default_location_rows();
        assert!(matches!(result, Err(DataError::RequiredFileNotFound(_))));
    }
}
