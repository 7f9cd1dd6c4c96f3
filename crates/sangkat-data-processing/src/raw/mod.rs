use std::path::Path;

use polars::prelude::*;
use tracing::{info, instrument};

pub use super::error::Result;

/// Column layout of the ministry postal-code export.
///
/// Everything is read as a string: codes carry leading zeros (`020101`) that a numeric
/// dtype would drop, and the Khmer column is free text.
const POSTAL_CODES_SCHEMA: [(PlSmallStr, DataType); 4] = [
    (PlSmallStr::from_static("postal_code"), DataType::String),
    (PlSmallStr::from_static("name_en"), DataType::String),
    (PlSmallStr::from_static("name_km"), DataType::String),
    (PlSmallStr::from_static("type"), DataType::String),
];

pub const POSTAL_CODE_COLUMNS: [&str; 4] = ["postal_code", "name_en", "name_km", "type"];

/// Lazily scan a `postal_code,name_en,name_km,type` CSV file.
#[instrument(name = "Read postal code CSV", skip_all, fields(path = ?path.as_ref()), level = "info")]
pub fn read_postal_codes_csv(path: impl AsRef<Path>) -> Result<LazyFrame> {
    info!("Scanning postal code export");
    Ok(LazyCsvReader::new(path.as_ref())
        .with_separator(b',')
        .with_has_header(true)
        .with_schema(Some(Schema::from_iter(POSTAL_CODES_SCHEMA).into()))
        .finish()?)
}
