use std::path::Path;

use itertools::izip;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::error::Result;
use crate::raw::read_postal_codes_csv;

/// One row of the bulk import, trimmed but otherwise unvalidated.
///
/// Code normalization and kind inference belong to the engine, which owns the
/// hierarchy rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    pub postal_code: String,
    pub name_en: String,
    pub name_km: Option<String>,
    pub kind: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Drop rows without a code or an English name and order by code.
pub fn clean_postal_codes(lf: LazyFrame) -> LazyFrame {
    lf.filter(
        col("postal_code")
            .is_not_null()
            .and(col("name_en").is_not_null()),
    )
    .sort(
        ["postal_code"],
        SortMultipleOptions::default().with_maintain_order(true),
    )
}

pub fn location_rows_from_df(df: &DataFrame) -> Result<Vec<LocationRow>> {
    let code_series = df.column("postal_code")?.str()?;
    let name_en_series = df.column("name_en")?.str()?;
    let name_km_series = df.column("name_km")?.str()?;
    let type_series = df.column("type")?.str()?;

    let mut rows = Vec::with_capacity(df.height());
    for (code, name_en, name_km, kind) in
        izip!(code_series, name_en_series, name_km_series, type_series)
    {
        match (non_empty(code), non_empty(name_en)) {
            (Some(postal_code), Some(name_en)) => rows.push(LocationRow {
                postal_code,
                name_en,
                name_km: non_empty(name_km),
                kind: non_empty(kind).map(|k| k.to_lowercase()),
            }),
            _ => debug!(?code, ?name_en, "Skipping row with blank code or name"),
        }
    }
    Ok(rows)
}

/// Read, clean and materialize the postal-code export at `path`.
#[instrument(name = "Load location rows", skip_all, level = "info")]
pub fn load_location_rows(path: &Path) -> Result<Vec<LocationRow>> {
    let t_load = std::time::Instant::now();
    let df = clean_postal_codes(read_postal_codes_csv(path)?).collect()?;
    let rows = location_rows_from_df(&df)?;
    info!(
        rows = rows.len(),
        elapsed = ?t_load.elapsed(),
        "Loaded postal code rows"
    );
    Ok(rows)
}
