//! Location records and the postal-code hierarchy.
//!
//! Codes follow the `PPDDCC` layout: two digits of province, two of district, two of
//! commune. A province is `PP0000` and a district `PPDD00`, so every parent is found by
//! slicing the child's code rather than by a stored link.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sangkat_data_processing::LocationRow;

use super::error::{IndexError, Result};

const CODE_WIDTH: usize = 6;

/// The three administrative levels, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Province,
    District,
    Commune,
}

impl LocationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Province => "province",
            Self::District => "district",
            Self::Commune => "commune",
        }
    }

    /// Number of leading code digits that identify a unit of this kind.
    pub const fn prefix_len(self) -> usize {
        match self {
            Self::Province => 2,
            Self::District => 4,
            Self::Commune => 6,
        }
    }

    /// The next level down, `None` for communes.
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Province => Some(Self::District),
            Self::District => Some(Self::Commune),
            Self::Commune => None,
        }
    }

    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Province => None,
            Self::District => Some(Self::Province),
            Self::Commune => Some(Self::District),
        }
    }

    /// True when `other` sits strictly below `self` in the hierarchy.
    pub fn contains(self, other: Self) -> bool {
        other > self
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "province" => Ok(Self::Province),
            "district" => Ok(Self::District),
            "commune" => Ok(Self::Commune),
            other => Err(IndexError::UnknownKind(other.to_string())),
        }
    }
}

/// A validated, six digit postal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationCode(String);

impl LocationCode {
    /// Parse and canonicalize a code.
    ///
    /// `12` and `1201` are short forms of `120000` and `120100`. An odd digit count means a
    /// spreadsheet dropped the leading zero (`20101` is `020101`).
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > CODE_WIDTH
            || !trimmed.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(IndexError::InvalidCode(raw.to_string()));
        }
        let mut code = String::with_capacity(CODE_WIDTH);
        if trimmed.len() % 2 == 1 {
            code.push('0');
        }
        code.push_str(trimmed);
        while code.len() < CODE_WIDTH {
            code.push('0');
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading digits shared by every unit inside a unit of `kind`.
    pub fn prefix_for(&self, kind: LocationKind) -> &str {
        &self.0[..kind.prefix_len()]
    }

    /// The kind implied by the trailing zeros.
    pub fn inferred_kind(&self) -> LocationKind {
        if &self.0[2..] == "0000" {
            LocationKind::Province
        } else if &self.0[4..] == "00" {
            LocationKind::District
        } else {
            LocationKind::Commune
        }
    }

    /// Code of the enclosing unit of `kind`.
    pub fn ancestor(&self, kind: LocationKind) -> Self {
        let prefix = self.prefix_for(kind);
        let mut code = String::with_capacity(CODE_WIDTH);
        code.push_str(prefix);
        while code.len() < CODE_WIDTH {
            code.push('0');
        }
        Self(code)
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LocationCode {
    type Error = IndexError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LocationCode> for String {
    fn from(code: LocationCode) -> Self {
        code.0
    }
}

impl AsRef<str> for LocationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One province, district or commune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub code: LocationCode,
    pub name_primary: String,
    pub name_secondary: Option<String>,
    pub kind: LocationKind,
}

impl LocationRecord {
    /// Build a record, checking that `kind` agrees with the code layout.
    pub fn new(
        code: LocationCode,
        name_primary: impl Into<String>,
        name_secondary: Option<String>,
        kind: LocationKind,
    ) -> Result<Self> {
        if code.inferred_kind() != kind {
            return Err(IndexError::KindMismatch {
                code: code.to_string(),
                kind,
            });
        }
        let name_primary = name_primary.into();
        if name_primary.trim().is_empty() {
            return Err(IndexError::MissingName(code.to_string()));
        }
        Ok(Self {
            code,
            name_primary,
            name_secondary: name_secondary.filter(|n| !n.trim().is_empty()),
            kind,
        })
    }

    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Code of the parent unit, derived from the code prefix.
    pub fn parent_code(&self) -> Option<LocationCode> {
        self.kind.parent().map(|kind| self.code.ancestor(kind))
    }

    /// Prefix shared with siblings: the parent's identifying digits, empty for provinces.
    pub fn sibling_prefix(&self) -> &str {
        self.kind
            .parent()
            .map_or("", |parent| self.code.prefix_for(parent))
    }
}

impl TryFrom<LocationRow> for LocationRecord {
    type Error = IndexError;

    fn try_from(row: LocationRow) -> Result<Self> {
        let code = LocationCode::parse(&row.postal_code)?;
        let kind = match row.kind.as_deref() {
            Some(kind) => kind.parse()?,
            None => code.inferred_kind(),
        };
        Self::new(code, row.name_en, row.name_km, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, name: &str, kind: Option<&str>) -> LocationRow {
        LocationRow {
            postal_code: code.to_string(),
            name_en: name.to_string(),
            name_km: None,
            kind: kind.map(ToString::to_string),
        }
    }

    #[test]
    fn test_code_canonicalization() {
        assert_eq!(LocationCode::parse("12").unwrap().as_str(), "120000");
        assert_eq!(LocationCode::parse("1201").unwrap().as_str(), "120100");
        assert_eq!(LocationCode::parse("120101").unwrap().as_str(), "120101");
        assert_eq!(LocationCode::parse("20101").unwrap().as_str(), "020101");
        assert_eq!(LocationCode::parse(" 2 ").unwrap().as_str(), "020000");
    }

    #[test]
    fn test_invalid_codes_rejected() {
        for raw in ["", "  ", "12A100", "1201011", "-12000"] {
            assert!(LocationCode::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_inferred_kind_and_ancestors() {
        let commune = LocationCode::parse("120307").unwrap();
        assert_eq!(commune.inferred_kind(), LocationKind::Commune);
        assert_eq!(commune.ancestor(LocationKind::District).as_str(), "120300");
        assert_eq!(commune.ancestor(LocationKind::Province).as_str(), "120000");
        assert_eq!(
            LocationCode::parse("120300").unwrap().inferred_kind(),
            LocationKind::District
        );
        assert_eq!(
            LocationCode::parse("120000").unwrap().inferred_kind(),
            LocationKind::Province
        );
    }

    #[test]
    fn test_kind_order_and_children() {
        assert!(LocationKind::Province.contains(LocationKind::Commune));
        assert!(!LocationKind::District.contains(LocationKind::District));
        assert!(!LocationKind::Commune.contains(LocationKind::Province));
        assert_eq!(LocationKind::Province.child(), Some(LocationKind::District));
        assert_eq!(LocationKind::Commune.child(), None);
        assert_eq!("District".parse::<LocationKind>().unwrap(), LocationKind::District);
        assert!("village".parse::<LocationKind>().is_err());
    }

    #[test]
    fn test_record_from_row() {
        let record = LocationRecord::try_from(row("1204", "Boeng Keng Kang", None)).unwrap();
        assert_eq!(record.code(), "120400");
        assert_eq!(record.kind, LocationKind::District);
        assert_eq!(record.parent_code().unwrap().as_str(), "120000");
        assert_eq!(record.sibling_prefix(), "12");

        let province = LocationRecord::try_from(row("120000", "Phnom Penh", Some("province")))
            .unwrap();
        assert_eq!(province.parent_code(), None);
        assert_eq!(province.sibling_prefix(), "");
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let result = LocationRecord::try_from(row("120101", "Boeng Keng Kang Muoy", Some("province")));
        assert!(matches!(result, Err(IndexError::KindMismatch { .. })));
    }

    #[test]
    fn test_code_serde_validates() {
        let code: LocationCode = serde_json::from_str("\"1201\"").unwrap();
        assert_eq!(code.as_str(), "120100");
        assert!(serde_json::from_str::<LocationCode>("\"abc\"").is_err());
    }
}
