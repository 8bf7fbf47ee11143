//! Typed row shapes: what the extract hands us and what the store keeps.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The recognized extract fields, in stored column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    IsoCode,
    Continent,
    Location,
    Date,
    TotalCases,
    NewCases,
    TotalDeaths,
    NewDeaths,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::IsoCode,
        Field::Continent,
        Field::Location,
        Field::Date,
        Field::TotalCases,
        Field::NewCases,
        Field::TotalDeaths,
        Field::NewDeaths,
    ];

    /// Canonical (stored) column name.
    pub fn name(self) -> &'static str {
        match self {
            Field::IsoCode => "iso_code",
            Field::Continent => "continent",
            Field::Location => "location",
            Field::Date => "date",
            Field::TotalCases => "total_cases",
            Field::NewCases => "new_cases",
            Field::TotalDeaths => "total_deaths",
            Field::NewDeaths => "new_deaths",
        }
    }

    /// Extract headers accepted for this field, most preferred first.
    fn source_names(self) -> &'static [&'static str] {
        match self {
            Field::Date => &["last_updated_date", "date"],
            Field::IsoCode => &["iso_code"],
            Field::Continent => &["continent"],
            Field::Location => &["location"],
            Field::TotalCases => &["total_cases"],
            Field::NewCases => &["new_cases"],
            Field::TotalDeaths => &["total_deaths"],
            Field::NewDeaths => &["new_deaths"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn column_names() -> Vec<&'static str> {
    Field::ALL.iter().map(|field| field.name()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required column(s): {}", .missing.join(", "))]
pub struct MissingColumns {
    pub missing: Vec<&'static str>,
}

/// Header comparison ignores surrounding whitespace, a UTF-8 BOM and case.
pub fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_ascii_lowercase()
}

/// Positions of each recognized field within one extract's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    positions: [usize; 8],
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Result<Self, MissingColumns> {
        let normalized = headers
            .iter()
            .map(|h| normalize_header(h))
            .collect::<Vec<_>>();
        let mut positions = [0usize; 8];
        let mut missing = Vec::new();
        for (slot, field) in Field::ALL.iter().enumerate() {
            let found = field
                .source_names()
                .iter()
                .find_map(|name| normalized.iter().position(|h| h == name));
            match found {
                Some(idx) => positions[slot] = idx,
                None => missing.push(field.source_names()[0]),
            }
        }
        if missing.is_empty() {
            Ok(Self { positions })
        } else {
            Err(MissingColumns { missing })
        }
    }

    pub fn position(&self, field: Field) -> usize {
        let slot = Field::ALL
            .iter()
            .position(|candidate| *candidate == field)
            .unwrap_or_default();
        self.positions[slot]
    }

    /// Projects a decoded row onto the recognized fields. Cells beyond the end
    /// of a short row come back as `None`.
    pub fn project(&self, line: u64, cells: &[String]) -> RawRecord {
        let cell = |field: Field| cells.get(self.position(field)).cloned();
        RawRecord {
            line,
            iso_code: cell(Field::IsoCode),
            continent: cell(Field::Continent),
            location: cell(Field::Location),
            date: cell(Field::Date),
            total_cases: cell(Field::TotalCases),
            new_cases: cell(Field::NewCases),
            total_deaths: cell(Field::TotalDeaths),
            new_deaths: cell(Field::NewDeaths),
        }
    }
}

/// One extract row before coercion. `line` is the 1-based line in the extract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub line: u64,
    pub iso_code: Option<String>,
    pub continent: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub total_cases: Option<String>,
    pub new_cases: Option<String>,
    pub total_deaths: Option<String>,
    pub new_deaths: Option<String>,
}

/// A normalized row as stored in and served from the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CovidRecord {
    pub iso_code: Option<String>,
    pub continent: Option<String>,
    pub location: String,
    pub date: NaiveDate,
    pub total_cases: Option<i64>,
    pub new_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub new_deaths: Option<i64>,
}

impl CovidRecord {
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.location.as_str(), self.date)
    }
}
