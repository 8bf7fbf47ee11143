//! Row normalization: one [`RawRecord`] in, one [`CovidRecord`] or a
//! [`Rejection`] out.
//!
//! Only an unusable `date` or `location` rejects a row. Bad counts and text
//! degrade to absent values.

use std::fmt;

use serde::Serialize;

use crate::{
    data::{parse_count, parse_naive_date, parse_text},
    record::{CovidRecord, RawRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidDate,
    MissingLocation,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::InvalidDate => "invalid_date",
            RejectReason::MissingLocation => "missing_location",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub line: u64,
    pub reason: RejectReason,
    /// The offending cell as it appeared in the extract, if there was one.
    pub value: Option<String>,
}

pub fn normalize(raw: RawRecord) -> Result<CovidRecord, Rejection> {
    let Some(date) = raw.date.as_deref().and_then(parse_naive_date) else {
        return Err(Rejection {
            line: raw.line,
            reason: RejectReason::InvalidDate,
            value: raw.date,
        });
    };
    let Some(location) = raw.location.as_deref().and_then(parse_text) else {
        return Err(Rejection {
            line: raw.line,
            reason: RejectReason::MissingLocation,
            value: raw.location,
        });
    };
    let count = |cell: &Option<String>| cell.as_deref().and_then(parse_count);
    Ok(CovidRecord {
        iso_code: raw.iso_code.as_deref().and_then(parse_text),
        continent: raw.continent.as_deref().and_then(parse_text),
        location,
        date,
        total_cases: count(&raw.total_cases),
        new_cases: count(&raw.new_cases),
        total_deaths: count(&raw.total_deaths),
        new_deaths: count(&raw.new_deaths),
    })
}
