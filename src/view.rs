//! Dashboard-side views over a fetched snapshot: filtering, per-location
//! summaries and daily series.

use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use crate::record::CovidRecord;

/// Empty lists and `None` bounds impose no constraint. Date bounds are
/// inclusive; name matching ignores ASCII case.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub locations: Vec<String>,
    pub continents: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, record: &CovidRecord) -> bool {
        let listed = |wanted: &[String], value: Option<&str>| {
            wanted.is_empty()
                || value.is_some_and(|v| wanted.iter().any(|w| w.eq_ignore_ascii_case(v)))
        };
        listed(&self.locations, Some(record.location.as_str()))
            && listed(&self.continents, record.continent.as_deref())
            && self.from.is_none_or(|from| record.date >= from)
            && self.to.is_none_or(|to| record.date <= to)
    }

    pub fn apply<'a>(&self, records: &'a [CovidRecord]) -> Vec<&'a CovidRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSummary {
    pub location: String,
    pub continent: Option<String>,
    pub latest_date: NaiveDate,
    pub total_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub new_cases: i64,
    pub new_deaths: i64,
    /// Deaths per hundred cases, when there are cases to divide by.
    pub death_rate: Option<f64>,
}

/// One summary per location, sorted by location name. Totals are the latest
/// non-empty values; new counts are summed over the given rows.
pub fn summarize<'a, I>(records: I) -> Vec<LocationSummary>
where
    I: IntoIterator<Item = &'a CovidRecord>,
{
    let sorted = records
        .into_iter()
        .sorted_by(|a, b| a.location.cmp(&b.location).then(a.date.cmp(&b.date)))
        .collect::<Vec<_>>();
    let mut summaries = Vec::new();
    for (location, group) in &sorted.into_iter().chunk_by(|r| r.location.clone()) {
        let rows = group.collect::<Vec<_>>();
        let Some(last) = rows.last() else {
            continue;
        };
        let latest = |pick: fn(&CovidRecord) -> Option<i64>| rows.iter().rev().find_map(|r| pick(r));
        let total_cases = latest(|r| r.total_cases);
        let total_deaths = latest(|r| r.total_deaths);
        let death_rate = match (total_cases, total_deaths) {
            (Some(cases), Some(deaths)) if cases > 0 => Some(deaths as f64 / cases as f64 * 100.0),
            _ => None,
        };
        summaries.push(LocationSummary {
            continent: rows.iter().rev().find_map(|r| r.continent.clone()),
            latest_date: last.date,
            total_cases,
            total_deaths,
            new_cases: saturating_sum(rows.iter().filter_map(|r| r.new_cases)),
            new_deaths: saturating_sum(rows.iter().filter_map(|r| r.new_deaths)),
            death_rate,
            location,
        });
    }
    summaries
}

// Counts may be as large as `i64::MAX`, so sums clamp instead of wrapping.
fn saturating_sum(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0i64, i64::saturating_add)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub new_cases: Option<i64>,
    pub new_deaths: Option<i64>,
}

/// Date-ordered daily new cases and deaths for one location.
pub fn daily_series(records: &[CovidRecord], location: &str) -> Vec<DailyPoint> {
    records
        .iter()
        .filter(|r| r.location.eq_ignore_ascii_case(location))
        .map(|r| DailyPoint {
            date: r.date,
            new_cases: r.new_cases,
            new_deaths: r.new_deaths,
        })
        .sorted_by_key(|p| p.date)
        .collect()
}

/// Distinct location names in sorted order.
pub fn locations(records: &[CovidRecord]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r.location.as_str())
        .sorted()
        .dedup()
        .collect()
}
