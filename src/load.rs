//! Replace-load of the extract into the destination table.
//!
//! A run reads the whole extract, normalizes each row, applies the duplicate
//! policy and only then touches the store: one transaction deletes every
//! existing row and inserts the new set. Source problems therefore never
//! mutate the destination, and store problems leave it as it was.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use clap::ValueEnum;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    io_utils,
    normalize::{RejectReason, normalize},
    record::{ColumnMap, CovidRecord},
    store::{Store, StoreError, StoreTarget, TableName},
};

/// What to do when one extract carries several rows for the same
/// `(location, date)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Store every row as read.
    #[default]
    KeepAll,
    /// The row appearing last in the extract wins.
    KeepLast,
    /// The row appearing first in the extract wins.
    KeepFirst,
    /// Abort the run without touching the destination.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    SourceUnavailable,
    SchemaMismatch,
    DuplicateRow,
    StoreWriteFailure,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source extract {path:?} is unavailable")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("source extract {path:?} does not match the expected layout: {detail}")]
    SchemaMismatch { path: PathBuf, detail: String },
    #[error(
        "duplicate rows for {location} on {date} at lines {first_line} and {second_line}"
    )]
    DuplicateRow {
        location: String,
        date: NaiveDate,
        first_line: u64,
        second_line: u64,
    },
    #[error("writing to the destination store failed")]
    StoreWriteFailure(#[source] StoreError),
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::SourceUnavailable { .. } => LoadErrorKind::SourceUnavailable,
            LoadError::SchemaMismatch { .. } => LoadErrorKind::SchemaMismatch,
            LoadError::DuplicateRow { .. } => LoadErrorKind::DuplicateRow,
            LoadError::StoreWriteFailure(_) => LoadErrorKind::StoreWriteFailure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter; `None` picks one from the file extension.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub duplicates: DuplicatePolicy,
    pub table: TableName,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            duplicates: DuplicatePolicy::default(),
            table: TableName::default(),
        }
    }
}

/// The normalized, deduplicated contents of one extract.
#[derive(Debug, Clone)]
pub struct Extract {
    pub records: Vec<CovidRecord>,
    pub rows_read: usize,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub duplicates_dropped: usize,
    /// Hex SHA-256 of the extract bytes.
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub duplicates_dropped: usize,
    pub fingerprint: String,
}

impl LoadReport {
    pub fn rows_rejected(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Reads and normalizes an extract without touching any store.
pub fn read_extract(path: &Path, options: &LoadOptions) -> Result<Extract, LoadError> {
    let bytes = io_utils::read_all(path).map_err(|source| LoadError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let fingerprint = hex::encode(Sha256::digest(&bytes));
    let mismatch = |detail: String| LoadError::SchemaMismatch {
        path: path.to_path_buf(),
        detail,
    };

    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let mut reader = io_utils::open_csv_reader(bytes.as_slice(), delimiter);
    let header_record = reader
        .byte_headers()
        .map_err(|err| mismatch(format!("unreadable header row ({err})")))?
        .clone();
    let headers = io_utils::decode_record(&header_record, options.encoding)
        .map_err(|err| mismatch(format!("header row: {err}")))?;
    let columns = ColumnMap::resolve(&headers).map_err(|err| mismatch(err.to_string()))?;

    let mut rows_read = 0usize;
    let mut rejected = BTreeMap::new();
    let mut accepted = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|err| mismatch(format!("malformed row ({err})")))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let cells = io_utils::decode_record(&record, options.encoding)
            .map_err(|err| mismatch(format!("line {line}: {err}")))?;
        rows_read += 1;
        match normalize(columns.project(line, &cells)) {
            Ok(normalized) => accepted.push((line, normalized)),
            Err(rejection) => {
                debug!(
                    "Rejected line {} ({}): {:?}",
                    rejection.line, rejection.reason, rejection.value
                );
                *rejected.entry(rejection.reason).or_insert(0) += 1;
            }
        }
    }

    let before = accepted.len();
    let records = apply_duplicate_policy(accepted, options.duplicates)?;
    Ok(Extract {
        duplicates_dropped: before - records.len(),
        records,
        rows_read,
        rejected,
        fingerprint,
    })
}

/// Keeps encounter order for the surviving rows.
fn apply_duplicate_policy(
    rows: Vec<(u64, CovidRecord)>,
    policy: DuplicatePolicy,
) -> Result<Vec<CovidRecord>, LoadError> {
    match policy {
        DuplicatePolicy::KeepAll => Ok(rows.into_iter().map(|(_, record)| record).collect()),
        DuplicatePolicy::KeepFirst => {
            let mut seen = HashSet::new();
            Ok(rows
                .into_iter()
                .filter(|(_, record)| seen.insert((record.location.clone(), record.date)))
                .map(|(_, record)| record)
                .collect())
        }
        DuplicatePolicy::KeepLast => {
            let last = rows
                .iter()
                .enumerate()
                .map(|(idx, (_, record))| (record.key(), idx))
                .collect::<HashMap<_, _>>();
            let keep = last.into_values().collect::<HashSet<_>>();
            Ok(rows
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| keep.contains(idx))
                .map(|(_, (_, record))| record)
                .collect())
        }
        DuplicatePolicy::Reject => {
            let mut first_seen: HashMap<(&str, NaiveDate), u64> = HashMap::new();
            for (line, record) in &rows {
                if let Some(first_line) = first_seen.insert(record.key(), *line) {
                    return Err(LoadError::DuplicateRow {
                        location: record.location.clone(),
                        date: record.date,
                        first_line,
                        second_line: *line,
                    });
                }
            }
            Ok(rows.into_iter().map(|(_, record)| record).collect())
        }
    }
}

/// Replace-loads `path` into an already-open store.
pub fn load(
    path: &Path,
    store: &mut dyn Store,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let extract = read_extract(path, options)?;
    write_extract(extract, store, &options.table)
}

/// Replace-loads `path` into `target`. The connection is opened only once the
/// extract has been read and is closed before returning.
pub fn load_into(
    path: &Path,
    target: &StoreTarget,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let extract = read_extract(path, options)?;
    let mut store = target.connect().map_err(LoadError::StoreWriteFailure)?;
    write_extract(extract, store.as_mut(), &options.table)
}

fn write_extract(
    extract: Extract,
    store: &mut dyn Store,
    table: &TableName,
) -> Result<LoadReport, LoadError> {
    info!(
        "Read {} row(s) from extract (sha256 {})",
        extract.rows_read, extract.fingerprint
    );
    for (reason, count) in &extract.rejected {
        warn!("Excluded {count} row(s): {reason}");
    }
    if extract.duplicates_dropped > 0 {
        warn!(
            "Dropped {} duplicate (location, date) row(s)",
            extract.duplicates_dropped
        );
    }
    let rows_loaded = store
        .replace_all(table, &extract.records)
        .map_err(LoadError::StoreWriteFailure)?;
    info!("Loaded {rows_loaded} row(s) into {table}");
    Ok(LoadReport {
        rows_read: extract.rows_read,
        rows_loaded,
        rejected: extract.rejected,
        duplicates_dropped: extract.duplicates_dropped,
        fingerprint: extract.fingerprint,
    })
}
