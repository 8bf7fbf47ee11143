//! One-shot copy of a table between two stores.
//!
//! The copy trusts the source: rows are not re-normalized. The destination is
//! written with the same transactional replace as a load, so a failed copy
//! leaves it untouched.
//!
//! Replacing deletes the destination rows but keeps the destination table
//! itself. A pre-existing table whose columns do not fit the record layout is
//! not dropped and recreated; the copy fails with `DestinationWriteFailure`.

use std::fmt;

use log::info;
use thiserror::Error;

use crate::store::{Store, StoreError, StoreTarget, TableName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    Source,
    Destination,
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRole::Source => f.write_str("source"),
            StoreRole::Destination => f.write_str("destination"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationErrorKind {
    ConnectionFailure,
    SourceReadFailure,
    DestinationWriteFailure,
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not connect to the {role} store")]
    ConnectionFailure {
        role: StoreRole,
        #[source]
        source: StoreError,
    },
    #[error("reading table '{table}' from the source store failed")]
    SourceReadFailure {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("writing table '{table}' to the destination store failed")]
    DestinationWriteFailure {
        table: String,
        #[source]
        source: StoreError,
    },
}

impl MigrationError {
    pub fn kind(&self) -> MigrationErrorKind {
        match self {
            MigrationError::ConnectionFailure { .. } => MigrationErrorKind::ConnectionFailure,
            MigrationError::SourceReadFailure { .. } => MigrationErrorKind::SourceReadFailure,
            MigrationError::DestinationWriteFailure { .. } => {
                MigrationErrorKind::DestinationWriteFailure
            }
        }
    }
}

/// Copies every row of `table` from `source` over the same table in `dest`.
pub fn migrate(
    source: &mut dyn Store,
    dest: &mut dyn Store,
    table: &TableName,
) -> Result<usize, MigrationError> {
    let records = source
        .fetch_all(table)
        .map_err(|source| MigrationError::SourceReadFailure {
            table: table.to_string(),
            source,
        })?;
    info!("Fetched {} row(s) from source table {table}", records.len());
    let copied = dest
        .replace_all(table, &records)
        .map_err(|source| MigrationError::DestinationWriteFailure {
            table: table.to_string(),
            source,
        })?;
    info!("Copied {copied} row(s) into destination table {table}");
    Ok(copied)
}

/// Opens both stores, copies, and closes them again. The source must already
/// exist; the destination is created if it does not.
pub fn migrate_between(
    source: &StoreTarget,
    dest: &StoreTarget,
    table: &TableName,
) -> Result<usize, MigrationError> {
    let mut source_store = source
        .connect_existing()
        .map_err(|source| MigrationError::ConnectionFailure {
            role: StoreRole::Source,
            source,
        })?;
    let mut dest_store = dest
        .connect()
        .map_err(|source| MigrationError::ConnectionFailure {
            role: StoreRole::Destination,
            source,
        })?;
    info!("Migrating table {table} from {source} to {dest}");
    migrate(source_store.as_mut(), dest_store.as_mut(), table)
}
