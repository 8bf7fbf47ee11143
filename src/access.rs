//! Read-only access to the current snapshot of the destination table.

use thiserror::Error;

use crate::{
    record::CovidRecord,
    store::{Store, StoreError, StoreTarget, TableName},
};

#[derive(Debug, Error)]
#[error("querying table '{table}' failed")]
pub struct QueryError {
    pub table: String,
    #[source]
    pub source: StoreError,
}

/// Fetches the full table from an already-open store. An empty table yields
/// an empty vector.
pub fn fetch_all(store: &mut dyn Store, table: &TableName) -> Result<Vec<CovidRecord>, QueryError> {
    store.fetch_all(table).map_err(|source| QueryError {
        table: table.to_string(),
        source,
    })
}

/// Query surface handed to presentation code. Each call opens its own
/// connection and closes it before returning; the store must already exist.
#[derive(Debug, Clone)]
pub struct DataAccess {
    target: StoreTarget,
    table: TableName,
}

impl DataAccess {
    pub fn new(target: StoreTarget, table: TableName) -> Self {
        Self { target, table }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn fetch_all(&self) -> Result<Vec<CovidRecord>, QueryError> {
        let mut store = self.target.connect_existing().map_err(|source| QueryError {
            table: self.table.to_string(),
            source,
        })?;
        fetch_all(store.as_mut(), &self.table)
    }
}
