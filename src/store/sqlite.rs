use std::{fs, path::Path, time::Duration};

use log::debug;
use rusqlite::{Connection, OpenFlags, Row, params};

use super::{BackendError, SQLITE_MEMORY, Store, StoreError, TableName};
use crate::record::CovidRecord;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed store. Dates are kept as `YYYY-MM-DD` text.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens `path`, creating the database file and its parent directory if
    /// they do not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| connect_error(path, source))?;
        }
        let conn = Connection::open(path).map_err(|source| connect_error(path, source))?;
        Self::configure(path, conn)
    }

    /// Opens an existing database without creating anything on disk.
    pub fn open_existing(path: &Path) -> Result<Self, StoreError> {
        if path == Path::new(SQLITE_MEMORY) {
            return Self::open_in_memory();
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|source| connect_error(path, source))?;
        Self::configure(path, conn)
    }

    fn configure(path: &Path, conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|source| connect_error(path, source))?;
        debug!("Opened sqlite database {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Connect {
            target: "in-memory sqlite database".to_string(),
            source: source.into(),
        })?;
        Ok(Self { conn })
    }

    /// The underlying connection, for schema work outside the [`Store`] API.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn connect_error(path: &Path, source: impl Into<BackendError>) -> StoreError {
    StoreError::Connect {
        target: format!("sqlite database {}", path.display()),
        source: source.into(),
    }
}

fn create_table_sql(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            iso_code     TEXT,
            continent    TEXT,
            location     TEXT NOT NULL,
            date         TEXT NOT NULL,
            total_cases  INTEGER,
            new_cases    INTEGER,
            total_deaths INTEGER,
            new_deaths   INTEGER
        )"
    )
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<CovidRecord> {
    Ok(CovidRecord {
        iso_code: row.get(0)?,
        continent: row.get(1)?,
        location: row.get(2)?,
        date: row.get(3)?,
        total_cases: row.get(4)?,
        new_cases: row.get(5)?,
        total_deaths: row.get(6)?,
        new_deaths: row.get(7)?,
    })
}

impl Store for SqliteStore {
    fn ensure_table(&mut self, table: &TableName) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&create_table_sql(table))
            .map_err(StoreError::statement("create", table))
    }

    fn replace_all(
        &mut self,
        table: &TableName,
        records: &[CovidRecord],
    ) -> Result<usize, StoreError> {
        // Dropping `tx` without commit rolls back.
        let tx = self
            .conn
            .transaction()
            .map_err(StoreError::statement("begin", table))?;
        tx.execute_batch(&create_table_sql(table))
            .map_err(StoreError::statement("create", table))?;
        let removed = tx
            .execute(&format!("DELETE FROM {table}"), [])
            .map_err(StoreError::statement("delete", table))?;
        {
            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {table} (
                        iso_code, continent, location, date,
                        total_cases, new_cases, total_deaths, new_deaths
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ))
                .map_err(StoreError::statement("insert", table))?;
            for record in records {
                insert
                    .execute(params![
                        record.iso_code,
                        record.continent,
                        record.location,
                        record.date,
                        record.total_cases,
                        record.new_cases,
                        record.total_deaths,
                        record.new_deaths,
                    ])
                    .map_err(StoreError::statement("insert", table))?;
            }
        }
        tx.commit().map_err(StoreError::statement("commit", table))?;
        debug!(
            "Replaced {removed} row(s) in {table} with {} row(s)",
            records.len()
        );
        Ok(records.len())
    }

    fn fetch_all(&mut self, table: &TableName) -> Result<Vec<CovidRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT iso_code, continent, location, date,
                        total_cases, new_cases, total_deaths, new_deaths
                 FROM {table}
                 ORDER BY location, date"
            ))
            .map_err(StoreError::statement("select", table))?;
        let rows = stmt
            .query_map([], read_record)
            .map_err(StoreError::statement("select", table))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::statement("select", table))
    }
}
