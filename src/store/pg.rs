use log::debug;
use postgres::{Client, Config, NoTls, Row};

use super::{Store, StoreError, TableName};
use crate::record::CovidRecord;

/// PostgreSQL-backed store over a blocking client.
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    pub fn connect(config: &Config) -> Result<Self, StoreError> {
        let client = config.connect(NoTls).map_err(|source| StoreError::Connect {
            target: format!(
                "postgres database '{}'",
                config.get_dbname().unwrap_or_default()
            ),
            source: source.into(),
        })?;
        debug!(
            "Connected to postgres database '{}'",
            config.get_dbname().unwrap_or_default()
        );
        Ok(Self { client })
    }
}

fn create_table_sql(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            iso_code     TEXT,
            continent    TEXT,
            location     TEXT NOT NULL,
            date         DATE NOT NULL,
            total_cases  BIGINT,
            new_cases    BIGINT,
            total_deaths BIGINT,
            new_deaths   BIGINT
        )"
    )
}

// Explicit casts let the same statements work against tables created with
// INTEGER counts or VARCHAR text columns.
fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {table} (
            iso_code, continent, location, date,
            total_cases, new_cases, total_deaths, new_deaths
        ) VALUES ($1::TEXT, $2::TEXT, $3::TEXT, $4::DATE, $5::BIGINT, $6::BIGINT, $7::BIGINT, $8::BIGINT)"
    )
}

fn select_sql(table: &TableName) -> String {
    format!(
        "SELECT iso_code::TEXT, continent::TEXT, location::TEXT, date::DATE,
                total_cases::BIGINT, new_cases::BIGINT, total_deaths::BIGINT, new_deaths::BIGINT
         FROM {table}
         ORDER BY location, date"
    )
}

fn read_record(row: &Row) -> Result<CovidRecord, postgres::Error> {
    Ok(CovidRecord {
        iso_code: row.try_get(0)?,
        continent: row.try_get(1)?,
        location: row.try_get(2)?,
        date: row.try_get(3)?,
        total_cases: row.try_get(4)?,
        new_cases: row.try_get(5)?,
        total_deaths: row.try_get(6)?,
        new_deaths: row.try_get(7)?,
    })
}

impl Store for PostgresStore {
    fn ensure_table(&mut self, table: &TableName) -> Result<(), StoreError> {
        self.client
            .batch_execute(&create_table_sql(table))
            .map_err(StoreError::statement("create", table))
    }

    fn replace_all(
        &mut self,
        table: &TableName,
        records: &[CovidRecord],
    ) -> Result<usize, StoreError> {
        // An uncommitted transaction rolls back when dropped.
        let mut tx = self
            .client
            .transaction()
            .map_err(StoreError::statement("begin", table))?;
        tx.batch_execute(&create_table_sql(table))
            .map_err(StoreError::statement("create", table))?;
        let removed = tx
            .execute(format!("DELETE FROM {table}").as_str(), &[])
            .map_err(StoreError::statement("delete", table))?;
        let insert = tx
            .prepare(&insert_sql(table))
            .map_err(StoreError::statement("insert", table))?;
        for record in records {
            tx.execute(
                &insert,
                &[
                    &record.iso_code,
                    &record.continent,
                    &record.location,
                    &record.date,
                    &record.total_cases,
                    &record.new_cases,
                    &record.total_deaths,
                    &record.new_deaths,
                ],
            )
            .map_err(StoreError::statement("insert", table))?;
        }
        tx.commit().map_err(StoreError::statement("commit", table))?;
        debug!(
            "Replaced {removed} row(s) in {table} with {} row(s)",
            records.len()
        );
        Ok(records.len())
    }

    fn fetch_all(&mut self, table: &TableName) -> Result<Vec<CovidRecord>, StoreError> {
        let rows = self
            .client
            .query(select_sql(table).as_str(), &[])
            .map_err(StoreError::statement("select", table))?;
        rows.iter()
            .map(read_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::statement("select", table))
    }
}
