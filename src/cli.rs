use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::{export::ExportFormat, load::DuplicatePolicy, store::TableName};

#[derive(Debug, Parser)]
#[command(author, version, about = "Load COVID-19 statistics into a relational store", long_about = None)]
pub struct Cli {
    /// YAML file with connection parameters (environment variables override it)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Use this SQLite database file instead of the PostgreSQL parameters
    #[arg(long, global = true)]
    pub sqlite: Option<PathBuf>,
    /// Destination table name
    #[arg(long, global = true, default_value = "covid_data")]
    pub table: TableName,
    /// Append log output to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replace the destination table with the normalized contents of an extract
    Load(LoadArgs),
    /// Write the current table, optionally filtered, as CSV or JSON
    Export(ExportArgs),
    /// Print latest totals and death rate per location
    Summary(SummaryArgs),
    /// Copy a table from one store to another
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Extract to load ('-' reads stdin)
    #[arg(short = 'i', long = "input", default_value = "data/latest.csv")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the extract (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// How to treat repeated (location, date) rows
    #[arg(long, value_enum, default_value = "keep-all")]
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Only these locations (repeatable)
    #[arg(long = "location", action = clap::ArgAction::Append)]
    pub locations: Vec<String>,
    /// Only these continents (repeatable)
    #[arg(long = "continent", action = clap::ArgAction::Append)]
    pub continents: Vec<String>,
    /// Earliest date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Latest date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: ExportFormat,
    /// Delimiter for CSV output
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Show only the N locations with the most cases (0 = all)
    #[arg(long, default_value_t = 0)]
    pub top: usize,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Source store URL (postgres://... or sqlite://<path>)
    #[arg(long = "from", env = "MIGRATE_SOURCE_URL")]
    pub from: String,
    /// Destination store URL (postgres://... or sqlite://<path>)
    #[arg(long = "to", env = "MIGRATE_TARGET_URL")]
    pub to: String,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
        other => match other.as_bytes() {
            [] => Err("Delimiter cannot be empty".to_string()),
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err("Delimiter must be a single ASCII character".to_string()),
        },
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}
