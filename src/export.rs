//! Serialization of an already-fetched view for download.

use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use csv::QuoteStyle;

use crate::record::CovidRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// Writes a header row of canonical column names, then one row per record.
/// Absent values become empty cells.
pub fn write_csv<W: Write>(writer: W, delimiter: u8, records: &[&CovidRecord]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .has_headers(true)
        .from_writer(writer);
    if records.is_empty() {
        csv_writer
            .write_record(crate::record::column_names())
            .context("Writing export header")?;
    }
    for (idx, record) in records.iter().enumerate() {
        csv_writer
            .serialize(record)
            .with_context(|| format!("Writing export row {}", idx + 1))?;
    }
    csv_writer.flush().context("Flushing export")?;
    Ok(())
}

/// Writes a JSON array; absent values become `null`.
pub fn write_json<W: Write>(mut writer: W, records: &[&CovidRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records).context("Writing JSON export")?;
    writeln!(writer).context("Writing JSON export")?;
    writer.flush().context("Flushing export")?;
    Ok(())
}

pub fn write_records<W: Write>(
    writer: W,
    format: ExportFormat,
    delimiter: u8,
    records: &[&CovidRecord],
) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(writer, delimiter, records),
        ExportFormat::Json => write_json(writer, records),
    }
}
