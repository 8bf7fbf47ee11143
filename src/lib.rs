pub mod access;
pub mod cli;
pub mod config;
pub mod data;
pub mod export;
pub mod io_utils;
pub mod load;
pub mod migrate;
pub mod normalize;
pub mod record;
pub mod store;
pub mod table;
pub mod view;

use std::{env, fs::OpenOptions, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    access::DataAccess,
    cli::{Cli, Commands, FilterArgs},
    config::DatabaseConfig,
    load::LoadOptions,
    store::{StoreTarget, TableName},
    view::RecordFilter,
};

static LOGGER: OnceLock<Result<(), String>> = OnceLock::new();

/// Installs the logger once per process; later calls return the first
/// outcome without touching `log_file`.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    LOGGER
        .get_or_init(|| {
            let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
            if env::var("RUST_LOG").is_err() {
                builder.filter_module("covid_loader", LevelFilter::Info);
            }
            if let Some(path) = log_file {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|err| format!("Opening log file {path:?}: {err}"))?;
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            let _ = builder.format_timestamp_millis().try_init();
            Ok(())
        })
        .clone()
        .map_err(anyhow::Error::msg)
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;
    match &cli.command {
        Commands::Load(args) => {
            let target = resolve_target(&cli)?;
            handle_load(args, &target, &cli.table)
        }
        Commands::Export(args) => {
            let target = resolve_target(&cli)?;
            handle_export(args, DataAccess::new(target, cli.table.clone()))
        }
        Commands::Summary(args) => {
            let target = resolve_target(&cli)?;
            handle_summary(args, DataAccess::new(target, cli.table.clone()))
        }
        Commands::Migrate(args) => handle_migrate(args, &cli.table),
    }
}

/// Settles where the store lives before any work starts; a missing connection
/// parameter stops the process here.
fn resolve_target(cli: &Cli) -> Result<StoreTarget> {
    if let Some(path) = &cli.sqlite {
        return Ok(StoreTarget::sqlite(path));
    }
    let config = DatabaseConfig::from_sources(cli.config.as_deref())
        .context("Resolving database configuration")?;
    debug!("Using {config:?}");
    Ok(StoreTarget::postgres(&config))
}

fn handle_load(args: &cli::LoadArgs, target: &StoreTarget, table: &TableName) -> Result<()> {
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        duplicates: args.duplicates,
        table: table.clone(),
    };
    info!(
        "Loading {:?} into {target} table {table} (duplicates: {:?})",
        args.input, args.duplicates
    );
    let report = load::load_into(&args.input, target, &options)
        .with_context(|| format!("Loading {:?}", args.input))?;
    println!(
        "Loaded {} row(s) into {table} ({} read, {} rejected, {} duplicate(s) dropped)",
        report.rows_loaded,
        report.rows_read,
        report.rows_rejected(),
        report.duplicates_dropped
    );
    Ok(())
}

fn record_filter(args: &FilterArgs) -> RecordFilter {
    RecordFilter {
        locations: args.locations.clone(),
        continents: args.continents.clone(),
        from: args.from,
        to: args.to,
    }
}

fn handle_export(args: &cli::ExportArgs, access: DataAccess) -> Result<()> {
    let records = access.fetch_all().context("Fetching records for export")?;
    let filtered = record_filter(&args.filter).apply(&records);
    let delimiter = match &args.output {
        Some(path) => io_utils::resolve_input_delimiter(path, args.delimiter),
        None => args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER),
    };
    let writer = io_utils::open_output(args.output.as_deref())?;
    export::write_records(writer, args.format, delimiter, &filtered)?;
    info!(
        "Exported {} of {} row(s) from {}",
        filtered.len(),
        records.len(),
        access.table()
    );
    Ok(())
}

fn handle_summary(args: &cli::SummaryArgs, access: DataAccess) -> Result<()> {
    let records = access.fetch_all().context("Fetching records for summary")?;
    let filtered = record_filter(&args.filter).apply(&records);
    let mut summaries = view::summarize(filtered.iter().copied());
    if args.top > 0 {
        summaries.sort_by(|a, b| b.total_cases.cmp(&a.total_cases));
        summaries.truncate(args.top);
    }
    table::print_table(&table::SUMMARY_HEADERS, &table::summary_rows(&summaries));
    info!("Summarized {} location(s)", summaries.len());
    Ok(())
}

fn handle_migrate(args: &cli::MigrateArgs, table: &TableName) -> Result<()> {
    let source = StoreTarget::parse(&args.from).context("Parsing --from store URL")?;
    let dest = StoreTarget::parse(&args.to).context("Parsing --to store URL")?;
    let copied = migrate::migrate_between(&source, &dest, table)
        .with_context(|| format!("Migrating table {table}"))?;
    println!("Copied {copied} row(s) into {table}");
    Ok(())
}
