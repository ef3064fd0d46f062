//! Stage command implementation

use std::path::{Path, PathBuf};

use clap::Args;
use juris_etl::staging::{LoadProgress, MemorySink, RecordSink, check_root, format_number, load_corpus};
use juris_etl::{EtlConfig, LoadStats};
use tracing::info;

use crate::error::CliError;

#[derive(Args, Debug)]
pub struct StageArgs {
    /// Corpus directory, scanned recursively
    pub root: PathBuf,

    /// DuckDB database file
    #[arg(short, long, required_unless_present = "dry_run")]
    pub database: Option<PathBuf>,

    /// Staging table name
    #[arg(short, long)]
    pub table: Option<String>,

    /// Rows per insert batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Control log location (relative paths resolve against ROOT)
    #[arg(long)]
    pub control_log: Option<PathBuf>,

    /// Prepare and batch records without writing them anywhere
    #[arg(long)]
    pub dry_run: bool,
}

/// Handle the stage command
pub fn handle_stage(args: StageArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let mut config = EtlConfig::load_or_default(config_path)?;
    if let Some(table) = &args.table {
        config.staging.table = table.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.staging.batch_size = batch_size;
    }
    if let Some(control_log) = &args.control_log {
        config.staging.control_log = control_log.clone();
    }
    config.staging.validate()?;
    check_root(&args.root)?;

    if args.dry_run {
        let mut sink = MemorySink::new();
        let stats = run_load(&args.root, &mut sink, &config)?;
        print_summary(&stats);
        println!(
            "Dry run: {} batches prepared, nothing written to a database",
            format_number(sink.batches.len() as u64)
        );
        return Ok(());
    }

    stage_into_database(&args, &config)
}

#[cfg(feature = "duckdb-backend")]
fn stage_into_database(args: &StageArgs, config: &EtlConfig) -> Result<(), CliError> {
    use juris_etl::staging::{ScanProgress, scan_corpus};
    use juris_etl::{DuckDbSink, SchemaReport};

    let Some(database) = &args.database else {
        return Err(CliError::InvalidArgument(
            "--database is required unless --dry-run is given".to_string(),
        ));
    };
    let database = database.to_str().ok_or_else(|| {
        CliError::InvalidArgument(format!("{} is not valid UTF-8", database.display()))
    })?;

    println!("Scanning corpus to size the staging table...");
    let scan = scan_corpus(&args.root, &config.sizing, &ScanProgress::new())?;
    let report = SchemaReport::build(&scan.accumulator, scan.statistics, &config.sizing)?;

    let mut sink = DuckDbSink::open(database)?;
    let table = &config.staging.table;
    if sink.table_exists(table)? {
        info!("Appending to existing table '{}'", table);
    }
    let conflict_keys: Vec<&str> = config
        .staging
        .conflict_keys
        .iter()
        .map(String::as_str)
        .collect();
    sink.ensure_table(&report, table, &conflict_keys)?;

    let stats = run_load(&args.root, &mut sink, config)?;
    print_summary(&stats);
    println!(
        "Table '{}' now holds {} rows",
        table,
        format_number(sink.record_count(table)?.max(0) as u64)
    );
    Ok(())
}

#[cfg(not(feature = "duckdb-backend"))]
fn stage_into_database(_args: &StageArgs, _config: &EtlConfig) -> Result<(), CliError> {
    Err(CliError::InvalidArgument(
        "this build has no database backend; rebuild with --features duckdb-backend \
         or pass --dry-run"
            .to_string(),
    ))
}

fn run_load<S: RecordSink>(
    root: &Path,
    sink: &mut S,
    config: &EtlConfig,
) -> Result<LoadStats, CliError> {
    info!(
        "Loading {} into table '{}'",
        root.display(),
        config.staging.table
    );
    let progress = LoadProgress::new();
    let stats = load_corpus(root, sink, &config.staging, &config.sizing, &progress)?;
    Ok(stats)
}

fn print_summary(stats: &LoadStats) {
    println!("\nStaging summary");
    println!("  Documents found:    {}", format_number(stats.files_found as u64));
    println!("  Already loaded:     {}", format_number(stats.files_skipped as u64));
    println!("  Loaded this run:    {}", format_number(stats.files_loaded as u64));
    println!("  Failed:             {}", format_number(stats.files_failed as u64));
    println!("  Records read:       {}", format_number(stats.records_read as u64));
    println!("  Records dropped:    {}", format_number(stats.records_dropped as u64));
    println!("  Rows written:       {}", format_number(stats.rows_written as u64));
    println!("  Batches:            {}", format_number(stats.batches as u64));
    if let Some(rate) = stats.throughput() {
        println!("  Throughput:         {:.0} rows/s", rate);
    }
}
