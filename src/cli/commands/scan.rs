//! Scan command implementation

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use juris_etl::staging::{ScanProgress, format_number, scan_roots};
use juris_etl::{DdlStyle, EtlConfig, InferenceError, SchemaReport};
use tracing::info;

use crate::error::CliError;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Corpus directories, scanned recursively
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,

    /// Text report destination
    #[arg(short, long, default_value = "check-files.log")]
    pub output: PathBuf,

    /// Also write the report as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Print a CREATE TABLE statement for this table name
    #[arg(long, value_name = "TABLE")]
    pub ddl: Option<String>,

    /// Extension of corpus documents
    #[arg(long)]
    pub extension: Option<String>,
}

/// Handle the scan command
pub fn handle_scan(args: ScanArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let mut config = EtlConfig::load_or_default(config_path)?;
    if let Some(extension) = args.extension {
        config.sizing.file_extension = extension;
    }

    prepare_output_dir(&args.output)?;
    if let Some(json_path) = &args.json {
        prepare_output_dir(json_path)?;
    }

    println!("Starting scan and sizing validation...");
    let progress = ScanProgress::new();
    let scan = scan_roots(&args.roots, &config.sizing, &progress)?;

    if scan.statistics.files == 0 {
        println!(
            "No {} files found to validate.",
            config.sizing.file_extension
        );
        return Ok(());
    }

    let report = match SchemaReport::build(&scan.accumulator, scan.statistics, &config.sizing) {
        Ok(report) => report,
        Err(InferenceError::NoValidFields) => {
            eprintln!("{}", InferenceError::NoValidFields.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    print!("{}", report.to_text());
    report.write_text(&args.output)?;
    println!(
        "\n[SUCCESS] Sizing report and statistics saved to: {}",
        args.output.display()
    );

    if let Some(json_path) = &args.json {
        report.write_json(json_path)?;
        println!("JSON report saved to: {}", json_path.display());
    }

    if let Some(table) = &args.ddl {
        println!("\n{}", report.to_ddl(table, DdlStyle::Warehouse));
    }

    info!(
        "Scanned {} records in {} files",
        format_number(report.statistics.records as u64),
        format_number(report.statistics.files as u64)
    );
    println!("Sizing validation and statistics complete.");
    Ok(())
}

/// Create the parent directory of a report destination before any scanning
fn prepare_output_dir(path: &Path) -> Result<(), CliError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent)
            .map_err(|e| CliError::FileWriteError(path.to_path_buf(), e.to_string())),
        None => Ok(()),
    }
}
