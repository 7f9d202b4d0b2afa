use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use sms_backup_merge::config::AppConfig;
use sms_backup_merge::db::{StagingStore, IN_MEMORY};
use sms_backup_merge::discovery::InputResolver;
use sms_backup_merge::logging::init_logging;
use sms_backup_merge::service::MergeService;
use sms_backup_merge::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about = "Merge SMS Backup & Restore XML exports", long_about = None)]
struct Cli {
    /// Input files, directories or glob patterns
    #[arg(short, long = "input", value_name = "INFILE", num_args = 1.., required = true)]
    inputs: Vec<String>,

    /// Merged output file
    #[arg(short, long, value_name = "OUTFILE")]
    output: String,

    /// Staging database file, or `:memory:`
    #[arg(long, value_name = "PATH")]
    staging_db: Option<String>,

    /// Extra configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write logs to this file (rotated daily)
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration, then let flags win
    let mut config = AppConfig::load_from(cli.config.as_deref())?;
    if let Some(staging_db) = &cli.staging_db {
        config.staging.database_path.clone_from(staging_db);
    }
    if let Some(log_file) = &cli.log_file {
        config.logging.file_path = Some(log_file.clone());
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let log_file = config.logging.file_path.as_deref().map(PathBuf::from);
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        log_file.as_deref(),
        config.logging.format == "json",
    )?;

    info!("Starting sms-backup-merge");

    let resolver = InputResolver::new(&config.merge.input_extension)?;
    let inputs = resolver.resolve(&cli.inputs).context("Failed to resolve input files")?;
    let output = resolver.expand_path(&cli.output)?;
    InputValidator::validate_output_path(&output, &inputs)?;

    let staging_path = if config.staging.database_path == IN_MEMORY {
        IN_MEMORY.to_string()
    } else {
        resolver
            .expand_path(&config.staging.database_path)?
            .to_string_lossy()
            .into_owned()
    };
    InputValidator::validate_staging_path(&staging_path, &output, &inputs)?;

    debug!(inputs = inputs.len(), staging = %staging_path, "Resolved paths");

    let store = StagingStore::open(&staging_path)
        .with_context(|| format!("Failed to open staging store at {staging_path}"))?;
    let mut service = MergeService::new(&config, store);

    let inputs: Vec<PathBuf> = inputs.into_iter().collect();
    let summary = service
        .run(&inputs, &output)
        .with_context(|| format!("Failed to merge into {}", output.display()))?;

    print_summary(summary.messages_staged(), summary.merge.duplicates_skipped);

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(messages: usize, duplicates: usize) {
    println!("Loaded staging store with {messages} messages.");
    println!("Skipped {duplicates} MMS duplicates of SMS");
}
