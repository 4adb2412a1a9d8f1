//! Command implementations for the formatter CLI
//!
//! Sets up logging, loads the configuration and dispatches to the
//! processor, the output cleaner or the unit listing.

use crate::cli::args::{Args, CleanArgs, Commands, ProcessArgs};
use crate::config::{AppConfig, Scope};
use crate::models::RunStats;
use crate::processor::Processor;
use crate::upload::{FtpPublisher, MirrorPublisher, Publisher};
use anyhow::{Context, Result, bail};
use colored::*;
use glob::Pattern;
use indicatif::HumanDuration;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Run the selected command
///
/// Returns the run statistics of a `process` command; other commands return
/// empty statistics.
pub fn run(args: Args) -> Result<RunStats> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Some(Commands::Process(process)) => run_process(&args, process),
        Some(Commands::Clean(clean)) => run_clean(&args, clean),
        Some(Commands::Show) => run_show(&args),
        None => Ok(RunStats::default()),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use crate::constants::LOG_TARGET;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", LOG_TARGET, log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn run_process(args: &Args, process: &ProcessArgs) -> Result<RunStats> {
    let start_time = Instant::now();
    let config = load_config(&args.config)?;

    let publisher: Option<Box<dyn Publisher>> = if process.upload {
        let ftp = config
            .ftp
            .clone()
            .context("--upload needs an 'ftp' section in the configuration")?;
        info!("Uploading finished files to {}", ftp.address);
        Some(Box::new(FtpPublisher::new(ftp)))
    } else {
        process
            .mirror
            .as_ref()
            .map(|dir| Box::new(MirrorPublisher::new(dir)) as Box<dyn Publisher>)
    };

    let mut processor = Processor::new(config)
        .with_parquet_dir(process.parquet.clone())
        .with_tracking(process.track.then(|| args.config.clone()))
        .with_progress(args.show_progress());
    if let Some(publisher) = publisher {
        processor = processor.with_publisher(publisher);
    }

    let stats = processor.run(&process.scope())?;
    if !args.quiet {
        print_summary(&stats, start_time.elapsed());
    }
    Ok(stats)
}

fn print_summary(stats: &RunStats, elapsed: Duration) {
    let title = if stats.is_success() {
        "Processing complete".bright_green().bold()
    } else {
        "Processing finished with errors".bright_red().bold()
    };
    println!("\n{}", title);
    println!("  Units processed:  {}", stats.units_processed);
    if stats.units_skipped > 0 {
        println!("  Units skipped:    {}", stats.units_skipped.to_string().yellow());
    }
    if stats.units_failed > 0 {
        println!("  Units failed:     {}", stats.units_failed.to_string().red());
    }
    println!("  Rows read:        {}", stats.rows_read);
    println!("  Rows exported:    {}", stats.rows_exported);
    if stats.rows_quarantined > 0 {
        println!("  Rows quarantined: {}", stats.rows_quarantined.to_string().yellow());
    }
    println!("  Files written:    {}", stats.files_written);
    if stats.files_published > 0 {
        println!("  Files published:  {}", stats.files_published);
    }
    println!("  Time:             {}", HumanDuration(elapsed));
}

fn run_clean(args: &Args, clean: &CleanArgs) -> Result<RunStats> {
    let config = load_config(&args.config)?;
    let Some(output_dir) = config.settings.data_output_dir.clone() else {
        bail!("Refusing to clean without 'settings.data_output_dir' in the configuration");
    };

    let patterns = clean
        .patterns()
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid pattern '{}'", p)))
        .collect::<Result<Vec<_>>>()?;

    let mut roots = vec![output_dir];
    roots.extend(config.settings.parquet_output_dir.clone());

    for root in &roots {
        let matched = clean_dir(root, &patterns, clean.dry_run)?;
        let verb = if clean.dry_run { "Would delete" } else { "Deleted" };
        for path in &matched {
            println!("{} {}", verb, path.display());
        }
        println!(
            "{} {} files under {}",
            verb.bold(),
            matched.len(),
            root.display().to_string().bright_white()
        );
    }

    Ok(RunStats::default())
}

/// Delete files under `dir` whose name matches any of `patterns`
///
/// Returns the matched paths. A missing directory matches nothing.
pub fn clean_dir(dir: &Path, patterns: &[Pattern], dry_run: bool) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        debug!("Nothing to clean, {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut matched = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if patterns.iter().any(|p| p.matches(&name)) {
            matched.push(entry.into_path());
        }
    }

    if !dry_run {
        for path in &matched {
            fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))?;
        }
    }
    Ok(matched)
}

fn run_show(args: &Args) -> Result<RunStats> {
    let config = load_config(&args.config)?;

    let status = if config.settings.active {
        "active".green()
    } else {
        "inactive".yellow()
    };
    println!("System is {}", status);
    println!("Output directory: {}", config.output_dir().display());

    for unit in config.select_units(&Scope::default())? {
        let logger = config.datalogger(&unit.site, &unit.location, &unit.datalogger)?;
        let file = match &unit.table {
            Some(table) => logger.tables.get(table).map(|t| t.file_path.clone()),
            None => logger.file_path.clone(),
        };
        println!(
            "  {}  line {}  {}",
            unit.to_string().bright_white(),
            config.cursor(&unit)?,
            file.map(|f| f.display().to_string()).unwrap_or_default().dimmed()
        );
    }

    Ok(RunStats::default())
}
