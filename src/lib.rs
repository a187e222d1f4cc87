//! dupsift - cascading duplicate file finder
//!
//! Files are grouped by size, then each size group is narrowed by hashing
//! small windows of content (front, end, middle, quarters) so that most
//! non-duplicates are ruled out after reading a few kilobytes. An optional
//! final whole-file hash turns surviving groups into exact matches.

pub mod cache;
pub mod cascade;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::collections::HashSet;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, ListArgs, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::output::{CandidateCsv, CandidateJson, CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::scanner::sort_by_size_desc;

/// Run one command and return the exit code to report.
///
/// # Errors
///
/// Fatal problems only: a bad root path, an explicit config file that does
/// not parse, an invalid probe list, or no readable candidates at all.
/// Unreadable individual files are reported in the output instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let mut config = match &cli.config {
        Some(path) => Config::try_load_from_path(path, cli.profile.as_deref())
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => Config::load(None, cli.profile.as_deref()),
    };

    match &cli.command {
        Commands::Scan(args) => {
            config.merge_scan_args(args);
            run_scan(&cli, &config, args)
        }
        Commands::List(args) => {
            config.merge_filter_args(&args.filter);
            run_list(&cli, &config, args)
        }
    }
}

fn run_scan(cli: &Cli, config: &Config, args: &ScanArgs) -> Result<ExitCode> {
    let handler = signal::install_handler()?;
    let finder_config = config
        .to_finder_config(Some(handler.get_flag()))?
        .with_progress_callback(Arc::new(Progress::new(
            cli.quiet || config.output != OutputFormat::Text,
        )));
    log::debug!("Finder configuration: {:?}", finder_config);

    let finder = DuplicateFinder::new(finder_config);
    let (groups, summary) = finder.find_duplicates_in_paths(args.filter.paths.clone())?;

    let exit_code = scan_exit_code(&groups, &summary);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Text => TextOutput::new(&groups, &summary)
            .with_stats(config.stats)
            .write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&groups, &summary, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?,
        OutputFormat::Csv => CsvOutput::new(&groups)
            .write_to(&mut out)
            .context("Failed to write CSV output")?,
    }
    out.flush()?;

    log::info!(
        "{} group(s), {} reclaimable, exit {}",
        summary.duplicate_groups,
        summary.reclaimable_display(),
        exit_code.code_prefix()
    );
    Ok(exit_code)
}

/// Interrupted beats everything; an empty result beats partial failure.
fn scan_exit_code(groups: &[DuplicateGroup], summary: &ScanSummary) -> ExitCode {
    if summary.interrupted {
        ExitCode::Interrupted
    } else if groups.is_empty() {
        ExitCode::NoDuplicates
    } else if summary.has_errors() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}

fn run_list(cli: &Cli, config: &Config, args: &ListArgs) -> Result<ExitCode> {
    let handler = signal::install_handler()?;
    let finder_config = config
        .to_finder_config(Some(handler.get_flag()))?
        .with_progress_callback(Arc::new(Progress::new(
            cli.quiet || config.output != OutputFormat::Text,
        )));
    let finder = DuplicateFinder::new(finder_config);

    let (mut files, errors) = finder.collect_candidates(&args.filter.paths)?;
    let mut seen = HashSet::new();
    files.retain(|f| seen.insert(f.path.clone()));
    sort_by_size_desc(&mut files);

    for err in &errors {
        log::warn!("{}", err);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Text => output::write_candidates(&mut out, &files)?,
        OutputFormat::Json => CandidateJson::new(&files)
            .write_to(&mut out)
            .context("Failed to write JSON output")?,
        OutputFormat::Csv => CandidateCsv::new(&files)
            .write_to(&mut out)
            .context("Failed to write CSV output")?,
    }
    out.flush()?;

    Ok(if handler.is_shutdown_requested() {
        ExitCode::Interrupted
    } else if errors.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}
