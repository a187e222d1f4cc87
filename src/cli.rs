//! Command-line interface definitions.
//!
//! Options left unset on the command line fall through to the config file,
//! the selected profile, `DUPSIFT_*` environment variables, and finally the
//! built-in defaults (see [`crate::config`]).
//!
//! ```bash
//! # Default (normal) cascade over one directory
//! dupsift scan ~/Downloads
//!
//! # Exact matches only, JSON for scripting
//! dupsift scan ~/Photos --mode full --output json
//!
//! # Only archives between 1 MiB and 2 GiB
//! dupsift scan /backups -e zip,tar.gz --min-size 1MiB --max-size 2GiB
//!
//! # What would be considered, largest first
//! dupsift list ~/Downloads --min-size 1MB
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cascade::Mode;

/// Cascading duplicate file finder.
///
/// Groups files by size, then narrows each group with cheap partial-content
/// fingerprints (front, end, middle, quarters) before an optional full hash.
#[derive(Debug, Parser)]
#[command(name = "dupsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Named profile from the configuration file
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicate files
    Scan(ScanArgs),
    /// List the files a scan would consider, largest first
    List(ListArgs),
}

/// Candidate selection shared by `scan` and `list`.
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Directories (or individual files) to examine
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Minimum file size to consider (e.g., 3K, 1MB, 1MiB)
    ///
    /// Supports suffixes: B, K/KB, KiB, M/MB, MiB, G/GB, GiB, T/TB, TiB
    #[arg(short = 's', long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 300M, 2GiB)
    #[arg(short = 'S', long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Only consider these extensions (comma separated, e.g. "jpg,png,tar.gz")
    #[arg(short = 'e', long = "ext", value_name = "LIST")]
    pub extensions: Option<String>,

    /// Glob patterns to ignore (can be specified multiple times)
    ///
    /// These patterns are added to any .gitignore patterns found.
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links during the walk
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Consider zero-byte files (all empty files are duplicates of each other)
    #[arg(long)]
    pub include_empty: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Cascade depth: fast (front/end/middle), normal (+ quarters), full (+ whole file)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Custom probe order, e.g. "size,front,end,full" (overrides --mode)
    #[arg(long, value_name = "PROBES", conflicts_with = "mode")]
    pub probes: Option<String>,

    /// Window width for partial probes (default 64KiB)
    #[arg(short = 'c', long, value_name = "SIZE", value_parser = parse_chunk_size)]
    pub chunk_size: Option<u64>,

    /// Scale the window with file size; files up to 254KiB are read whole
    #[arg(long, conflicts_with = "chunk_size")]
    pub adaptive_chunks: bool,

    /// Number of I/O threads for probing (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: Option<u16>,

    /// Never memory-map files for whole-file probes
    #[arg(long)]
    pub no_mmap: bool,

    /// Print per-stage statistics after the results
    #[arg(long)]
    pub stats: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable, colored
    #[default]
    Text,
    /// JSON for scripting
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, K/KB, KiB, M/MB, MiB, G/GB, GiB, T/TB, TiB.
/// Case-insensitive; single-letter and `xB` suffixes are decimal, `xiB`
/// suffixes binary. Numbers without suffix are bytes.
///
/// # Examples
///
/// ```
/// use dupsift::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("3K").unwrap(), 3000);
/// assert_eq!(parse_size("64KiB").unwrap(), 65_536);
/// assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

/// [`parse_size`] that also rejects zero.
///
/// # Errors
///
/// As [`parse_size`], plus a zero width.
pub fn parse_chunk_size(s: &str) -> Result<u64, String> {
    match parse_size(s)? {
        0 => Err("Chunk size must be at least 1 byte".to_string()),
        n => Ok(n),
    }
}
