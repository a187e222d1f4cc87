//! Candidate discovery and content hashing.
//!
//! - [`walker`]: directory traversal with jwalk, producing [`CandidateFile`]s
//! - [`filter`]: size-range and extension filters applied during the walk
//! - [`hasher`]: BLAKE3 over byte windows and whole files
//!
//! ```no_run
//! use dupsift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     min_size: Some(1024),
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod filter;
pub mod hasher;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use filter::{ExtensionFilter, SizeFilter};
pub use hasher::{hash_to_hex, Hash, Hasher};
pub use walker::{sort_by_size_desc, Walker};

/// A file the cascade may compare.
///
/// The size is captured once at discovery and is treated as the file's
/// length for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Absolute, canonical path; the file's identity within a run
    pub path: PathBuf,
    /// Byte length at discovery time
    pub size: u64,
}

impl CandidateFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Controls which files the walker turns into candidates.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Keep zero-byte files. They are dropped by default since every empty
    /// file is trivially a duplicate of every other.
    pub include_empty: bool,

    /// Only keep files whose extension is in this set.
    pub extensions: Option<ExtensionFilter>,

    /// Glob patterns to ignore (gitignore-style), on top of `.gitignore` files.
    pub ignore_patterns: Vec<String>,
}

impl WalkerConfig {
    /// Size bounds as a filter.
    #[must_use]
    pub fn size_filter(&self) -> SizeFilter {
        SizeFilter {
            min: self.min_size,
            max: self.max_size,
            include_empty: self.include_empty,
        }
    }
}

/// Errors raised while discovering candidates.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Any other I/O failure.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Errors raised while reading a file for a probe.
///
/// Cloneable so that one failure can be recorded in the run summary and
/// logged without re-reading the file.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The file vanished between discovery and probing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// The file could not be opened for reading.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Open succeeded but a seek or read failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// The size stage was handed to the probe library.
    #[error("Size is not a content probe: {0}")]
    NotContentProbe(PathBuf),
}

impl HashError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(err),
            },
        }
    }

    /// The file this error belongs to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path)
            | Self::PermissionDenied(path)
            | Self::NotContentProbe(path)
            | Self::Io { path, .. } => path,
        }
    }

    /// Short machine-friendly reason, used in JSON and CSV output.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Io { .. } => "io_error",
            Self::NotContentProbe(_) => "invalid_probe",
        }
    }
}
