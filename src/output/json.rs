//! JSON output for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00Z",
//!   "duplicates": [
//!     {
//!       "fingerprint": "abc123...",
//!       "size": 1024,
//!       "guarantee": "probabilistic",
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "unreadable": [
//!     { "path": "/path/to/locked", "kind": "permission_denied", "reason": "..." }
//!   ],
//!   "summary": {
//!     "mode": "normal",
//!     "plan": ["size", "front", "end", "middle", "first_quarter", "third_quarter"],
//!     "total_files": 100,
//!     "duplicate_groups": 5,
//!     "reclaimable_space": 51200,
//!     "stages": [ { "probe": "front", "files_in": 40, "eliminated": 12, ... } ],
//!     "exit_code": 0,
//!     "exit_code_name": "DS000"
//!   }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cascade::{MatchGuarantee, Mode, ProbeKind};
use crate::duplicates::{DuplicateGroup, ScanSummary, StageStats, UnreadableFile};
use crate::error::ExitCode;
use crate::scanner::CandidateFile;

#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Fingerprint of the last probe, hex encoded
    pub fingerprint: String,
    pub size: u64,
    pub guarantee: MatchGuarantee,
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            fingerprint: group.fingerprint_hex(),
            size: group.size,
            guarantee: group.guarantee,
            files: group
                .files
                .iter()
                .map(|f| normalize_path(f.as_path()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonStage {
    pub probe: ProbeKind,
    pub groups_in: usize,
    pub files_in: usize,
    pub groups_out: usize,
    pub files_out: usize,
    pub eliminated: usize,
    pub failed: usize,
    pub bytes_read: u64,
    pub cache_hits: u64,
    pub duration_ms: u64,
}

impl From<&StageStats> for JsonStage {
    fn from(stage: &StageStats) -> Self {
        Self {
            probe: stage.kind,
            groups_in: stage.groups_in,
            files_in: stage.files_in,
            groups_out: stage.groups_out,
            files_out: stage.files_out,
            eliminated: stage.eliminated,
            failed: stage.failed,
            bytes_read: stage.bytes_read,
            cache_hits: stage.cache_hits,
            duration_ms: stage.duration.as_millis() as u64,
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub mode: Mode,
    pub plan: Vec<ProbeKind>,
    /// Chunk policy, e.g. `"64.0 KiB"` or `"adaptive"`
    pub chunk: String,
    pub guarantee: Option<MatchGuarantee>,
    pub total_files: usize,
    pub total_size: u64,
    pub size_buckets: usize,
    pub eliminated_by_size: usize,
    pub duplicate_groups: usize,
    /// Duplicate copies, excluding one original per group
    pub duplicate_files: usize,
    pub exact_groups: usize,
    pub reclaimable_space: u64,
    pub bytes_read: u64,
    pub probes_executed: u64,
    pub cache_hits: u64,
    pub fingerprints_compared: u64,
    pub stages: Vec<JsonStage>,
    pub scan_errors: usize,
    pub buckets_skipped: usize,
    pub scan_duration_ms: u64,
    pub interrupted: bool,
    pub exit_code: i32,
    /// Machine-readable exit code name (e.g., "DS000")
    pub exit_code_name: String,
}

impl JsonSummary {
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            mode: summary.mode,
            plan: summary.plan.clone(),
            chunk: summary.chunk_policy.to_string(),
            guarantee: summary.guarantee,
            total_files: summary.total_files,
            total_size: summary.total_size,
            size_buckets: summary.size_buckets,
            eliminated_by_size: summary.eliminated_by_size,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            exact_groups: summary.exact_groups,
            reclaimable_space: summary.reclaimable_space,
            bytes_read: summary.bytes_read,
            probes_executed: summary.probes_executed,
            cache_hits: summary.cache_hits,
            fingerprints_compared: summary.fingerprints_compared,
            stages: summary.stages.iter().map(JsonStage::from).collect(),
            scan_errors: summary.scan_errors.len(),
            buckets_skipped: summary.buckets_skipped,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON document for one run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    pub generated_at: DateTime<Utc>,
    pub duplicates: Vec<JsonDuplicateGroup>,
    pub unreadable: Vec<UnreadableFile>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// # Example
    ///
    /// ```
    /// use dupsift::duplicates::ScanSummary;
    /// use dupsift::error::ExitCode;
    /// use dupsift::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            generated_at: Utc::now(),
            duplicates: groups.iter().map(JsonDuplicateGroup::from).collect(),
            unreadable: summary.unreadable.clone(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Candidate listing for `dupsift list`.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateJson {
    pub total_files: usize,
    pub total_size: u64,
    pub files: Vec<JsonCandidate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonCandidate {
    pub path: String,
    pub size: u64,
}

impl CandidateJson {
    #[must_use]
    pub fn new(files: &[CandidateFile]) -> Self {
        Self {
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            files: files
                .iter()
                .map(|f| JsonCandidate {
                    path: normalize_path(&f.path),
                    size: f.size,
                })
                .collect(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Absolute path where possible; the given path if the file is gone.
pub(crate) fn normalize_path(path: &std::path::Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
