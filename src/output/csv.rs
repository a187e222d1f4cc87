//! CSV output for spreadsheets.
//!
//! One row per duplicate file:
//!
//! - `group_id`: 1-based group number, in report order
//! - `fingerprint`: fingerprint of the last probe (hex)
//! - `guarantee`: `exact` or `probabilistic`
//! - `size`: file size in bytes
//! - `path`: the file
//! - `modified`: last modified time (RFC 3339), `unknown` if unavailable
//!
//! `dupsift list` uses [`CandidateCsv`] instead: `size,path`.

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::cascade::MatchGuarantee;
use crate::duplicates::DuplicateGroup;
use crate::scanner::CandidateFile;

#[derive(Debug, Error)]
pub enum CsvOutputError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    fingerprint: &'a str,
    guarantee: MatchGuarantee,
    size: u64,
    path: String,
    modified: String,
}

/// Duplicate groups as CSV.
///
/// ```
/// use dupsift::output::csv::CsvOutput;
///
/// let csv = CsvOutput::new(&[]).to_string().unwrap();
/// assert_eq!(csv, "");
/// ```
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            let fingerprint = group.fingerprint_hex();
            for path in &group.files {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    fingerprint: &fingerprint,
                    guarantee: group.guarantee,
                    size: group.size,
                    path: path.to_string_lossy().into_owned(),
                    modified: modified_time(path),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[derive(Debug, Serialize)]
struct CandidateRow {
    size: u64,
    path: String,
}

/// Candidate listing as CSV.
pub struct CandidateCsv<'a> {
    files: &'a [CandidateFile],
}

impl<'a> CandidateCsv<'a> {
    #[must_use]
    pub fn new(files: &'a [CandidateFile]) -> Self {
        Self { files }
    }

    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for file in self.files {
            csv_writer.serialize(CandidateRow {
                size: file.size,
                path: file.path.to_string_lossy().into_owned(),
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn modified_time(path: &std::path::Path) -> String {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|m| DateTime::<Utc>::from(m).to_rfc3339())
        .unwrap_or_else(|_| "unknown".to_string())
}
