//! Size bucketing and duplicate groups.
//!
//! Bucketing by exact byte length is the first cascade stage. It needs no
//! I/O and usually discards most candidates, since files of different sizes
//! cannot be duplicates.
//!
//! # Example
//!
//! ```
//! use dupsift::duplicates::bucket_by_size;
//! use dupsift::scanner::CandidateFile;
//!
//! let files = vec![
//!     CandidateFile::new("/a.txt", 1024),
//!     CandidateFile::new("/b.txt", 2048),
//!     CandidateFile::new("/c.txt", 1024),
//! ];
//!
//! let (buckets, stats) = bucket_by_size(&files);
//!
//! assert_eq!(buckets.len(), 1);
//! assert_eq!(buckets[0].members, vec![0, 2]);
//! assert_eq!(stats.eliminated_by_size, 1);
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::cache::FileId;
use crate::cascade::{Fingerprint, MatchGuarantee};
use crate::scanner::CandidateFile;

/// Candidates sharing one byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBucket {
    pub size: u64,
    /// Indices into the candidate list, in input order
    pub members: Vec<FileId>,
}

impl SizeBucket {
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Files that matched on every probe of the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Fingerprint from the last probe applied
    pub fingerprint: Fingerprint,
    /// Byte length shared by every member
    pub size: u64,
    /// Member paths, in candidate order
    pub files: Vec<PathBuf>,
    pub guarantee: MatchGuarantee,
}

impl DuplicateGroup {
    #[must_use]
    pub fn new(
        fingerprint: Fingerprint,
        size: u64,
        files: Vec<PathBuf>,
        guarantee: MatchGuarantee,
    ) -> Self {
        Self {
            fingerprint,
            size,
            files,
            guarantee,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Bytes freed by keeping one copy.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Copies beyond the first.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    #[must_use]
    pub fn fingerprint_hex(&self) -> String {
        self.fingerprint.to_hex()
    }

    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.guarantee == MatchGuarantee::Exact
    }
}

/// Outcome of the size stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    pub total_files: usize,
    pub total_size: u64,
    pub unique_sizes: usize,
    /// Buckets with 2+ files
    pub buckets: usize,
    /// Files left in buckets with 2+ files
    pub potential_duplicates: usize,
    /// Files alone in their size
    pub eliminated_by_size: usize,
    pub empty_files: usize,
}

impl GroupingStats {
    /// Percentage of candidates discarded by size alone.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_by_size as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Bucket candidates by exact size.
///
/// Only buckets with at least two members are returned, largest size
/// first. Members keep the order of `files`.
#[must_use]
pub fn bucket_by_size(files: &[CandidateFile]) -> (Vec<SizeBucket>, GroupingStats) {
    let mut by_size: HashMap<u64, Vec<FileId>> = HashMap::new();
    let mut stats = GroupingStats {
        total_files: files.len(),
        ..Default::default()
    };

    for (id, file) in files.iter().enumerate() {
        stats.total_size += file.size;
        if file.size == 0 {
            stats.empty_files += 1;
        }
        by_size.entry(file.size).or_default().push(id);
    }
    stats.unique_sizes = by_size.len();

    let mut buckets: Vec<SizeBucket> = by_size
        .into_iter()
        .filter_map(|(size, members)| {
            if members.len() < 2 {
                stats.eliminated_by_size += members.len();
                return None;
            }
            stats.potential_duplicates += members.len();
            Some(SizeBucket { size, members })
        })
        .collect();
    buckets.sort_by(|a, b| b.size.cmp(&a.size));
    stats.buckets = buckets.len();

    log::debug!(
        "Size stage: {} files in {} sizes, {} buckets, {} eliminated ({:.1}%)",
        stats.total_files,
        stats.unique_sizes,
        stats.buckets,
        stats.eliminated_by_size,
        stats.elimination_rate()
    );

    (buckets, stats)
}
