//! Duplicate detection.
//!
//! - [`groups`]: size bucketing and the [`DuplicateGroup`] result type
//! - [`partition`]: the per-bucket cascade state machine
//! - [`finder`]: the run coordinator tying walk, buckets and cascade together

pub mod finder;
pub mod groups;
pub mod partition;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary, UnreadableFile};
pub use groups::{bucket_by_size, DuplicateGroup, GroupingStats, SizeBucket};
pub use partition::{
    merge_stages, BucketReport, DepthSnapshot, Partitioner, StageStats, TraceGroup,
};
