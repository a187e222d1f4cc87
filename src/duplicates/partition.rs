//! The cascade partitioner.
//!
//! A size bucket starts as one active group. Each content probe of the plan
//! is applied to every member of every active group at that depth (in
//! parallel), then each group is re-keyed by fingerprint into children.
//! Children with two or more members stay active; singletons are dropped.
//! Whatever is still active once the plan is exhausted is final.
//!
//! Children are emitted in the order their fingerprint was first seen while
//! scanning the parent's members, and parents are visited in order, so the
//! final groups come out in the same order for the same input.
//!
//! A file whose probe fails leaves its group at that depth and is reported
//! in [`BucketReport::failures`]. The rest of the group carries on.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::groups::{DuplicateGroup, SizeBucket};
use crate::cache::{CachedProbe, FileId, FingerprintCache};
use crate::cascade::{CascadePlan, Fingerprint, ProbeKind};
use crate::scanner::{CandidateFile, HashError, Hasher};

/// Counters for one probe stage, for one bucket or merged across buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStats {
    pub kind: ProbeKind,
    /// Active groups entering the stage
    pub groups_in: usize,
    pub files_in: usize,
    /// Groups of 2+ leaving the stage
    pub groups_out: usize,
    pub files_out: usize,
    /// Files split off as singletons
    pub eliminated: usize,
    /// Files whose probe failed
    pub failed: usize,
    pub bytes_read: u64,
    pub cache_hits: u64,
    /// Wall time; summed when merged across buckets
    pub duration: Duration,
}

impl StageStats {
    #[must_use]
    pub fn new(kind: ProbeKind) -> Self {
        Self {
            kind,
            groups_in: 0,
            files_in: 0,
            groups_out: 0,
            files_out: 0,
            eliminated: 0,
            failed: 0,
            bytes_read: 0,
            cache_hits: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn merge(&mut self, other: &StageStats) {
        debug_assert_eq!(self.kind, other.kind);
        self.groups_in += other.groups_in;
        self.files_in += other.files_in;
        self.groups_out += other.groups_out;
        self.files_out += other.files_out;
        self.eliminated += other.eliminated;
        self.failed += other.failed;
        self.bytes_read += other.bytes_read;
        self.cache_hits += other.cache_hits;
        self.duration += other.duration;
    }

    /// Percentage of entering files that this stage ruled out.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.files_in == 0 {
            0.0
        } else {
            (self.eliminated as f64 / self.files_in as f64) * 100.0
        }
    }
}

/// One group in a [`DepthSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceGroup {
    /// Index of the parent group in the previous snapshot
    pub parent: usize,
    pub members: Vec<FileId>,
}

/// Every group produced at one depth, singletons included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthSnapshot {
    pub kind: ProbeKind,
    pub groups: Vec<TraceGroup>,
}

/// Everything one bucket produced.
#[derive(Debug, Clone)]
pub struct BucketReport {
    pub size: u64,
    /// Final groups, in first-seen order
    pub groups: Vec<DuplicateGroup>,
    pub failures: Vec<HashError>,
    /// One entry per content probe actually applied
    pub stages: Vec<StageStats>,
    /// Fingerprints obtained and re-keyed
    pub comparisons: u64,
    /// Filled only when tracing is enabled
    pub trace: Vec<DepthSnapshot>,
}

impl BucketReport {
    fn empty(size: u64) -> Self {
        Self {
            size,
            groups: Vec::new(),
            failures: Vec::new(),
            stages: Vec::new(),
            comparisons: 0,
            trace: Vec::new(),
        }
    }

    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.stages.iter().map(|s| s.bytes_read).sum()
    }
}

struct ActiveGroup {
    fingerprint: Option<Fingerprint>,
    members: Vec<FileId>,
    trace_index: usize,
}

/// Runs a plan over size buckets of one candidate list.
pub struct Partitioner<'a> {
    plan: &'a CascadePlan,
    cache: &'a FingerprintCache,
    hasher: &'a Hasher,
    candidates: &'a [CandidateFile],
    record_trace: bool,
}

impl<'a> Partitioner<'a> {
    #[must_use]
    pub fn new(
        plan: &'a CascadePlan,
        cache: &'a FingerprintCache,
        hasher: &'a Hasher,
        candidates: &'a [CandidateFile],
    ) -> Self {
        Self {
            plan,
            cache,
            hasher,
            candidates,
            record_trace: false,
        }
    }

    /// Record a [`DepthSnapshot`] per depth.
    #[must_use]
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.record_trace = enabled;
        self
    }

    /// Narrow one bucket through every content probe of the plan.
    ///
    /// Runs on the current rayon pool.
    #[must_use]
    pub fn partition(&self, bucket: &SizeBucket) -> BucketReport {
        let mut report = BucketReport::empty(bucket.size);
        if bucket.len() < 2 {
            return report;
        }

        if self.record_trace {
            report.trace.push(DepthSnapshot {
                kind: ProbeKind::Size,
                groups: vec![TraceGroup {
                    parent: 0,
                    members: bucket.members.clone(),
                }],
            });
        }

        let mut active = vec![ActiveGroup {
            fingerprint: None,
            members: bucket.members.clone(),
            trace_index: 0,
        }];

        for descriptor in self.plan.content_steps() {
            if active.is_empty() {
                break;
            }
            let started = Instant::now();
            let mut stage = StageStats::new(descriptor.kind);
            stage.groups_in = active.len();
            stage.files_in = active.iter().map(|g| g.members.len()).sum();

            let readings: Vec<Vec<Result<CachedProbe, HashError>>> = active
                .par_iter()
                .map(|group| {
                    group
                        .members
                        .par_iter()
                        .map(|&id| {
                            self.cache
                                .get_or_compute(self.hasher, id, &self.candidates[id], descriptor)
                        })
                        .collect()
                })
                .collect();

            let mut next = Vec::new();
            let mut snapshot = Vec::new();
            for (group, group_readings) in active.iter().zip(readings) {
                let mut index: HashMap<Fingerprint, usize> = HashMap::new();
                let mut children: Vec<(Fingerprint, Vec<FileId>)> = Vec::new();

                for (&id, reading) in group.members.iter().zip(group_readings) {
                    match reading {
                        Ok(probe) => {
                            stage.bytes_read += probe.bytes_read;
                            stage.cache_hits += u64::from(probe.hit);
                            report.comparisons += 1;
                            let slot = *index.entry(probe.fingerprint).or_insert_with(|| {
                                children.push((probe.fingerprint, Vec::new()));
                                children.len() - 1
                            });
                            children[slot].1.push(id);
                        }
                        Err(err) => {
                            log::warn!("Skipping unreadable file: {}", err);
                            stage.failed += 1;
                            report.failures.push(err);
                        }
                    }
                }

                if children.len() > 1 {
                    log::debug!(
                        "{} probe split a group of {} ({} bytes each) into {}",
                        descriptor.kind,
                        group.members.len(),
                        bucket.size,
                        children.len()
                    );
                }

                for (fingerprint, members) in children {
                    let trace_index = snapshot.len();
                    if self.record_trace {
                        snapshot.push(TraceGroup {
                            parent: group.trace_index,
                            members: members.clone(),
                        });
                    }
                    if members.len() >= 2 {
                        stage.groups_out += 1;
                        stage.files_out += members.len();
                        next.push(ActiveGroup {
                            fingerprint: Some(fingerprint),
                            members,
                            trace_index,
                        });
                    } else {
                        stage.eliminated += members.len();
                    }
                }
            }

            stage.duration = started.elapsed();
            if self.record_trace {
                report.trace.push(DepthSnapshot {
                    kind: descriptor.kind,
                    groups: snapshot,
                });
            }
            report.stages.push(stage);
            active = next;
        }

        let guarantee = self.plan.guarantee_for(bucket.size);
        report.groups = active
            .into_iter()
            .map(|group| {
                DuplicateGroup::new(
                    group.fingerprint.unwrap_or_default(),
                    bucket.size,
                    group
                        .members
                        .iter()
                        .map(|&id| self.candidates[id].path.clone())
                        .collect(),
                    guarantee,
                )
            })
            .collect();

        report
    }
}

/// Fold per-bucket stage counters into run totals, stage by stage.
pub fn merge_stages(totals: &mut Vec<StageStats>, bucket: &[StageStats]) {
    for (i, stage) in bucket.iter().enumerate() {
        match totals.get_mut(i) {
            Some(total) => total.merge(stage),
            None => totals.push(stage.clone()),
        }
    }
}
