//! Cascade plans: which probes run, in which order.
//!
//! Modes are rows of [`MODE_TABLE`]. Adding a cascade means adding a row;
//! the partitioner only ever walks a plan's steps.

use std::fmt;

use serde::Serialize;

use super::probe::{ChunkPolicy, ProbeDescriptor, ProbeKind};
use super::Mode;

use ProbeKind::{End, FirstQuarter, Front, Full, Middle, Size, ThirdQuarter};

/// Probe order per mode.
pub const MODE_TABLE: &[(Mode, &[ProbeKind])] = &[
    (Mode::Fast, &[Size, Front, End, Middle]),
    (
        Mode::Normal,
        &[Size, Front, End, Middle, FirstQuarter, ThirdQuarter],
    ),
    (Mode::Full, &[Size, Front, End, Middle, Full]),
];

/// How much a reported group can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchGuarantee {
    /// Every byte was compared.
    Exact,
    /// Only sampled windows were compared; bytes outside them may differ.
    Probabilistic,
}

impl fmt::Display for MatchGuarantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchGuarantee::Exact => "exact",
            MatchGuarantee::Probabilistic => "probabilistic",
        })
    }
}

/// Reasons a custom probe list is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("a cascade must start with the size probe")]
    MissingSize,

    #[error("a cascade needs at least one content probe after size")]
    NoContentProbe,

    #[error("probe '{0}' appears more than once")]
    Repeated(ProbeKind),

    #[error("probe '{0}' must come {1}")]
    Misplaced(ProbeKind, &'static str),

    #[error("{0}")]
    UnknownProbe(String),
}

/// An ordered, validated list of probe descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadePlan {
    steps: Vec<ProbeDescriptor>,
}

impl CascadePlan {
    /// The built-in plan for `mode` with the default 64 KiB chunk.
    #[must_use]
    pub fn for_mode(mode: Mode) -> Self {
        let kinds = MODE_TABLE
            .iter()
            .find(|(m, _)| *m == mode)
            .map_or(&[][..], |(_, kinds)| *kinds);
        Self::build(kinds, ChunkPolicy::default())
    }

    /// Validate and build a plan from probe kinds.
    ///
    /// # Errors
    ///
    /// [`PlanError`] if `size` is not first, a kind repeats, `full` is not
    /// last, or no content probe follows `size`.
    pub fn from_kinds(kinds: &[ProbeKind]) -> Result<Self, PlanError> {
        if kinds.first() != Some(&Size) {
            return Err(PlanError::MissingSize);
        }
        for (i, kind) in kinds.iter().enumerate() {
            if kinds[..i].contains(kind) {
                return Err(PlanError::Repeated(*kind));
            }
            if *kind == Size && i != 0 {
                return Err(PlanError::Misplaced(Size, "first"));
            }
            if *kind == Full && i != kinds.len() - 1 {
                return Err(PlanError::Misplaced(Full, "last"));
            }
        }
        if kinds.len() < 2 {
            return Err(PlanError::NoContentProbe);
        }
        Ok(Self::build(kinds, ChunkPolicy::default()))
    }

    /// Parse a comma separated probe list such as `"size,front,end,full"`.
    ///
    /// ```
    /// use dupsift::cascade::{CascadePlan, MatchGuarantee};
    ///
    /// let plan = CascadePlan::parse_list("size, front, full").unwrap();
    /// assert_eq!(plan.guarantee(), MatchGuarantee::Exact);
    /// assert!(CascadePlan::parse_list("front,size").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// [`PlanError::UnknownProbe`] for an unrecognised name, otherwise as
    /// [`from_kinds`](Self::from_kinds).
    pub fn parse_list(list: &str) -> Result<Self, PlanError> {
        let kinds = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<ProbeKind>().map_err(PlanError::UnknownProbe))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_kinds(&kinds)
    }

    fn build(kinds: &[ProbeKind], chunk: ChunkPolicy) -> Self {
        Self {
            steps: kinds
                .iter()
                .map(|kind| ProbeDescriptor::new(*kind, chunk))
                .collect(),
        }
    }

    /// Same probes, different window widths.
    #[must_use]
    pub fn with_chunk_policy(mut self, chunk: ChunkPolicy) -> Self {
        for step in &mut self.steps {
            step.chunk = chunk;
        }
        self
    }

    /// All steps, starting with `size`.
    #[must_use]
    pub fn steps(&self) -> &[ProbeDescriptor] {
        &self.steps
    }

    /// Steps that read file content, in order.
    pub fn content_steps(&self) -> impl Iterator<Item = &ProbeDescriptor> + '_ {
        self.steps.iter().filter(|step| step.kind.is_content())
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<ProbeKind> {
        self.steps.iter().map(|step| step.kind).collect()
    }

    #[must_use]
    pub fn chunk_policy(&self) -> ChunkPolicy {
        self.steps.first().map(|s| s.chunk).unwrap_or_default()
    }

    #[must_use]
    pub fn ends_with_full(&self) -> bool {
        self.steps.last().is_some_and(|step| step.kind == Full)
    }

    /// Guarantee for the plan as a whole.
    #[must_use]
    pub fn guarantee(&self) -> MatchGuarantee {
        if self.ends_with_full() {
            MatchGuarantee::Exact
        } else {
            MatchGuarantee::Probabilistic
        }
    }

    /// Guarantee for a group of `size`-byte files.
    ///
    /// Files no larger than one window are compared in full by the first
    /// content probe, so their groups are exact in every mode.
    #[must_use]
    pub fn guarantee_for(&self, size: u64) -> MatchGuarantee {
        let whole_file_read = self
            .content_steps()
            .filter_map(|step| step.window(size))
            .any(|window| window.covers(size));
        if self.ends_with_full() || whole_file_read {
            MatchGuarantee::Exact
        } else {
            MatchGuarantee::Probabilistic
        }
    }
}

/// Probe descriptors for `mode`, default chunk policy.
#[must_use]
pub fn plan_for(mode: Mode) -> Vec<ProbeDescriptor> {
    CascadePlan::for_mode(mode).steps().to_vec()
}
