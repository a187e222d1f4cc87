//! Probe definitions and cascade plans.
//!
//! A cascade is an ordered list of probes. The first one is always the file
//! size; every later one fingerprints a byte window of the file. Groups of
//! same-size files are split whenever a probe disagrees, so cheap probes
//! discard most non-duplicates before the expensive ones run.
//!
//! - [`probe`]: probe kinds, byte windows, fingerprints, and reading a window
//! - [`plan`]: the mode table and plan validation
//!
//! ```
//! use dupsift::cascade::{CascadePlan, MatchGuarantee, Mode, ProbeKind};
//!
//! let plan = CascadePlan::for_mode(Mode::Fast);
//! assert_eq!(
//!     plan.kinds(),
//!     vec![ProbeKind::Size, ProbeKind::Front, ProbeKind::End, ProbeKind::Middle]
//! );
//! assert_eq!(plan.guarantee(), MatchGuarantee::Probabilistic);
//! ```

pub mod plan;
pub mod probe;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use plan::{plan_for, CascadePlan, MatchGuarantee, PlanError};
pub use probe::{
    probe, read_window, ByteWindow, ChunkPolicy, Fingerprint, ProbeDescriptor, ProbeKind,
    DEFAULT_CHUNK_SIZE,
};

/// How thorough the cascade is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Size, front, end, middle.
    Fast,
    /// Fast plus the first and third quarter windows.
    #[default]
    Normal,
    /// Fast plus a whole-file hash. Matches are exact.
    Full,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Fast, Mode::Normal, Mode::Full];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Normal => "normal",
            Mode::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown mode name, with the closest valid name when one is near.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{input}'{}", did_you_mean(.suggestion))]
pub struct ParseModeError {
    pub input: String,
    pub suggestion: Option<&'static str>,
}

fn did_you_mean(suggestion: &Option<&'static str>) -> String {
    suggestion
        .map(|s| format!(", did you mean '{s}'?"))
        .unwrap_or_default()
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        if let Some(mode) = Mode::ALL.into_iter().find(|m| m.as_str() == lowered) {
            return Ok(mode);
        }
        let suggestion = Mode::ALL
            .into_iter()
            .map(|m| (m.as_str(), strsim::jaro_winkler(&lowered, m.as_str())))
            .filter(|(_, score)| *score > 0.7)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name);
        Err(ParseModeError {
            input: s.to_string(),
            suggestion,
        })
    }
}
