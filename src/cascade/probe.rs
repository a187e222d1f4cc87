//! Probe kinds, byte windows and fingerprints.
//!
//! A probe reads one window of a file and reduces it to a BLAKE3
//! [`Fingerprint`]. Windows depend only on the file length and the chunk
//! policy, so every file of a size bucket is sampled at the same offsets.
//!
//! For a file of length `len` and chunk `c`, with `w = min(c, len)`:
//!
//! | kind            | start                                 |
//! |-----------------|---------------------------------------|
//! | `front`         | `0`                                   |
//! | `end`           | `len - w`                             |
//! | `middle`        | `(len - w) / 2`                       |
//! | `first_quarter` | `len/4 - c/2`, floored at 0           |
//! | `third_quarter` | `3·len/4 - c/2`, floored at 0         |
//! | `full`          | `0`, covering all `len` bytes         |
//!
//! Quarter windows are shifted left when they would run past the end, so
//! they always span `w` bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::scanner::{hash_to_hex, CandidateFile, Hash, HashError, Hasher};

/// Default window width: 64 KiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 64 * 1024;

/// Files up to this size are read whole under [`ChunkPolicy::Adaptive`].
pub const ADAPTIVE_WHOLE_FILE_LIMIT: u64 = 254 * 1024;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Upper size bound (inclusive) to chunk width, for [`ChunkPolicy::Adaptive`].
const ADAPTIVE_TABLE: &[(u64, u64)] = &[
    (5 * MIB, 64 * KIB),
    (15 * MIB, 128 * KIB),
    (30 * MIB, 256 * KIB),
    (60 * MIB, 512 * KIB),
    (120 * MIB, MIB),
];

const ADAPTIVE_MAX_CHUNK: u64 = 2 * MIB;

/// What a cascade step looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Size,
    Front,
    End,
    Middle,
    FirstQuarter,
    ThirdQuarter,
    Full,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 7] = [
        ProbeKind::Size,
        ProbeKind::Front,
        ProbeKind::End,
        ProbeKind::Middle,
        ProbeKind::FirstQuarter,
        ProbeKind::ThirdQuarter,
        ProbeKind::Full,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ProbeKind::Size => "size",
            ProbeKind::Front => "front",
            ProbeKind::End => "end",
            ProbeKind::Middle => "middle",
            ProbeKind::FirstQuarter => "first_quarter",
            ProbeKind::ThirdQuarter => "third_quarter",
            ProbeKind::Full => "full",
        }
    }

    /// Everything except `size` reads file content.
    #[must_use]
    pub fn is_content(self) -> bool {
        self != ProbeKind::Size
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ProbeKind::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| format!("unknown probe kind '{}'", s))
    }
}

/// How wide the sampled windows are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    /// The same width for every file.
    Fixed(u64),
    /// Width grows with the file size; small files are read whole.
    Adaptive,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        ChunkPolicy::Fixed(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkPolicy {
    /// Chunk width used for files of `len` bytes. Never zero.
    ///
    /// ```
    /// use dupsift::cascade::ChunkPolicy;
    ///
    /// assert_eq!(ChunkPolicy::Fixed(4096).chunk_for(1 << 30), 4096);
    /// assert_eq!(ChunkPolicy::Adaptive.chunk_for(100_000), 100_000);
    /// assert_eq!(ChunkPolicy::Adaptive.chunk_for(10 << 20), 128 * 1024);
    /// ```
    #[must_use]
    pub fn chunk_for(self, len: u64) -> u64 {
        let chunk = match self {
            ChunkPolicy::Fixed(chunk) => chunk,
            ChunkPolicy::Adaptive if len <= ADAPTIVE_WHOLE_FILE_LIMIT => len,
            ChunkPolicy::Adaptive => ADAPTIVE_TABLE
                .iter()
                .find(|(limit, _)| len <= *limit)
                .map_or(ADAPTIVE_MAX_CHUNK, |(_, chunk)| *chunk),
        };
        chunk.max(1)
    }
}

impl fmt::Display for ChunkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkPolicy::Fixed(chunk) => write!(f, "{}", bytesize::ByteSize::b(*chunk)),
            ChunkPolicy::Adaptive => f.write_str("adaptive"),
        }
    }
}

/// A contiguous byte range `[offset, offset + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ByteWindow {
    pub offset: u64,
    pub len: u64,
}

impl ByteWindow {
    #[must_use]
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }

    /// Whether this window spans every byte of a file of `file_len` bytes.
    #[must_use]
    pub fn covers(&self, file_len: u64) -> bool {
        self.offset == 0 && self.len >= file_len
    }
}

/// One step of a cascade plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeDescriptor {
    pub kind: ProbeKind,
    pub chunk: ChunkPolicy,
}

impl ProbeDescriptor {
    #[must_use]
    pub fn new(kind: ProbeKind, chunk: ChunkPolicy) -> Self {
        Self { kind, chunk }
    }

    /// Window read for a file of `len` bytes; `None` for the size stage.
    #[must_use]
    pub fn window(&self, len: u64) -> Option<ByteWindow> {
        let chunk = self.chunk.chunk_for(len);
        let width = chunk.min(len);
        let last_start = len - width;

        let offset = match self.kind {
            ProbeKind::Size => return None,
            ProbeKind::Full => return Some(ByteWindow::new(0, len)),
            ProbeKind::Front => 0,
            ProbeKind::End => last_start,
            ProbeKind::Middle => last_start / 2,
            ProbeKind::FirstQuarter => (len / 4).saturating_sub(chunk / 2),
            ProbeKind::ThirdQuarter => {
                let three_quarters = (u128::from(len) * 3 / 4) as u64;
                three_quarters.saturating_sub(chunk / 2)
            }
        };

        Some(ByteWindow::new(offset.min(last_start), width))
    }
}

/// BLAKE3 digest of one probe window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Hash);

impl Fingerprint {
    #[must_use]
    pub fn from_bytes(hash: Hash) -> Self {
        Self(hash)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hash_to_hex(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Read `window` of `file` and fingerprint it.
///
/// Whole-file probes go through [`Hasher::full_hash`] so large files can be
/// memory-mapped. Returns the fingerprint and the number of bytes read.
///
/// # Errors
///
/// [`HashError`] if the file cannot be opened or read.
pub fn read_window(
    hasher: &Hasher,
    file: &CandidateFile,
    kind: ProbeKind,
    window: ByteWindow,
) -> Result<(Fingerprint, u64), HashError> {
    let (hash, read) = if kind == ProbeKind::Full {
        hasher.full_hash(&file.path)?
    } else {
        hasher.hash_range(&file.path, window.offset, window.len)?
    };
    Ok((Fingerprint(hash), read))
}

/// Fingerprint `file` with `descriptor`, bypassing any cache.
///
/// # Errors
///
/// [`HashError::NotContentProbe`] for the size stage, otherwise any read
/// failure.
pub fn probe(
    hasher: &Hasher,
    file: &CandidateFile,
    descriptor: &ProbeDescriptor,
) -> Result<Fingerprint, HashError> {
    let window = descriptor
        .window(file.size)
        .ok_or_else(|| HashError::NotContentProbe(file.path.clone()))?;
    read_window(hasher, file, descriptor.kind, window).map(|(fingerprint, _)| fingerprint)
}
