//! BLAKE3 hashing of byte ranges and whole files.
//!
//! Partial probes open the file, seek to the window and stream at most the
//! window's length through the hasher. Whole-file probes either stream the
//! same way or, above a size threshold, let BLAKE3 memory-map the file and
//! hash it on the rayon pool. Both paths yield the same digest for the same
//! bytes.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::HashError;

/// A 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Files at least this large are memory-mapped for whole-file probes when
/// mmap is enabled.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

const READ_BUFFER_SIZE: usize = 128 * 1024;

/// Stateless file hasher; cheap to clone and share across threads.
#[derive(Debug, Clone)]
pub struct Hasher {
    use_mmap: bool,
    mmap_threshold: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Streaming-only hasher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            use_mmap: false,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }

    /// Enable memory-mapped multi-threaded hashing for large whole-file probes.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Hash at most `len` bytes starting at `offset`.
    ///
    /// Returns the digest and the number of bytes actually read, which is
    /// smaller than `len` only if the file shrank since discovery. A zero
    /// `len` still opens the file, so vanished files are reported.
    ///
    /// # Errors
    ///
    /// [`HashError`] if the file cannot be opened, seeked or read.
    pub fn hash_range(&self, path: &Path, offset: u64, len: u64) -> Result<(Hash, u64), HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| HashError::from_io(path, e))?;
        }
        let mut hasher = blake3::Hasher::new();
        let read = stream_into(&mut hasher, file.take(len)).map_err(|e| HashError::from_io(path, e))?;
        log::trace!("Hashed {} bytes at {} of {}", read, offset, path.display());
        Ok((*hasher.finalize().as_bytes(), read))
    }

    /// Hash the whole file.
    ///
    /// # Errors
    ///
    /// [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<(Hash, u64), HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let mut hasher = blake3::Hasher::new();
        if self.use_mmap && len >= self.mmap_threshold {
            drop(file);
            log::trace!("Hashing {} via mmap ({} bytes)", path.display(), len);
            hasher
                .update_mmap_rayon(path)
                .map_err(|e| HashError::from_io(path, e))?;
            return Ok((*hasher.finalize().as_bytes(), len));
        }

        let read = stream_into(&mut hasher, file).map_err(|e| HashError::from_io(path, e))?;
        Ok((*hasher.finalize().as_bytes(), read))
    }
}

fn stream_into(hasher: &mut blake3::Hasher, mut reader: impl Read) -> io::Result<u64> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
        total += n as u64;
    }
}

/// Lowercase hex rendering of a digest.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write;
    hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{:02x}", byte);
        out
    })
}
