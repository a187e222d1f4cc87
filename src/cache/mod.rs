//! Per-run fingerprint memo.
//!
//! Entries are keyed by file and byte window rather than by probe kind.
//! Windows are a pure function of file length and chunk policy, so the key
//! never conflates two different reads, and for files no larger than one
//! chunk every content probe maps to the same window and costs one read.
//!
//! The cache lives for a single run and is dropped with it.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::cascade::{read_window, ByteWindow, Fingerprint, ProbeDescriptor};
use crate::scanner::{CandidateFile, HashError, Hasher};

/// Index of a candidate in the run's candidate list.
pub type FileId = usize;

/// Result of one cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedProbe {
    pub fingerprint: Fingerprint,
    /// Bytes read to answer this lookup; 0 on a hit.
    pub bytes_read: u64,
    pub hit: bool,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub bytes_read: u64,
    pub entries: usize,
}

/// Concurrent `(file, window) -> fingerprint` map. First writer wins.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: DashMap<(FileId, ByteWindow), Fingerprint>,
    hits: AtomicU64,
    misses: AtomicU64,
    bytes_read: AtomicU64,
}

impl FingerprintCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized fingerprint or read the window once.
    ///
    /// The map is not locked while the file is read, so two threads may
    /// race on the same key; both compute the same digest and the first
    /// insert is kept.
    ///
    /// # Errors
    ///
    /// [`HashError`] if the window cannot be read. Failures are not cached.
    pub fn get_or_compute(
        &self,
        hasher: &Hasher,
        id: FileId,
        file: &CandidateFile,
        descriptor: &ProbeDescriptor,
    ) -> Result<CachedProbe, HashError> {
        let window = descriptor
            .window(file.size)
            .ok_or_else(|| HashError::NotContentProbe(file.path.clone()))?;
        let key = (id, window);

        if let Some(fingerprint) = self.entries.get(&key).map(|entry| *entry) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!(
                "Cache hit for {} [{}..{})",
                file.path.display(),
                window.offset,
                window.end()
            );
            return Ok(CachedProbe {
                fingerprint,
                bytes_read: 0,
                hit: true,
            });
        }

        let (computed, read) = read_window(hasher, file, descriptor.kind, window)?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(read, Ordering::Relaxed);

        let fingerprint = *self.entries.entry(key).or_insert(computed);
        Ok(CachedProbe {
            fingerprint,
            bytes_read: read,
            hit: false,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{ChunkPolicy, ProbeKind};
    use std::fs;
    use tempfile::TempDir;

    fn candidate(dir: &TempDir, name: &str, content: &[u8]) -> CandidateFile {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        CandidateFile::new(path, content.len() as u64)
    }

    fn descriptor(kind: ProbeKind) -> ProbeDescriptor {
        ProbeDescriptor::new(kind, ChunkPolicy::Fixed(64))
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let dir = TempDir::new().unwrap();
        let file = candidate(&dir, "a.bin", &[7u8; 500]);
        let cache = FingerprintCache::new();
        let hasher = Hasher::new();

        let first = cache
            .get_or_compute(&hasher, 0, &file, &descriptor(ProbeKind::Middle))
            .unwrap();
        let second = cache
            .get_or_compute(&hasher, 0, &file, &descriptor(ProbeKind::Middle))
            .unwrap();

        assert!(!first.hit);
        assert_eq!(first.bytes_read, 64);
        assert!(second.hit);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                bytes_read: 64,
                entries: 1
            }
        );
    }

    #[test]
    fn test_small_file_windows_share_one_read() {
        let dir = TempDir::new().unwrap();
        let file = candidate(&dir, "small.txt", b"tiny content");
        let cache = FingerprintCache::new();
        let hasher = Hasher::new();

        for kind in [ProbeKind::Front, ProbeKind::End, ProbeKind::Middle, ProbeKind::Full] {
            cache
                .get_or_compute(&hasher, 3, &file, &descriptor(kind))
                .unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.bytes_read, 12);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_windows_are_distinct_entries() {
        let dir = TempDir::new().unwrap();
        let file = candidate(&dir, "big.bin", &[1u8; 1000]);
        let cache = FingerprintCache::new();
        let hasher = Hasher::new();

        cache
            .get_or_compute(&hasher, 0, &file, &descriptor(ProbeKind::Front))
            .unwrap();
        cache
            .get_or_compute(&hasher, 0, &file, &descriptor(ProbeKind::End))
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let file = candidate(&dir, "gone.bin", b"soon deleted");
        fs::remove_file(&file.path).unwrap();

        let cache = FingerprintCache::new();
        let result = cache.get_or_compute(&Hasher::new(), 0, &file, &descriptor(ProbeKind::Front));
        assert!(matches!(result, Err(HashError::NotFound(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_size_probe_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = candidate(&dir, "a.bin", b"abc");
        let cache = FingerprintCache::new();
        let result = cache.get_or_compute(&Hasher::new(), 0, &file, &descriptor(ProbeKind::Size));
        assert!(matches!(result, Err(HashError::NotContentProbe(_))));
    }
}
