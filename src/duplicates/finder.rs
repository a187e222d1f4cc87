//! Run coordinator.
//!
//! Collects candidates, buckets them by size, runs the partitioner on every
//! bucket of two or more files, and folds the per-bucket reports into one
//! [`ScanSummary`]. Buckets run in parallel on a dedicated rayon pool and are
//! merged in bucket order (largest size first), so output order does not
//! depend on scheduling.
//!
//! Cancellation is checked before each bucket starts. Buckets already
//! running finish; the rest are skipped and the summary is marked
//! interrupted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;
use serde::Serialize;

use super::groups::{bucket_by_size, DuplicateGroup};
use super::partition::{merge_stages, BucketReport, Partitioner, StageStats};
use crate::cache::FingerprintCache;
use crate::cascade::{CascadePlan, ChunkPolicy, MatchGuarantee, Mode, ProbeKind};
use crate::progress::ProgressCallback;
use crate::scanner::{CandidateFile, HashError, Hasher, ScanError, Walker, WalkerConfig};

/// Settings for one run.
#[derive(Clone)]
pub struct FinderConfig {
    /// Cascade to run when no custom plan is set.
    pub mode: Mode,
    /// Custom probe order; overrides `mode`.
    pub plan: Option<CascadePlan>,
    pub chunk_policy: ChunkPolicy,
    /// Threads in the probe pool. Default is 4 to keep disks from thrashing.
    pub io_threads: usize,
    /// Memory-map large files for whole-file probes.
    pub use_mmap: bool,
    pub walker_config: WalkerConfig,
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("mode", &self.mode)
            .field("plan", &self.plan.as_ref().map(CascadePlan::kinds))
            .field("chunk_policy", &self.chunk_policy)
            .field("io_threads", &self.io_threads)
            .field("use_mmap", &self.use_mmap)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            plan: None,
            chunk_policy: ChunkPolicy::default(),
            io_threads: 4,
            use_mmap: true,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Run this probe order instead of the mode's.
    #[must_use]
    pub fn with_plan(mut self, plan: CascadePlan) -> Self {
        self.plan = Some(plan);
        self
    }

    #[must_use]
    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }

    /// Fixed window width in bytes (at least 1).
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_policy = ChunkPolicy::Fixed(bytes.max(1));
        self
    }

    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The plan this config runs, with its chunk policy applied.
    #[must_use]
    pub fn resolved_plan(&self) -> CascadePlan {
        self.plan
            .clone()
            .unwrap_or_else(|| CascadePlan::for_mode(self.mode))
            .with_chunk_policy(self.chunk_policy)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// A file dropped from the cascade because it could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableFile {
    pub path: PathBuf,
    /// Short code such as `not_found` or `permission_denied`
    pub kind: &'static str,
    pub reason: String,
}

impl From<&HashError> for UnreadableFile {
    fn from(err: &HashError) -> Self {
        Self {
            path: err.path().to_path_buf(),
            kind: err.reason(),
            reason: err.to_string(),
        }
    }
}

/// Statistics for one run.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Probe order that ran, starting with size
    pub plan: Vec<ProbeKind>,
    pub mode: Mode,
    pub chunk_policy: ChunkPolicy,
    /// `exact` only if the plan ends with a whole-file probe
    pub guarantee: Option<MatchGuarantee>,

    /// Candidates after removing repeated paths
    pub total_files: usize,
    pub total_size: u64,
    /// Size buckets holding 2+ files
    pub size_buckets: usize,
    pub eliminated_by_size: usize,
    /// One entry per content probe, merged across buckets
    pub stages: Vec<StageStats>,

    pub bytes_read: u64,
    /// Windows actually read from disk
    pub probes_executed: u64,
    pub cache_hits: u64,
    pub fingerprints_compared: u64,

    pub duplicate_groups: usize,
    /// Duplicate copies, excluding one original per group
    pub duplicate_files: usize,
    pub reclaimable_space: u64,
    /// Groups whose members were compared byte for byte
    pub exact_groups: usize,

    pub unreadable: Vec<UnreadableFile>,
    /// Walk failures (unreadable directories, metadata errors)
    pub scan_errors: Vec<ScanError>,
    pub buckets_skipped: usize,
    pub scan_duration: Duration,
    pub interrupted: bool,
}

impl ScanSummary {
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    /// Anything was skipped because it could not be read.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.unreadable.is_empty() || !self.scan_errors.is_empty()
    }
}

/// Errors that end a run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Every probe read failed; nothing could be compared.
    #[error("None of the {attempted} candidate files could be read")]
    NoReadableFiles { attempted: usize },

    #[error("Failed to build the probe thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    ScanError(#[from] ScanError),
}

/// Walks, buckets and cascades.
///
/// ```no_run
/// use dupsift::cascade::Mode;
/// use dupsift::duplicates::{DuplicateFinder, FinderConfig};
/// use std::path::Path;
///
/// let finder = DuplicateFinder::new(FinderConfig::default().with_mode(Mode::Full));
/// let (groups, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
///
/// println!("{} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
/// ```
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Hasher::new().with_mmap(config.use_mmap);
        Self { config, hasher }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Scan one directory tree.
    ///
    /// # Errors
    ///
    /// [`FinderError::PathNotFound`] or [`FinderError::NotADirectory`] for a
    /// bad root, [`FinderError::NoReadableFiles`] if no file could be read,
    /// [`FinderError::ThreadPool`] if the pool cannot be built.
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }
        self.find_duplicates_in_paths(vec![path.to_path_buf()])
    }

    /// Scan several roots; each may be a directory or a single file.
    ///
    /// Overlapping roots are fine: a path reached twice is only compared once.
    ///
    /// # Errors
    ///
    /// As for [`find_duplicates`](Self::find_duplicates); a missing root is
    /// [`FinderError::PathNotFound`].
    pub fn find_duplicates_in_paths(
        &self,
        paths: Vec<PathBuf>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let started = Instant::now();
        let (files, scan_errors) = self.collect_candidates(&paths)?;
        let (groups, mut summary) = self.find_duplicates_from_files(files)?;
        summary.scan_errors = scan_errors;
        summary.scan_duration = started.elapsed();
        Ok((groups, summary))
    }

    /// Walk `paths` and return the candidates in discovery order, plus the
    /// walk errors encountered.
    ///
    /// Candidate paths are canonicalized, so a file reached through two
    /// spellings of a root or through a followed symlink is listed under
    /// one path. A path that cannot be resolved becomes a [`ScanError`].
    ///
    /// # Errors
    ///
    /// [`FinderError::PathNotFound`] if a root does not exist.
    pub fn collect_candidates(
        &self,
        paths: &[PathBuf],
    ) -> Result<(Vec<CandidateFile>, Vec<ScanError>), FinderError> {
        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            return Err(FinderError::PathNotFound(missing.clone()));
        }

        let callback = self.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_phase_start("walking", 0);
        }

        let mut files = Vec::new();
        let mut errors = Vec::new();
        for root in paths {
            log::info!("Walking {}", root.display());
            if root.is_file() {
                match self.single_file(root).and_then(|f| f.map(canonical).transpose()) {
                    Ok(Some(file)) => files.push(file),
                    Ok(None) => {}
                    Err(e) => errors.push(e),
                }
                continue;
            }

            let mut walker = Walker::new(root, self.config.walker_config.clone());
            if let Some(flag) = &self.config.shutdown_flag {
                walker = walker.with_shutdown_flag(Arc::clone(flag));
            }
            for entry in walker.walk() {
                match entry.and_then(canonical) {
                    Ok(file) => {
                        files.push(file);
                        if let Some(cb) = callback {
                            cb.on_progress(files.len(), &root.to_string_lossy());
                        }
                    }
                    Err(e) => errors.push(e),
                }
            }
        }

        if let Some(cb) = callback {
            cb.on_phase_end("walking");
        }
        log::info!(
            "Found {} candidate files ({} walk errors)",
            files.len(),
            errors.len()
        );
        Ok((files, errors))
    }

    /// A root given as a plain file still goes through the size and
    /// extension filters.
    fn single_file(&self, path: &Path) -> Result<Option<CandidateFile>, ScanError> {
        let size = std::fs::metadata(path)
            .map_err(|source| ScanError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let walker = &self.config.walker_config;
        let extension_ok = walker
            .extensions
            .as_ref()
            .map_or(true, |ext| ext.matches(path));
        if extension_ok && walker.size_filter().accepts(size) {
            Ok(Some(CandidateFile::new(path, size)))
        } else {
            Ok(None)
        }
    }

    /// Run the cascade over an already filtered candidate list.
    ///
    /// Paths are compared as given; [`collect_candidates`](Self::collect_candidates)
    /// hands over canonical ones. Repeated paths are dropped, keeping the
    /// first occurrence. No per-file error is fatal.
    ///
    /// # Errors
    ///
    /// [`FinderError::NoReadableFiles`] if at least one read was attempted
    /// and every one failed; [`FinderError::ThreadPool`] if the pool cannot
    /// be built.
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<CandidateFile>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let started = Instant::now();
        let plan = self.config.resolved_plan();
        let candidates = dedupe_paths(files);

        let mut summary = ScanSummary {
            plan: plan.kinds(),
            mode: self.config.mode,
            chunk_policy: self.config.chunk_policy,
            guarantee: Some(plan.guarantee()),
            ..Default::default()
        };

        let (buckets, size_stats) = bucket_by_size(&candidates);
        summary.total_files = size_stats.total_files;
        summary.total_size = size_stats.total_size;
        summary.size_buckets = size_stats.buckets;
        summary.eliminated_by_size = size_stats.eliminated_by_size;

        log::info!(
            "Size stage: {} files -> {} candidates in {} buckets ({:.1}% eliminated)",
            size_stats.total_files,
            size_stats.potential_duplicates,
            size_stats.buckets,
            size_stats.elimination_rate()
        );

        if buckets.is_empty() {
            summary.interrupted = self.config.is_shutdown_requested();
            summary.scan_duration = started.elapsed();
            return Ok((Vec::new(), summary));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()?;
        let cache = FingerprintCache::new();
        let partitioner = Partitioner::new(&plan, &cache, &self.hasher, &candidates);
        let callback = self.config.progress_callback.as_ref();
        let finished = AtomicUsize::new(0);

        log::info!(
            "Cascade: {} ({}), chunk {}",
            self.config.plan.as_ref().map_or(self.config.mode.as_str(), |_| "custom"),
            plan.kinds()
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(" -> "),
            self.config.chunk_policy
        );
        if let Some(cb) = callback {
            cb.on_phase_start("cascade", buckets.len());
        }

        let reports: Vec<Option<BucketReport>> = pool.install(|| {
            buckets
                .par_iter()
                .map(|bucket| {
                    if self.config.is_shutdown_requested() {
                        return None;
                    }
                    let report = partitioner.partition(bucket);
                    let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(cb) = callback {
                        cb.on_item_completed(report.bytes_read());
                        cb.on_progress(
                            done,
                            &format!("{} x {}", bucket.len(), ByteSize::b(bucket.size)),
                        );
                    }
                    Some(report)
                })
                .collect()
        });

        if let Some(cb) = callback {
            cb.on_phase_end("cascade");
        }

        let mut groups = Vec::new();
        let mut failures = 0usize;
        for report in reports {
            let Some(report) = report else {
                summary.buckets_skipped += 1;
                continue;
            };
            merge_stages(&mut summary.stages, &report.stages);
            summary.fingerprints_compared += report.comparisons;
            failures += report.failures.len();
            summary
                .unreadable
                .extend(report.failures.iter().map(UnreadableFile::from));
            groups.extend(report.groups);
        }

        if summary.fingerprints_compared == 0 && failures > 0 {
            return Err(FinderError::NoReadableFiles {
                attempted: failures,
            });
        }

        let cache_stats = cache.stats();
        summary.bytes_read = cache_stats.bytes_read;
        summary.probes_executed = cache_stats.misses;
        summary.cache_hits = cache_stats.hits;

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        summary.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
        summary.exact_groups = groups.iter().filter(|g| g.is_exact()).count();
        summary.interrupted = summary.buckets_skipped > 0 || self.config.is_shutdown_requested();
        summary.scan_duration = started.elapsed();

        if summary.interrupted {
            log::warn!(
                "Interrupted: {} of {} buckets skipped, results are partial",
                summary.buckets_skipped,
                buckets.len()
            );
        }
        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable, {} read, {} unreadable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            ByteSize::b(summary.bytes_read),
            summary.unreadable.len()
        );

        Ok((groups, summary))
    }
}

fn canonical(file: CandidateFile) -> Result<CandidateFile, ScanError> {
    let path = std::fs::canonicalize(&file.path).map_err(|e| ScanError::from_io(&file.path, e))?;
    Ok(CandidateFile { path, ..file })
}

fn dedupe_paths(files: Vec<CandidateFile>) -> Vec<CandidateFile> {
    let before = files.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<CandidateFile> = files
        .into_iter()
        .filter(|file| seen.insert(file.path.clone()))
        .collect();
    if unique.len() < before {
        log::debug!("Dropped {} repeated candidate paths", before - unique.len());
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn names(group: &DuplicateGroup) -> Vec<String> {
        group
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_find_duplicates_basic() {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "a.txt", b"duplicate content");
        create_test_file(&dir, "b.txt", b"duplicate content");
        create_test_file(&dir, "c.txt", b"something else entirely");

        let (groups, summary) = DuplicateFinder::with_defaults()
            .find_duplicates(dir.path())
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["a.txt", "b.txt"]);
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.duplicate_files, 1);
        assert_eq!(summary.reclaimable_space, 17);
        assert_eq!(summary.mode, Mode::Normal);
        assert!(!summary.interrupted);
    }

    #[test]
    fn test_find_duplicates_rejects_bad_roots() {
        let dir = TempDir::new().unwrap();
        let file = create_test_file(&dir, "file.txt", b"x");

        let finder = DuplicateFinder::with_defaults();
        assert!(matches!(
            finder.find_duplicates(&dir.path().join("missing")),
            Err(FinderError::PathNotFound(_))
        ));
        assert!(matches!(
            finder.find_duplicates(&file),
            Err(FinderError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_groups_ordered_by_size_descending() {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "s1", b"ab");
        create_test_file(&dir, "s2", b"ab");
        create_test_file(&dir, "l1", b"abcdef");
        create_test_file(&dir, "l2", b"abcdef");

        let (groups, _) = DuplicateFinder::with_defaults()
            .find_duplicates(dir.path())
            .unwrap();
        let sizes: Vec<u64> = groups.iter().map(|g| g.size).collect();
        assert_eq!(sizes, vec![6, 2]);
    }

    #[test]
    fn test_repeated_paths_are_compared_once() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a", b"solo");
        let files = vec![CandidateFile::new(&a, 4), CandidateFile::new(&a, 4)];

        let (groups, summary) = DuplicateFinder::with_defaults()
            .find_duplicates_from_files(files)
            .unwrap();
        assert!(groups.is_empty());
        assert_eq!(summary.total_files, 1);
    }

    #[test]
    fn test_overlapping_roots() {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "sub/a", b"same");
        create_test_file(&dir, "sub/b", b"same");

        let (groups, summary) = DuplicateFinder::with_defaults()
            .find_duplicates_in_paths(vec![dir.path().to_path_buf(), dir.path().join("sub")])
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(summary.total_files, 2);
    }

    #[test]
    fn test_file_roots_are_candidates() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a.bin", b"payload");
        let b = create_test_file(&dir, "b.bin", b"payload");

        let (groups, _) = DuplicateFinder::with_defaults()
            .find_duplicates_in_paths(vec![a, b])
            .unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_permission_denied_reason_reaches_summary() {
        let locked = Path::new("/srv/locked.bin");
        let err = HashError::from_io(
            locked,
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        let entry = UnreadableFile::from(&err);

        assert_eq!(entry.path, locked);
        assert_eq!(entry.kind, "permission_denied");
        assert_eq!(entry.reason, "Permission denied: /srv/locked.bin");
    }

    #[test]
    fn test_collected_paths_are_canonical() {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "sub/a", b"same");
        let dotted = dir.path().join("sub").join("..").join("sub");

        let finder = DuplicateFinder::with_defaults();
        let (files, errors) = finder
            .collect_candidates(&[dir.path().join("sub"), dotted])
            .unwrap();

        assert!(errors.is_empty());
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, files[1].path);
        assert_eq!(files[0].path, dir.path().join("sub/a").canonicalize().unwrap());
    }

    #[test]
    fn test_all_reads_failing_is_fatal() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a", b"gone");
        let b = create_test_file(&dir, "b", b"gone");
        let files = vec![CandidateFile::new(&a, 4), CandidateFile::new(&b, 4)];
        fs::remove_file(&a).unwrap();
        fs::remove_file(&b).unwrap();

        let result = DuplicateFinder::with_defaults().find_duplicates_from_files(files);
        assert!(matches!(
            result,
            Err(FinderError::NoReadableFiles { attempted: 2 })
        ));
    }

    #[test]
    fn test_shutdown_before_start_skips_all_buckets() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(&dir, "a", b"same");
        let b = create_test_file(&dir, "b", b"same");
        let files = vec![CandidateFile::new(a, 4), CandidateFile::new(b, 4)];

        let flag = Arc::new(AtomicBool::new(true));
        let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(flag));
        let (groups, summary) = finder.find_duplicates_from_files(files).unwrap();

        assert!(groups.is_empty());
        assert!(summary.interrupted);
        assert_eq!(summary.buckets_skipped, 1);
    }

    #[test]
    fn test_custom_plan_overrides_mode() {
        let plan = CascadePlan::from_kinds(&[ProbeKind::Size, ProbeKind::Full]).unwrap();
        let config = FinderConfig::default().with_mode(Mode::Fast).with_plan(plan);
        assert_eq!(
            config.resolved_plan().kinds(),
            vec![ProbeKind::Size, ProbeKind::Full]
        );
        assert_eq!(config.resolved_plan().guarantee(), MatchGuarantee::Exact);
    }

    struct Recorder(Mutex<Vec<String>>);

    impl ProgressCallback for Recorder {
        fn on_phase_start(&self, phase: &str, total: usize) {
            self.0.lock().unwrap().push(format!("start {phase} {total}"));
        }
        fn on_progress(&self, _current: usize, _label: &str) {}
        fn on_phase_end(&self, phase: &str) {
            self.0.lock().unwrap().push(format!("end {phase}"));
        }
    }

    #[test]
    fn test_progress_phases() {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "a", b"same");
        create_test_file(&dir, "b", b"same");

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let config = FinderConfig::default().with_progress_callback(recorder.clone());
        DuplicateFinder::new(config)
            .find_duplicates(dir.path())
            .unwrap();

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start walking 0", "end walking", "start cascade 1", "end cascade"]
        );
    }

    #[test]
    fn test_summary_counts_io() {
        let dir = TempDir::new().unwrap();
        let content = vec![9u8; 200_000];
        create_test_file(&dir, "a", &content);
        create_test_file(&dir, "b", &content);

        let config = FinderConfig::default().with_mode(Mode::Fast);
        let (groups, summary) = DuplicateFinder::new(config)
            .find_duplicates(dir.path())
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].guarantee, MatchGuarantee::Probabilistic);
        assert_eq!(summary.probes_executed, 6);
        assert_eq!(summary.bytes_read, 6 * 64 * 1024);
        assert_eq!(summary.fingerprints_compared, 6);
        assert_eq!(summary.stages.len(), 3);
        assert_eq!(summary.exact_groups, 0);
    }
}
