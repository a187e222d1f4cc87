//! Directory walker built on jwalk.
//!
//! Children are sorted by file name inside every directory, so the
//! candidate order for an unchanged tree is the same on every run. The
//! cascade relies on that for its deterministic group order.
//!
//! ```no_run
//! use dupsift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} candidates", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::filter::SizeFilter;
use super::{CandidateFile, ScanError, WalkerConfig};

/// Recursive candidate discovery for one root.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Stop yielding entries once `flag` is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Root `.gitignore` plus the configured patterns, or `None` if both are empty.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        let gitignore_path = self.root.join(".gitignore");
        if gitignore_path.is_file() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            } else {
                log::debug!("Loaded .gitignore from {}", gitignore_path.display());
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// True if the file or any directory above it (below the root) is ignored.
    fn is_ignored(&self, path: &Path, gitignore: Option<&Gitignore>) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        match path.strip_prefix(&self.root) {
            Ok(relative) => gi.matched_path_or_any_parents(relative, false).is_ignore(),
            Err(_) => gi.matched(path, false).is_ignore(),
        }
    }

    /// Stream candidates under the root.
    ///
    /// Unreadable directories and metadata failures are yielded as errors
    /// and do not stop the walk.
    pub fn walk(&self) -> impl Iterator<Item = Result<CandidateFile, ScanError>> + '_ {
        let gitignore = self.build_gitignore();
        let size_filter = self.config.size_filter();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(|_depth, _path, _state, children| {
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| {
                let stop = self.is_shutdown_requested();
                if stop {
                    log::debug!("Walker: shutdown requested, stopping iteration");
                }
                !stop
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path == self.root || entry.file_type().is_dir() {
                        return None;
                    }
                    if entry.file_type().is_symlink() && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }
                    if self.is_ignored(&path, gitignore.as_ref()) {
                        log::trace!("Ignoring file: {}", path.display());
                        return None;
                    }
                    self.process_file(path, size_filter)
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    Some(Err(ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    }))
                }
            })
    }

    fn process_file(
        &self,
        path: PathBuf,
        size_filter: SizeFilter,
    ) -> Option<Result<CandidateFile, ScanError>> {
        if let Some(extensions) = &self.config.extensions {
            if !extensions.matches(&path) {
                log::trace!("Skipping file due to extension filter: {}", path.display());
                return None;
            }
        }

        let metadata = if self.config.follow_symlinks {
            std::fs::metadata(&path)
        } else {
            std::fs::symlink_metadata(&path)
        };
        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => return Some(Err(self.io_error(&path, e))),
        };
        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if !size_filter.accepts(size) {
            log::trace!("Skipping file due to size filter ({}): {}", size, path.display());
            return None;
        }

        Some(Ok(CandidateFile { path, size }))
    }

    fn io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        let err = ScanError::from_io(path, error);
        match &err {
            ScanError::NotFound(_) => log::debug!("File vanished during walk: {}", path.display()),
            _ => log::warn!("{}", err),
        }
        err
    }
}

/// Order candidates largest first; equal sizes keep their discovery order.
pub fn sort_by_size_desc(files: &mut [CandidateFile]) {
    files.sort_by(|a, b| b.size.cmp(&a.size));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ExtensionFilter;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "file1.txt", b"Hello, world!\n");
        write_file(dir.path(), "file2.log", b"Another file\n");
        write_file(dir.path(), "subdir/nested.txt", b"Nested file content\n");
        write_file(dir.path(), "empty.txt", b"");
        dir
    }

    fn names(files: &[CandidateFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_walker_finds_files_and_skips_empty() {
        let dir = create_test_dir();
        let files: Vec<_> = Walker::new(dir.path(), WalkerConfig::default())
            .walk()
            .filter_map(Result::ok)
            .collect();

        let found = names(&files);
        assert_eq!(files.len(), 3);
        assert!(!found.contains(&"empty.txt".to_string()));
    }

    #[test]
    fn test_walker_include_empty() {
        let dir = create_test_dir();
        let config = WalkerConfig {
            include_empty: true,
            ..Default::default()
        };
        let files: Vec<_> = Walker::new(dir.path(), config)
            .walk()
            .filter_map(Result::ok)
            .collect();
        assert!(names(&files).contains(&"empty.txt".to_string()));
    }

    #[test]
    fn test_walker_order_is_deterministic() {
        let dir = create_test_dir();
        let walk = || -> Vec<CandidateFile> {
            Walker::new(dir.path(), WalkerConfig::default())
                .walk()
                .filter_map(Result::ok)
                .collect()
        };
        assert_eq!(walk(), walk());
    }

    #[test]
    fn test_walker_size_filters() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "small.bin", &[1u8; 10]);
        write_file(dir.path(), "medium.bin", &[1u8; 100]);
        write_file(dir.path(), "large.bin", &[1u8; 1000]);

        let config = WalkerConfig {
            min_size: Some(50),
            max_size: Some(500),
            ..Default::default()
        };
        let files: Vec<_> = Walker::new(dir.path(), config)
            .walk()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(names(&files), vec!["medium.bin"]);
    }

    #[test]
    fn test_walker_extension_filter() {
        let dir = create_test_dir();
        write_file(dir.path(), "archive.TAR.GZ", b"compressed");

        let config = WalkerConfig {
            extensions: ExtensionFilter::parse_list("txt,tar.gz"),
            ..Default::default()
        };
        let mut found = names(
            &Walker::new(dir.path(), config)
                .walk()
                .filter_map(Result::ok)
                .collect::<Vec<_>>(),
        );
        found.sort();
        assert_eq!(found, vec!["archive.TAR.GZ", "file1.txt", "nested.txt"]);
    }

    #[test]
    fn test_walker_skip_hidden() {
        let dir = create_test_dir();
        write_file(dir.path(), ".hidden", b"secret");
        write_file(dir.path(), ".cache/blob.txt", b"cached");

        let config = WalkerConfig {
            skip_hidden: true,
            ..Default::default()
        };
        let found = names(
            &Walker::new(dir.path(), config)
                .walk()
                .filter_map(Result::ok)
                .collect::<Vec<_>>(),
        );
        assert!(!found.contains(&".hidden".to_string()));
        assert!(!found.contains(&"blob.txt".to_string()));
    }

    #[test]
    fn test_walker_ignore_patterns_cover_directories() {
        let dir = create_test_dir();
        write_file(dir.path(), "target/debug/out.txt", b"build output");

        let config = WalkerConfig {
            ignore_patterns: vec!["*.log".to_string(), "target/".to_string()],
            ..Default::default()
        };
        let found = names(
            &Walker::new(dir.path(), config)
                .walk()
                .filter_map(Result::ok)
                .collect::<Vec<_>>(),
        );
        assert!(!found.contains(&"file2.log".to_string()));
        assert!(!found.contains(&"out.txt".to_string()));
        assert!(found.contains(&"file1.txt".to_string()));
    }

    #[test]
    fn test_walker_respects_root_gitignore() {
        let dir = create_test_dir();
        write_file(dir.path(), ".gitignore", b"subdir/\n");

        let found = names(
            &Walker::new(dir.path(), WalkerConfig::default())
                .walk()
                .filter_map(Result::ok)
                .collect::<Vec<_>>(),
        );
        assert!(!found.contains(&"nested.txt".to_string()));
    }

    #[test]
    fn test_walker_shutdown_flag() {
        let dir = create_test_dir();
        let shutdown = Arc::new(AtomicBool::new(true));
        let walker =
            Walker::new(dir.path(), WalkerConfig::default()).with_shutdown_flag(shutdown);
        assert_eq!(walker.walk().count(), 0);
    }

    #[test]
    fn test_walker_handles_nonexistent_path() {
        let walker = Walker::new(
            Path::new("/nonexistent/dupsift/12345"),
            WalkerConfig::default(),
        );
        let results: Vec<_> = walker.walk().collect();
        assert!(results.iter().all(Result::is_err));
    }

    #[test]
    fn test_sort_by_size_desc_is_stable() {
        let mut files = vec![
            CandidateFile::new("a", 10),
            CandidateFile::new("b", 30),
            CandidateFile::new("c", 10),
            CandidateFile::new("d", 20),
        ];
        sort_by_size_desc(&mut files);
        let order: Vec<_> = files.iter().map(|f| f.path.to_string_lossy().into_owned()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }
}
