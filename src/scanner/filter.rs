//! Candidate filters applied while walking.

use std::path::Path;

/// Inclusive size bounds plus the zero-byte switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeFilter {
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub include_empty: bool,
}

impl SizeFilter {
    /// Whether a file of `size` bytes passes.
    ///
    /// An explicit `min` of 0 does not re-admit empty files; only
    /// `include_empty` does.
    #[must_use]
    pub fn accepts(&self, size: u64) -> bool {
        if size == 0 && !self.include_empty {
            return false;
        }
        if self.min.is_some_and(|min| size < min) {
            return false;
        }
        !self.max.is_some_and(|max| size > max)
    }
}

/// Case-insensitive extension allow-list.
///
/// Multi-part extensions such as `tar.gz` match on any suffix of the file
/// name's dot-separated parts, so `backup.TAR.GZ` matches both `tar.gz` and
/// `gz`. With a filter active, hidden files and files without any extension
/// are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    /// Lowercased, without leading dot
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Build a filter from extensions with or without a leading dot.
    ///
    /// Returns `None` when nothing usable remains, meaning "no filter".
    ///
    /// # Example
    ///
    /// ```
    /// use dupsift::scanner::ExtensionFilter;
    ///
    /// let filter = ExtensionFilter::new([".JPG", "tar.gz"]).unwrap();
    /// assert!(filter.matches_name("holiday.jpg"));
    /// assert!(filter.matches_name("src.tar.gz"));
    /// assert!(!filter.matches_name("notes.txt"));
    /// ```
    pub fn new<I, S>(extensions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();

        if normalized.is_empty() {
            None
        } else {
            Some(Self {
                extensions: normalized,
            })
        }
    }

    /// Parse a comma separated list such as `jpg, .png,tar.gz`.
    #[must_use]
    pub fn parse_list(list: &str) -> Option<Self> {
        Self::new(list.split(','))
    }

    /// The normalized extensions, without dots.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.matches_name(&name.to_string_lossy()))
            .unwrap_or(false)
    }

    /// Match a bare file name.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return false;
        }
        let lowered = name.to_lowercase();
        let parts: Vec<&str> = lowered.split('.').collect();
        if parts.len() < 2 {
            return false;
        }
        (1..parts.len()).any(|i| {
            let candidate = parts[i..].join(".");
            self.extensions.iter().any(|ext| *ext == candidate)
        })
    }
}
