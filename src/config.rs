//! Layered configuration.
//!
//! Values are resolved lowest to highest:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. the TOML config file (`--config`, else the platform config directory)
//! 3. the `[profile.<name>]` table selected with `--profile`
//! 4. `DUPSIFT_*` environment variables (`DUPSIFT_MODE=full`)
//! 5. command-line flags
//!
//! ```toml
//! mode = "normal"
//! chunk_size = "64KiB"
//! io_threads = 4
//! ignore_patterns = ["*.tmp", "node_modules/"]
//!
//! [profile.photos]
//! mode = "full"
//! extensions = ["jpg", "png", "heic"]
//! min_size = "100K"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cascade::{CascadePlan, ChunkPolicy, Mode, DEFAULT_CHUNK_SIZE};
use crate::cli::{parse_size, FilterArgs, OutputFormat, ScanArgs};
use crate::duplicates::FinderConfig;
use crate::scanner::{ExtensionFilter, WalkerConfig};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DUPSIFT_";

/// Resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    /// Custom probe list, e.g. `"size,front,end,full"`. Overrides `mode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probes: Option<String>,
    #[serde(deserialize_with = "de_size")]
    pub chunk_size: u64,
    pub adaptive_chunks: bool,
    pub io_threads: usize,
    pub use_mmap: bool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_opt_size"
    )]
    pub min_size: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_opt_size"
    )]
    pub max_size: Option<u64>,
    pub extensions: Vec<String>,
    pub include_empty: bool,
    pub skip_hidden: bool,
    pub follow_symlinks: bool,
    pub ignore_patterns: Vec<String>,
    pub output: OutputFormat,
    pub stats: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profile: BTreeMap<String, ProfileConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            probes: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            adaptive_chunks: false,
            io_threads: 4,
            use_mmap: true,
            min_size: None,
            max_size: None,
            extensions: Vec::new(),
            include_empty: false,
            skip_hidden: false,
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            output: OutputFormat::Text,
            stats: false,
            profile: BTreeMap::new(),
        }
    }
}

/// A named override set. Unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probes: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_opt_size"
    )]
    pub chunk_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_chunks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_mmap: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_opt_size"
    )]
    pub min_size: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_opt_size"
    )]
    pub max_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_empty: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_patterns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<bool>,
}

/// Sizes may be written as integers or strings like `"64KiB"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Bytes(u64),
    Text(String),
}

impl SizeValue {
    fn into_bytes<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            SizeValue::Bytes(n) => Ok(n),
            SizeValue::Text(s) => parse_size(&s).map_err(E::custom),
        }
    }
}

fn de_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    SizeValue::deserialize(deserializer)?.into_bytes()
}

fn de_opt_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<SizeValue>::deserialize(deserializer)?
        .map(SizeValue::into_bytes)
        .transpose()
}

impl Config {
    /// Default config file location, e.g. `~/.config/dupsift/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupsift", "dupsift")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location), falling back to the
    /// defaults with a warning if the file cannot be parsed.
    #[must_use]
    pub fn load(path: Option<&Path>, profile: Option<&str>) -> Self {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        match path {
            Some(path) => Self::load_from_path(&path, profile),
            None => {
                log::debug!("No config directory available, using defaults");
                Self::load_layers(None, profile).unwrap_or_default()
            }
        }
    }

    /// Like [`try_load_from_path`](Self::try_load_from_path) but never fails.
    #[must_use]
    pub fn load_from_path(path: &Path, profile: Option<&str>) -> Self {
        match Self::try_load_from_path(path, profile) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve defaults, the file at `path` (if it exists), `profile` and
    /// the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment value does not parse.
    pub fn try_load_from_path(path: &Path, profile: Option<&str>) -> Result<Self> {
        Self::load_layers(Some(path), profile)
    }

    fn load_layers(path: Option<&Path>, profile: Option<&str>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            if path.exists() {
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(name) = profile {
            let base: Config = figment
                .extract()
                .context("Failed to parse configuration file")?;
            match base.profile.get(name) {
                Some(overrides) => {
                    log::debug!("Applying profile '{}'", name);
                    figment = figment.merge(Serialized::defaults(overrides));
                }
                None => warn_unknown_profile(name, base.profile.keys()),
            }
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["profile", "config"]))
            .extract()
            .context("Failed to resolve configuration")
    }

    /// Apply the candidate-selection flags given on the command line.
    pub fn merge_filter_args(&mut self, args: &FilterArgs) {
        if args.min_size.is_some() {
            self.min_size = args.min_size;
        }
        if args.max_size.is_some() {
            self.max_size = args.max_size;
        }
        if let Some(list) = &args.extensions {
            self.extensions = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        self.ignore_patterns
            .extend(args.ignore_patterns.iter().cloned());
        self.follow_symlinks |= args.follow_symlinks;
        self.skip_hidden |= args.skip_hidden;
        self.include_empty |= args.include_empty;
        if let Some(output) = args.output {
            self.output = output;
        }
    }

    /// Apply every `scan` flag given on the command line.
    pub fn merge_scan_args(&mut self, args: &ScanArgs) {
        self.merge_filter_args(&args.filter);
        if let Some(mode) = args.mode {
            self.mode = mode;
            self.probes = None;
        }
        if args.probes.is_some() {
            self.probes.clone_from(&args.probes);
        }
        if let Some(chunk) = args.chunk_size {
            self.chunk_size = chunk;
            self.adaptive_chunks = false;
        }
        self.adaptive_chunks |= args.adaptive_chunks;
        if let Some(threads) = args.io_threads {
            self.io_threads = usize::from(threads);
        }
        if args.no_mmap {
            self.use_mmap = false;
        }
        self.stats |= args.stats;
    }

    #[must_use]
    pub fn chunk_policy(&self) -> ChunkPolicy {
        if self.adaptive_chunks {
            ChunkPolicy::Adaptive
        } else {
            ChunkPolicy::Fixed(self.chunk_size.max(1))
        }
    }

    /// The custom plan, if `probes` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe list is invalid.
    pub fn custom_plan(&self) -> Result<Option<CascadePlan>> {
        self.probes
            .as_deref()
            .map(|list| {
                CascadePlan::parse_list(list)
                    .with_context(|| format!("Invalid probe list '{list}'"))
            })
            .transpose()
    }

    #[must_use]
    pub fn to_walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            min_size: self.min_size,
            max_size: self.max_size,
            include_empty: self.include_empty,
            extensions: ExtensionFilter::new(&self.extensions),
            ignore_patterns: self.ignore_patterns.clone(),
        }
    }

    /// Build the finder settings for a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe list is invalid or the size bounds
    /// are inverted.
    pub fn to_finder_config(
        &self,
        shutdown_flag: Option<Arc<AtomicBool>>,
    ) -> Result<FinderConfig> {
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            anyhow::ensure!(
                min <= max,
                "min_size ({min}) is larger than max_size ({max})"
            );
        }

        let mut config = FinderConfig::default()
            .with_mode(self.mode)
            .with_chunk_policy(self.chunk_policy())
            .with_io_threads(self.io_threads)
            .with_mmap(self.use_mmap)
            .with_walker_config(self.to_walker_config());
        if let Some(plan) = self.custom_plan()? {
            config = config.with_plan(plan);
        }
        if let Some(flag) = shutdown_flag {
            config = config.with_shutdown_flag(flag);
        }
        Ok(config)
    }
}

fn warn_unknown_profile<'a>(name: &str, known: impl Iterator<Item = &'a String>) {
    let suggestion = known
        .map(|k| (k, strsim::jaro_winkler(name, k)))
        .filter(|(_, score)| *score > 0.7)
        .max_by(|a, b| a.1.total_cmp(&b.1));
    match suggestion {
        Some((close, _)) => log::warn!(
            "Unknown profile '{}', did you mean '{}'? Using base configuration",
            name,
            close
        ),
        None => log::warn!("Unknown profile '{}', using base configuration", name),
    }
}
