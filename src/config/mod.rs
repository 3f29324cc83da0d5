//! Configuration management for `scriptveil.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── transform  # [transform], [transform.builtin]
//! │   └── finish     # [finish]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # Config (this file)
//! ```
//!
//! # Sections
//!
//! | Section               | Purpose                                        |
//! |-----------------------|------------------------------------------------|
//! | `[build]`             | Input and output document paths                |
//! | `[transform]`         | Transform engine, jobs, timeout, command argv  |
//! | `[transform.builtin]` | Builtin mangling and compression switches      |
//! | `[finish]`            | Finisher engine, minification switches, verify |
//!
//! A missing config file is not an error: every value has a default and
//! paths resolve against the current directory.

mod section;
mod types;
mod util;

use util::{find_config_file, normalize_path};

pub use section::{
    BuildConfig, BuiltinConfig, FinishConfig, FinishEngine, TransformConfig, TransformEngine,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{BuildArgs, Cli, Commands, ScanArgs},
    debug, log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name, searched upward from the current directory.
pub const CONFIG_FILE: &str = "scriptveil.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing scriptveil.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative config paths resolve against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Document paths
    pub build: BuildConfig,

    /// Script transform settings
    pub transform: TransformConfig,

    /// Document finisher settings
    pub finish: FinishConfig,
}

impl Config {
    /// Load configuration for the given command line.
    ///
    /// Without `-C`, searches upward from cwd for `scriptveil.toml`. The
    /// config file's directory becomes the root for relative config paths,
    /// while paths given on the command line stay relative to cwd.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Self::load_in(cli, &cwd)
    }

    fn load_in(cli: &Cli, cwd: &Path) -> Result<Self> {
        let config_path = Self::resolve_config_path(cli, cwd)?;

        let mut config = match &config_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        let root = config_path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
        config.set_root(&root);
        config.config_path = config_path;
        config.normalize_paths();
        config.apply_command_options(cli, cwd);
        if let Some(path) = &config.config_path {
            debug!("config"; "using {}", path.display());
        }
        config.validate(&cli.command)?;

        Ok(config)
    }

    /// Resolve the config file: explicit `-C` must exist, the default is optional.
    fn resolve_config_path(cli: &Cli, cwd: &Path) -> Result<Option<PathBuf>> {
        match &cli.config {
            Some(path) => {
                let path = cwd.join(path);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Ok(Some(normalize_path(cwd, &path)))
            }
            None => Ok(find_config_file(Path::new(CONFIG_FILE), cwd)),
        }
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse `{}`", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    #[cfg(test)]
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Get path relative to the config root, for display
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli, cwd: &Path) {
        match &cli.command {
            Commands::Build { args } => self.apply_build_args(args, cwd),
            Commands::Scan { args } => self.apply_scan_args(args, cwd),
        }
    }

    /// Apply build arguments from CLI.
    fn apply_build_args(&mut self, args: &BuildArgs, cwd: &Path) {
        // Set verbose mode globally
        crate::logger::set_verbose(args.verbose);

        if let Some(input) = &args.input {
            self.build.input = normalize_path(cwd, input);
        }
        if let Some(output) = &args.output {
            self.build.output = normalize_path(cwd, output);
        }

        Self::update_option(&mut self.transform.engine, args.engine.as_ref());
        Self::update_option(&mut self.transform.jobs, args.jobs.as_ref());
        Self::update_option(&mut self.finish.engine, args.finish.as_ref());
        Self::update_option(
            &mut self.finish.collapse_whitespace,
            args.collapse_whitespace.as_ref(),
        );
        Self::update_option(&mut self.finish.minify_css, args.minify_css.as_ref());
        Self::update_option(
            &mut self.finish.remove_comments,
            args.remove_comments.as_ref(),
        );
        Self::update_option(&mut self.finish.verify, args.verify.as_ref());
    }

    /// Apply scan arguments from CLI.
    fn apply_scan_args(&mut self, args: &ScanArgs, cwd: &Path) {
        if let Some(input) = &args.input {
            self.build.input = normalize_path(cwd, input);
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve config paths against the root directory.
    fn normalize_paths(&mut self) {
        self.build.input = normalize_path(&self.root, &self.build.input);
        self.build.output = normalize_path(&self.root, &self.build.output);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration for the current command.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self, command: &Commands) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if self.transform.jobs > 256 {
            diag.warn(
                FieldPath::new("transform.jobs"),
                format!("{} worker threads is unusually many", self.transform.jobs),
            );
        }

        // Scan only reads the input; adapters are irrelevant there.
        if let Commands::Build { .. } = command {
            self.build.validate(&mut diag);
            self.transform.validate(&mut diag);
            self.finish.validate(&mut diag);
        }

        diag.print_warnings();

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config content.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
