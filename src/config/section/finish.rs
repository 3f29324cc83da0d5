//! `[finish]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [finish]
//! engine = "builtin"            # builtin | command | none
//! collapse_whitespace = true    # Collapse whitespace between tags
//! minify_css = true             # Minify <style> bodies
//! remove_comments = true        # Drop comments (conditional comments stay)
//! verify = true                 # Fail if a transformed script was altered
//! timeout = 60                  # Seconds per command invocation (0 = no limit)
//! command = ["html-minifier-terser"]
//! ```
//!
//! Scripts are never minified again by the finisher.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{seconds, validate_command};
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::finish::FinishOptions;

/// Document finisher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FinishEngine {
    /// Tokenizer-based markup minifier.
    #[default]
    Builtin,
    /// External minifier over stdin and stdout.
    Command,
    /// Leave the document as assembled.
    #[serde(rename = "none")]
    #[value(name = "none")]
    Disabled,
}

impl FinishEngine {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Command => "command",
            Self::Disabled => "none",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishConfig {
    pub engine: FinishEngine,
    pub collapse_whitespace: bool,
    pub minify_css: bool,
    pub remove_comments: bool,

    /// Check that every transformed script occurs verbatim after finishing.
    pub verify: bool,

    /// Time limit in seconds for the command finisher, `0` for none.
    pub timeout: u64,

    /// Argv of the external minifier.
    pub command: Vec<String>,
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            engine: FinishEngine::default(),
            collapse_whitespace: true,
            minify_css: true,
            remove_comments: true,
            verify: true,
            timeout: 60,
            command: vec!["html-minifier-terser".into()],
        }
    }
}

impl FinishConfig {
    const COMMAND: FieldPath = FieldPath::new("finish.command");
    const COLLAPSE_WHITESPACE: FieldPath = FieldPath::new("finish.collapse_whitespace");

    pub fn options(&self) -> FinishOptions {
        FinishOptions {
            collapse_whitespace: self.collapse_whitespace,
            minify_css: self.minify_css,
            remove_comments: self.remove_comments,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        seconds(self.timeout)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        match self.engine {
            FinishEngine::Command => validate_command(&self.command, Self::COMMAND, diag),
            FinishEngine::Builtin
                if !self.collapse_whitespace && (self.minify_css || self.remove_comments) =>
            {
                diag.warn(
                    Self::COLLAPSE_WHITESPACE,
                    "the builtin finisher always minifies whitespace; set engine = \"none\" to keep it",
                );
            }
            _ => {}
        }
    }
}
