//! `[transform]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [transform]
//! engine = "command"        # builtin | command
//! jobs = 4                  # Parallel transform calls (0 = all cores)
//! timeout = 60              # Seconds per command invocation (0 = no limit)
//! command = ["javascript-obfuscator", "$INPUT", "--output", "$OUTPUT"]
//!
//! [transform.builtin]
//! mangle = true             # Rename local bindings
//! compress = true           # Fold constants, drop dead code
//! top_level = false         # Also rename top-level bindings
//! ```
//!
//! `$INPUT` and `$OUTPUT` are replaced with scratch file paths. Leave them
//! out to pipe the script through stdin and stdout instead.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{seconds, validate_command};
use crate::config::{ConfigDiagnostics, FieldPath};

/// Script transform adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransformEngine {
    /// In-process mangling and compression.
    #[default]
    Builtin,
    /// External program, once per script.
    Command,
}

impl TransformEngine {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Command => "command",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub engine: TransformEngine,

    /// Worker threads for transform calls, `0` for one per core.
    pub jobs: usize,

    /// Time limit in seconds for one command invocation, `0` for none.
    pub timeout: u64,

    /// Argv of the external obfuscator.
    pub command: Vec<String>,

    /// Options of the builtin engine.
    pub builtin: BuiltinConfig,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            engine: TransformEngine::default(),
            jobs: 0,
            timeout: 60,
            command: ["javascript-obfuscator", "$INPUT", "--output", "$OUTPUT"]
                .map(String::from)
                .to_vec(),
            builtin: BuiltinConfig::default(),
        }
    }
}

impl TransformConfig {
    const COMMAND: FieldPath = FieldPath::new("transform.command");

    pub fn timeout(&self) -> Option<Duration> {
        seconds(self.timeout)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.engine == TransformEngine::Command {
            validate_command(&self.command, Self::COMMAND, diag);
        }
    }
}

/// `[transform.builtin]` options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinConfig {
    pub mangle: bool,
    pub compress: bool,
    pub top_level: bool,
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self {
            mangle: true,
            compress: true,
            top_level: false,
        }
    }
}
