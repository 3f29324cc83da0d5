//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! input = "index.html"          # Source document (relative to config root)
//! output = "dist/index.html"    # Finished document (relative to config root)
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source document.
    pub input: PathBuf,

    /// Finished document, written atomically.
    pub output: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input: "index.html".into(),
            output: "dist/index.html".into(),
        }
    }
}

impl BuildConfig {
    const INPUT: FieldPath = FieldPath::new("build.input");
    const OUTPUT: FieldPath = FieldPath::new("build.output");

    /// Validate resolved paths.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.input == self.output {
            diag.error_with_hint(
                Self::OUTPUT,
                format!("{} and {} are the same file", Self::INPUT, Self::OUTPUT),
                "write the finished document somewhere else",
            );
        }
        if self.input.is_dir() {
            diag.error(Self::INPUT, format!("`{}` is a directory", self.input.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.input, PathBuf::from("index.html"));
        assert_eq!(config.build.output, PathBuf::from("dist/index.html"));
    }

    #[test]
    fn test_build_config_paths() {
        let config = test_parse_config("[build]\ninput = \"src/page.html\"\noutput = \"out.html\"");
        assert_eq!(config.build.input, PathBuf::from("src/page.html"));
        assert_eq!(config.build.output, PathBuf::from("out.html"));
    }

    #[test]
    fn test_same_input_and_output_rejected() {
        let build = BuildConfig {
            input: "/site/index.html".into(),
            output: "/site/index.html".into(),
        };
        let mut diag = ConfigDiagnostics::new();
        build.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field, BuildConfig::OUTPUT);
    }
}
