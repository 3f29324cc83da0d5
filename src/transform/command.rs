//! External command transform.
//!
//! Runs a configured argv once per script. `$INPUT` and `$OUTPUT` in the
//! arguments are replaced with paths of scratch files:
//!
//! ```toml
//! [transform]
//! engine = "command"
//! command = ["javascript-obfuscator", "$INPUT", "--output", "$OUTPUT"]
//! ```
//!
//! Without `$INPUT` the payload is piped on stdin; without `$OUTPUT` the
//! result is read from stdout. Scratch files live in a per-call temporary
//! directory that is removed when the call returns, on success or failure.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::Transform;
use crate::utils::exec::{Cmd, NODE_FILTER};

pub const INPUT_VAR: &str = "$INPUT";
pub const OUTPUT_VAR: &str = "$OUTPUT";

pub struct CommandTransform {
    argv: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandTransform {
    pub fn new(argv: Vec<String>, timeout: Option<Duration>) -> Self {
        Self { argv, timeout }
    }

    fn uses(&self, var: &str) -> bool {
        self.argv.iter().skip(1).any(|arg| arg.contains(var))
    }
}

/// Replace `$INPUT` / `$OUTPUT` in command arguments.
pub fn resolve_args(args: &[String], input: &Path, output: &Path) -> Vec<String> {
    let input = input.display().to_string();
    let output = output.display().to_string();
    args.iter()
        .map(|arg| arg.replace(INPUT_VAR, &input).replace(OUTPUT_VAR, &output))
        .collect()
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        self.argv.first().map_or("command", String::as_str)
    }

    fn transform(&self, payload: &str) -> Result<String> {
        if self.argv.is_empty() {
            bail!("no transform command configured");
        }

        let scratch = tempfile::Builder::new()
            .prefix("scriptveil-")
            .tempdir()
            .context("Failed to create scratch directory")?;
        let input = scratch.path().join("input.js");
        let output = scratch.path().join("output.js");

        let args = resolve_args(&self.argv, &input, &output);
        let mut cmd = Cmd::from_slice(&args)
            .timeout(self.timeout)
            .filter(&NODE_FILTER);
        if self.uses(INPUT_VAR) {
            fs::write(&input, payload)
                .with_context(|| format!("Failed to write `{}`", input.display()))?;
        } else {
            cmd = cmd.stdin(payload);
        }

        let result = cmd.run()?;
        let code = if self.uses(OUTPUT_VAR) {
            fs::read_to_string(&output)
                .with_context(|| format!("`{}` did not write its output file", self.name()))?
        } else {
            String::from_utf8(result.stdout)
                .with_context(|| format!("`{}` printed non-UTF-8 output", self.name()))?
        };

        if code.trim().is_empty() {
            bail!("`{}` produced no output", self.name());
        }
        Ok(code.trim_end_matches(['\n', '\r']).to_string())
    }
}
