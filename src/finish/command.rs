//! External minifier finisher.
//!
//! The document is piped through the configured argv and the result read
//! from stdout. Option flags follow html-minifier conventions and are
//! appended after the configured arguments:
//!
//! ```toml
//! [finish]
//! engine = "command"
//! command = ["html-minifier-terser"]
//! ```

use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::{FinishOptions, Finisher};
use crate::utils::exec::{Cmd, NODE_FILTER};

pub struct CommandFinisher {
    argv: Vec<String>,
    options: FinishOptions,
    timeout: Option<Duration>,
}

impl CommandFinisher {
    pub fn new(argv: Vec<String>, options: FinishOptions, timeout: Option<Duration>) -> Self {
        Self {
            argv,
            options,
            timeout,
        }
    }

    /// Configured argv plus option flags.
    fn args(&self) -> Vec<String> {
        let mut args = self.argv.clone();
        if self.options.collapse_whitespace {
            args.push("--collapse-whitespace".into());
        }
        if self.options.remove_comments {
            args.push("--remove-comments".into());
        }
        if self.options.minify_css {
            args.extend(["--minify-css".into(), "true".into()]);
        }
        // Scripts are already transformed; minifying them again could undo it.
        args.extend(["--minify-js".into(), "false".into()]);
        args
    }
}

impl Finisher for CommandFinisher {
    fn name(&self) -> &str {
        self.argv.first().map_or("command", String::as_str)
    }

    fn finish(&self, document: &str) -> Result<String> {
        if self.argv.is_empty() {
            bail!("no finish command configured");
        }

        let output = Cmd::from_slice(&self.args())
            .stdin(document)
            .timeout(self.timeout)
            .filter(&NODE_FILTER)
            .run()?;
        let html = String::from_utf8(output.stdout)
            .with_context(|| format!("`{}` printed non-UTF-8 output", self.name()))?;

        if html.trim().is_empty() && !document.trim().is_empty() {
            bail!("`{}` produced no output", self.name());
        }
        Ok(html)
    }
}
