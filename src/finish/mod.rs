//! Document finishers.
//!
//! A finisher minifies the assembled document after every script has been
//! transformed and re-inserted. Script bodies are opaque to it: there is
//! deliberately no option to minify them again.
//!
//! | Finisher          | `finish.engine` | Notes                                   |
//! |-------------------|-----------------|-----------------------------------------|
//! | `MarkupFinisher`  | `builtin`       | minify-html, JS minification off        |
//! | `CommandFinisher` | `command`       | external minifier over stdin/stdout      |
//! | `NoopFinisher`    | `none`          | returns the document unchanged           |

mod command;
mod markup;

pub use command::CommandFinisher;
pub use markup::MarkupFinisher;

use anyhow::Result;

use crate::config::{FinishConfig, FinishEngine};

/// Minifies a whole assembled document.
pub trait Finisher: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn finish(&self, document: &str) -> Result<String>;
}

/// Markup minification switches. Script minification is always off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishOptions {
    pub collapse_whitespace: bool,
    pub minify_css: bool,
    pub remove_comments: bool,
}

impl FinishOptions {
    /// Every switch off.
    pub const NONE: Self = Self {
        collapse_whitespace: false,
        minify_css: false,
        remove_comments: false,
    };
}

impl Default for FinishOptions {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            minify_css: true,
            remove_comments: true,
        }
    }
}

/// Identity finisher.
pub struct NoopFinisher;

impl Finisher for NoopFinisher {
    fn name(&self) -> &str {
        "none"
    }

    fn finish(&self, document: &str) -> Result<String> {
        Ok(document.to_string())
    }
}

/// Build the configured finisher.
pub fn from_config(config: &FinishConfig) -> Box<dyn Finisher> {
    let options = config.options();
    match config.engine {
        FinishEngine::Builtin => Box::new(MarkupFinisher::new(options)),
        FinishEngine::Command => Box::new(CommandFinisher::new(
            config.command.clone(),
            options,
            config.timeout(),
        )),
        FinishEngine::Disabled => Box::new(NoopFinisher),
    }
}
