//! Script transform adapters.
//!
//! The pipeline treats a transform as an opaque `payload -> payload` function
//! that may fail. Two adapters ship with the tool:
//!
//! - [`BuiltinTransform`]: in-process mangling/compression with oxc
//! - [`CommandTransform`]: any external obfuscator, run once per script

mod builtin;
mod command;

pub use builtin::BuiltinTransform;
pub use command::CommandTransform;

use anyhow::Result;

use crate::config::{TransformConfig, TransformEngine};

/// Maps one inline script payload to its transformed form.
pub trait Transform: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn transform(&self, payload: &str) -> Result<String>;
}

/// Plain functions and closures are transforms too.
impl<F> Transform for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn transform(&self, payload: &str) -> Result<String> {
        self(payload)
    }
}

/// Build the configured transform adapter.
pub fn from_config(config: &TransformConfig) -> Box<dyn Transform> {
    match config.engine {
        TransformEngine::Builtin => Box::new(BuiltinTransform::new(config.builtin.clone())),
        TransformEngine::Command => Box::new(CommandTransform::new(
            config.command.clone(),
            config.timeout(),
        )),
    }
}
