//! In-process script transform using oxc.
//!
//! Parses the payload as a classic script, runs the minifier (mangling and
//! compression as configured) and prints it back without comments.
//!
//! Top-level declarations of a classic script are page globals that event
//! handler attributes and other scripts may call, so they are never dropped
//! as unused. `top_level = true` only allows the mangler to rename them.

use anyhow::{Result, bail};
use oxc::allocator::Allocator;
use oxc::ast::ast::Statement;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::Transform;
use crate::config::BuiltinConfig;

pub struct BuiltinTransform {
    options: BuiltinConfig,
}

impl BuiltinTransform {
    pub fn new(options: BuiltinConfig) -> Self {
        Self { options }
    }

    fn minifier_options(&self) -> MinifierOptions {
        MinifierOptions {
            mangle: self.options.mangle.then(|| MangleOptions {
                top_level: Some(self.options.top_level),
                ..MangleOptions::default()
            }),
            compress: self.options.compress.then(CompressOptions::smallest),
        }
    }
}

impl Transform for BuiltinTransform {
    fn name(&self) -> &str {
        "builtin"
    }

    fn transform(&self, payload: &str) -> Result<String> {
        let allocator = Allocator::default();
        // Inline scripts are classic scripts, not modules.
        let source_type = SourceType::script();

        let ret = Parser::new(&allocator, payload, source_type).parse();
        if let Some(error) = ret.errors.first() {
            bail!(
                "failed to parse script ({} error(s)): {error}",
                ret.errors.len()
            );
        }

        let mut program = ret.program;
        let has_code = !program.directives.is_empty()
            || program.body.iter().any(|stmt| {
                !matches!(
                    stmt,
                    Statement::EmptyStatement(_) | Statement::DebuggerStatement(_)
                )
            });

        let ret = Minifier::new(self.minifier_options()).minify(&allocator, &mut program);
        let code = Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(ret.scoping)
            .build(&program)
            .code;

        if has_code && code.trim().is_empty() {
            bail!("minifier removed every statement of the script");
        }
        Ok(code)
    }
}
