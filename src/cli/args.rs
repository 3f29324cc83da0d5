//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{FinishEngine, TransformEngine};

/// Obfuscate inline scripts of an HTML document and minify the result
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: nearest scriptveil.toml)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Transform inline scripts and write the finished document
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// List the script containers of a document
    #[command(visible_alias = "s")]
    Scan {
        #[command(flatten)]
        args: ScanArgs,
    },
}

/// Build command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Source document (default: `build.input`)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Output document (default: `build.output`)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Script transform engine
    #[arg(short, long, value_enum)]
    pub engine: Option<TransformEngine>,

    /// Worker threads for transform calls (0 = all cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Document finisher
    #[arg(long, value_enum)]
    pub finish: Option<FinishEngine>,

    /// Collapse whitespace between tags
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub collapse_whitespace: Option<bool>,

    /// Minify `<style>` bodies
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify_css: Option<bool>,

    /// Drop comments from the document
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub remove_comments: Option<bool>,

    /// Check that transformed scripts survive finishing
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub verify: Option<bool>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Scan command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// Document to scan (default: `build.input`)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Print regions as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from([
            "scriptveil",
            "-C",
            "site/scriptveil.toml",
            "b",
            "page.html",
            "-o",
            "out.html",
            "-e",
            "command",
            "-j",
            "4",
            "--finish",
            "none",
            "--minify-css=false",
            "--verify",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("site/scriptveil.toml")));
        let Commands::Build { args } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.input, Some(PathBuf::from("page.html")));
        assert_eq!(args.output, Some(PathBuf::from("out.html")));
        assert_eq!(args.engine, Some(TransformEngine::Command));
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.finish, Some(FinishEngine::Disabled));
        assert_eq!(args.minify_css, Some(false));
        assert_eq!(args.verify, Some(true));
        assert_eq!(args.collapse_whitespace, None);
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::parse_from(["scriptveil", "scan", "--json"]);
        let Commands::Scan { args } = cli.command else {
            panic!("expected scan");
        };
        assert!(args.json);
        assert_eq!(args.input, None);
    }
}
