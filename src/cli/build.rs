//! `build` command: run the pipeline and write the finished document.
//!
//! Phases:
//! - **Read** - load the input document
//! - **Run** - locate, transform, reassemble and finish (see `pipeline`)
//! - **Write** - replace the output file atomically
//!
//! The output file is only touched once every phase before it succeeded; a
//! failed run leaves whatever was there before.

use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::Result;
use tempfile::NamedTempFile;

use crate::{
    config::Config,
    debug, log,
    logger::ProgressLine,
    pipeline::{Artifact, Pipeline, PipelineError, RunObserver},
    script::Region,
    utils::plural_count,
};

/// Build the configured document.
pub fn build_document(config: &Config) -> Result<Artifact> {
    let input = &config.build.input;
    let output = &config.build.output;
    let document = read_document(input)?;

    debug!(
        "build";
        "transform `{}`, finish `{}`, jobs {}",
        config.transform.engine.as_str(),
        config.finish.engine.as_str(),
        config.transform.jobs
    );

    let progress = BuildProgress::default();
    let result = Pipeline::from_config(config).run_observed(&document, &progress);
    progress.finish();
    let artifact = result?;

    write_atomic(output, &artifact.html)?;

    log_skipped(&artifact.regions);
    log!(
        "build";
        "{} transformed, wrote {} ({} -> {} bytes)",
        plural_count(artifact.transformed_count(), "script"),
        config.root_relative(output).display(),
        document.len(),
        artifact.html.len()
    );
    Ok(artifact)
}

/// Read the source document.
pub fn read_document(path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => PipelineError::InputNotFound(path.to_path_buf()),
        _ => PipelineError::Io(path.to_path_buf(), err),
    })
}

/// Write `contents` to a temporary file next to `path`, then rename it over `path`.
fn write_atomic(path: &Path, contents: &str) -> Result<(), PipelineError> {
    let io_err = |err: io::Error| PipelineError::Io(path.to_path_buf(), err);

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(contents.as_bytes()).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

fn log_skipped(regions: &[Region]) {
    let skipped: Vec<_> = regions.iter().filter(|r| !r.is_transformable()).collect();
    if skipped.is_empty() {
        return;
    }
    log!("build"; "{} left as-is", plural_count(skipped.len(), "script"));
    for region in skipped {
        debug!("build"; "script #{}: {}", region.index, region.kind);
    }
}

/// Shows `[build] transform(n/total)` while scripts are transformed.
#[derive(Default)]
struct BuildProgress {
    line: OnceLock<ProgressLine>,
}

impl BuildProgress {
    fn finish(self) {
        if let Some(line) = self.line.into_inner() {
            line.finish();
        }
    }
}

impl RunObserver for BuildProgress {
    fn located(&self, regions: &[Region]) {
        let total = regions.iter().filter(|r| r.is_transformable()).count();
        self.line
            .get_or_init(|| ProgressLine::new("build", &[("transform", total)]));
    }

    fn transformed(&self, _index: usize) {
        if let Some(line) = self.line.get() {
            line.inc("transform");
        }
    }
}
