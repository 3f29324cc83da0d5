//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error from an adapter or finisher.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a run. No output is written once one is raised.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input document `{}` not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("IO error on `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("no transformable inline script found ({scripts} script element(s) left as-is)")]
    NoTransformableContent { scripts: usize },

    #[error("script #{index}: transform `{adapter}` failed")]
    AdapterFailure {
        index: usize,
        adapter: String,
        #[source]
        source: BoxError,
    },

    #[error("script #{index}: marker has no resolved result")]
    MissingResolvedResult { index: usize },

    #[error("script #{index}: resolved result has no marker in the document")]
    MarkerMissing { index: usize },

    #[error("finisher `{finisher}` failed{}", on_script(.index))]
    FinisherFailure {
        finisher: String,
        index: Option<usize>,
        #[source]
        source: BoxError,
    },

    #[error("failed to start transform workers")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

fn on_script(index: &Option<usize>) -> String {
    index
        .map(|i| format!(" on script #{i}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::AdapterFailure {
            index: 1,
            adapter: "command".into(),
            source: "exit status 2".into(),
        };
        assert_eq!(err.to_string(), "script #1: transform `command` failed");
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("exit status 2".to_string())
        );

        let err = PipelineError::FinisherFailure {
            finisher: "builtin".into(),
            index: Some(4),
            source: "altered".into(),
        };
        assert_eq!(err.to_string(), "finisher `builtin` failed on script #4");

        let err = PipelineError::FinisherFailure {
            finisher: "command".into(),
            index: None,
            source: "exit".into(),
        };
        assert_eq!(err.to_string(), "finisher `command` failed");
    }

    #[test]
    fn test_input_not_found_display() {
        let err = PipelineError::InputNotFound(PathBuf::from("index.html"));
        assert!(err.to_string().contains("index.html"));
    }
}
