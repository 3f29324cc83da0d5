//! Script protection pipeline.
//!
//! Turns one HTML document into its finished form:
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌───────────────────┐   ┌────────┐   ┌────────┐
//! │  locate  │──▶│ encode │──▶│ transform (rayon) │──▶│ decode │──▶│ finish │──▶ verify
//! └──────────┘   └────────┘   │   + guard         │   └────────┘   └────────┘
//!                             └───────────────────┘
//! ```
//!
//! Stages run strictly in order; only the transform calls run in parallel,
//! on a pool bounded by `jobs`. Every failure aborts the run and nothing is
//! returned but the error.

mod context;
mod error;

pub use context::RunContext;
pub use error::PipelineError;

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::debug;
use crate::finish::{self, Finisher, NoopFinisher};
use crate::script::{Extraction, Region, escape_closing_tag, locate};
use crate::transform::{self, Transform};

/// Receives progress events from a run.
///
/// `transformed` is called from worker threads.
pub trait RunObserver: Sync {
    /// Every script container of the document, in order.
    fn located(&self, _regions: &[Region]) {}

    /// Region `index` went through the transform.
    fn transformed(&self, _index: usize) {}
}

/// Observer that ignores every event.
pub struct Silent;

impl RunObserver for Silent {}

/// Result of a successful run.
#[derive(Debug)]
pub struct Artifact {
    /// Finished document.
    pub html: String,
    /// Every script container found in the source document.
    pub regions: Vec<Region>,
}

impl Artifact {
    /// Number of regions that went through the transform.
    pub fn transformed_count(&self) -> usize {
        self.regions.iter().filter(|r| r.is_transformable()).count()
    }
}

pub struct Pipeline<'a> {
    transform: Box<dyn Transform + 'a>,
    finisher: Box<dyn Finisher + 'a>,
    jobs: usize,
    verify: bool,
}

impl<'a> Pipeline<'a> {
    /// Pipeline with the given transform, no finisher and one worker per core.
    pub fn new(transform: Box<dyn Transform + 'a>) -> Self {
        Self {
            transform,
            finisher: Box::new(NoopFinisher),
            jobs: 0,
            verify: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(transform::from_config(&config.transform))
            .finisher(finish::from_config(&config.finish))
            .jobs(config.transform.jobs)
            .verify(config.finish.verify)
    }

    pub fn finisher(mut self, finisher: Box<dyn Finisher + 'a>) -> Self {
        self.finisher = finisher;
        self
    }

    /// Worker threads for transform calls, `0` for one per core.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Check that every transformed payload survives the finisher verbatim.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn run(&self, document: &str) -> Result<Artifact, PipelineError> {
        self.run_observed(document, &Silent)
    }

    pub fn run_observed(
        &self,
        document: &str,
        observer: &dyn RunObserver,
    ) -> Result<Artifact, PipelineError> {
        let extraction = locate(document);
        observer.located(&extraction.regions);

        let count = extraction.transformable_count();
        if count == 0 {
            return Err(PipelineError::NoTransformableContent {
                scripts: extraction.regions.len(),
            });
        }
        let ctx = RunContext::new(document);
        debug!(
            "build";
            "{} script(s), {} to transform, marker nonce {}",
            extraction.regions.len(),
            count,
            ctx.codec().nonce()
        );

        let encoded = ctx.codec().encode(&extraction);

        self.transform_all(&extraction, &ctx, observer)?;

        let (codec, resolved) = ctx.into_parts();
        let assembled = codec.decode(&encoded, &resolved)?;

        let html = self
            .finisher
            .finish(&assembled)
            .map_err(|err| PipelineError::FinisherFailure {
                finisher: self.finisher.name().to_string(),
                index: None,
                source: err.into(),
            })?;

        if self.verify {
            self.verify_finished(&html, &extraction, &resolved)?;
        }

        Ok(Artifact {
            html,
            regions: extraction.regions,
        })
    }

    /// Check that every transformed script reached `html` byte-for-byte.
    ///
    /// Script containers are matched by position, so the finisher must keep
    /// every `<script>` element and its order.
    fn verify_finished(
        &self,
        html: &str,
        source: &Extraction,
        resolved: &FxHashMap<usize, String>,
    ) -> Result<(), PipelineError> {
        let finished = locate(html);
        let failure = |index, message: String| PipelineError::FinisherFailure {
            finisher: self.finisher.name().to_string(),
            index,
            source: message.into(),
        };

        if finished.regions.len() != source.regions.len() {
            return Err(failure(
                None,
                format!(
                    "script element count changed from {} to {}",
                    source.regions.len(),
                    finished.regions.len()
                ),
            ));
        }

        for region in source.transformable() {
            let expected = resolved.get(&region.index).map_or("", String::as_str);
            if finished.regions[region.index].payload != expected {
                return Err(failure(
                    Some(region.index),
                    "transformed script was altered by the finisher".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Transform and guard every transformable region into `ctx`.
    ///
    /// After the first failure no new transform calls start. The reported
    /// failure is the one with the lowest region index.
    fn transform_all(
        &self,
        extraction: &Extraction,
        ctx: &RunContext,
        observer: &dyn RunObserver,
    ) -> Result<(), PipelineError> {
        let regions: Vec<&Region> = extraction.transformable().collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("scriptveil-transform-{i}"))
            .build()?;
        let aborted = AtomicBool::new(false);

        let results: Vec<Result<(), PipelineError>> = pool.install(|| {
            regions
                .par_iter()
                .map(|region| {
                    if aborted.load(Ordering::Relaxed) {
                        return Ok(());
                    }
                    self.transform_one(region, ctx).inspect_err(|_| {
                        aborted.store(true, Ordering::Relaxed);
                    })?;
                    observer.transformed(region.index);
                    Ok(())
                })
                .collect()
        });

        results.into_iter().collect()
    }

    fn transform_one(&self, region: &Region, ctx: &RunContext) -> Result<(), PipelineError> {
        let output = self
            .transform
            .transform(&region.payload)
            .map_err(|err| PipelineError::AdapterFailure {
                index: region.index,
                adapter: self.transform.name().to_string(),
                source: err.into(),
            })?;

        let guarded = escape_closing_tag(&output).into_owned();
        debug!(
            "transform";
            "script #{}: {} -> {} bytes",
            region.index,
            region.payload.len(),
            guarded.len()
        );
        ctx.resolve(region.index, guarded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finish::{FinishOptions, MarkupFinisher};
    use anyhow::{Result, bail};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn upper(payload: &str) -> Result<String> {
        Ok(payload.trim().to_uppercase())
    }

    #[test]
    fn test_inline_and_external() {
        let calls = AtomicUsize::new(0);
        let transform = |payload: &str| -> Result<String> {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(format!("obf({payload})"))
        };
        let html = "<body><script>alert(1)</script><script src=\"a.js\"></script></body>";

        let artifact = Pipeline::new(Box::new(transform)).run(html).unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(
            artifact.html,
            "<body><script>obf(alert(1))</script><script src=\"a.js\"></script></body>"
        );
        assert_eq!(artifact.regions.len(), 2);
        assert_eq!(artifact.transformed_count(), 1);
    }

    #[test]
    fn test_pass_through_containers_unchanged() {
        let html = concat!(
            "<script type=\"application/ld+json\">{\"a\": 1}</script>\n",
            "<script>  </script>\n",
            "<script type=\"module\">import x from './x.js'</script>\n",
            "<script type=\"text/javascript\">go()</script>\n",
        );
        let artifact = Pipeline::new(Box::new(upper)).run(html).unwrap();
        assert_eq!(
            artifact.html,
            concat!(
                "<script type=\"application/ld+json\">{\"a\": 1}</script>\n",
                "<script>  </script>\n",
                "<script type=\"module\">import x from './x.js'</script>\n",
                "<script type=\"text/javascript\">GO()</script>\n",
            )
        );
    }

    #[test]
    fn test_failure_reports_region() {
        let fail_second = |payload: &str| -> Result<String> {
            if payload == "b()" {
                bail!("exit status 2");
            }
            Ok(payload.to_string())
        };
        let html = "<script>a()</script><script>b()</script><script>c()</script>";

        let err = Pipeline::new(Box::new(fail_second))
            .jobs(1)
            .run(html)
            .unwrap_err();

        assert!(matches!(err, PipelineError::AdapterFailure { index: 1, .. }));
        assert!(err.to_string().contains("#1"));
    }

    #[test]
    fn test_failure_stops_new_calls() {
        let calls = AtomicUsize::new(0);
        let always_fail = |_: &str| -> Result<String> {
            calls.fetch_add(1, Ordering::Relaxed);
            bail!("unavailable")
        };
        let html = "<script>a()</script>".repeat(20);

        let err = Pipeline::new(Box::new(always_fail))
            .jobs(1)
            .run(&html)
            .unwrap_err();

        assert!(matches!(err, PipelineError::AdapterFailure { index: 0, .. }));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_closing_tag_escaped() {
        let leak = |_: &str| -> Result<String> { Ok("var s = '</SCRIPT><b>x</b>';".into()) };
        let html = "<script>s()</script><p>after</p>";

        let artifact = Pipeline::new(Box::new(leak)).run(html).unwrap();

        assert_eq!(
            artifact.html,
            "<script>var s = '<\\/SCRIPT><b>x</b>';</script><p>after</p>"
        );
        assert_eq!(artifact.html.to_ascii_lowercase().matches("</script").count(), 1);
    }

    #[test]
    fn test_identical_payloads_keep_order() {
        let seen = Mutex::new(Vec::new());
        let numbered = |payload: &str| -> Result<String> {
            let mut seen = seen.lock();
            seen.push(payload.to_string());
            Ok(format!("{payload}/*{}*/", seen.len()))
        };
        let html = "<script>f()</script><div></div><script>f()</script>";

        let artifact = Pipeline::new(Box::new(numbered)).jobs(1).run(html).unwrap();

        assert_eq!(
            artifact.html,
            "<script>f()/*1*/</script><div></div><script>f()/*2*/</script>"
        );
    }

    #[test]
    fn test_no_transformable_content() {
        let html = "<script src=\"a.js\"></script><script type=\"text/template\">x</script>";
        let err = Pipeline::new(Box::new(upper)).run(html).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NoTransformableContent { scripts: 2 }
        ));
    }

    #[test]
    fn test_many_regions_parallel() {
        let html: String = (0..64)
            .map(|i| format!("<script>f{i}()</script>"))
            .collect();
        let artifact = Pipeline::new(Box::new(upper)).jobs(4).run(&html).unwrap();

        let expected: String = (0..64)
            .map(|i| format!("<script>F{i}()</script>"))
            .collect();
        assert_eq!(artifact.html, expected);
    }

    #[test]
    fn test_with_markup_finisher() {
        let html = "<html>\n  <body>\n    <!-- note -->\n    <script>\n  go();\n</script>\n  </body>\n</html>\n";
        let artifact = Pipeline::new(Box::new(upper))
            .finisher(Box::new(MarkupFinisher::new(FinishOptions::default())))
            .verify(true)
            .run(html)
            .unwrap();

        assert!(artifact.html.contains("<script>GO();</script>"));
        assert!(!artifact.html.contains("note"));
        assert!(!artifact.html.contains("\n    "));
    }

    #[test]
    fn test_default_config_keeps_page_working() {
        let html = r#"<!DOCTYPE html>
<html>
<head>
  <title>Shop</title>
  <script type="application/ld+json">{"@type": "Product"}</script>
</head>
<body>
  <p>Total: <button onclick="onBuy()">Buy</button></p>
  <script>
    // Called from the button above.
    function onBuy() { alert('bought ' + price); }
    var price = 3;
  </script>
  <p>Hello <script>document.title = greeting('world');</script> again</p>
  <script>
    function greeting(name) { return 'hi ' + name; }
  </script>
</body>
</html>
"#;
        let config = Config::default();
        assert!(config.finish.verify);

        let artifact = Pipeline::from_config(&config).run(html).unwrap();
        let out = &artifact.html;

        assert_eq!(artifact.transformed_count(), 3);
        assert!(!out.contains("Called from"));
        for global in ["function onBuy", "price", "function greeting"] {
            assert!(out.contains(global), "lost `{global}` in {out}");
        }
        assert!(out.contains("onBuy()"));
        assert!(out.contains("Product"));
        assert!(out.contains("Hello <script>"));
        assert!(out.contains("</script> again"));
    }

    #[test]
    fn test_verify_rejects_dropped_script() {
        struct DropLast;
        impl Finisher for DropLast {
            fn name(&self) -> &str {
                "drop"
            }
            fn finish(&self, document: &str) -> Result<String> {
                Ok(document.replace("<script>B()</script>", ""))
            }
        }

        // The payload text still occurs elsewhere, but its container is gone.
        let html = "<p>B()</p><script>a()</script><script>b()</script>";
        let err = Pipeline::new(Box::new(upper))
            .finisher(Box::new(DropLast))
            .verify(true)
            .run(html)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FinisherFailure { index: None, .. }
        ));
    }

    #[test]
    fn test_verify_matches_containers_by_position() {
        struct Swap;
        impl Finisher for Swap {
            fn name(&self) -> &str {
                "swap"
            }
            fn finish(&self, document: &str) -> Result<String> {
                Ok(document
                    .replace("<script>A()</script>", "<script>TMP</script>")
                    .replace("<script>B()</script>", "<script>A()</script>")
                    .replace("<script>TMP</script>", "<script>B()</script>"))
            }
        }

        let html = "<script>a()</script><script>b()</script>";
        let err = Pipeline::new(Box::new(upper))
            .finisher(Box::new(Swap))
            .verify(true)
            .run(html)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FinisherFailure { index: Some(0), .. }
        ));
    }

    #[test]
    fn test_finisher_failure() {
        struct Broken;
        impl Finisher for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn finish(&self, _: &str) -> Result<String> {
                bail!("minifier crashed")
            }
        }

        let err = Pipeline::new(Box::new(upper))
            .finisher(Box::new(Broken))
            .run("<script>x()</script>")
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FinisherFailure { index: None, .. }
        ));
    }

    #[test]
    fn test_verify_detects_altered_script() {
        struct StripScripts;
        impl Finisher for StripScripts {
            fn name(&self) -> &str {
                "strip"
            }
            fn finish(&self, document: &str) -> Result<String> {
                Ok(document.replace("B()", "b()"))
            }
        }

        let html = "<script>a()</script><script>b()</script>";
        let err = Pipeline::new(Box::new(upper))
            .finisher(Box::new(StripScripts))
            .verify(true)
            .run(html)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FinisherFailure { index: Some(1), .. }
        ));

        // Without verification the altered document is accepted.
        let artifact = Pipeline::new(Box::new(upper))
            .finisher(Box::new(StripScripts))
            .run(html)
            .unwrap();
        assert_eq!(artifact.html, "<script>A()</script><script>b()</script>");
    }

    #[test]
    fn test_observer_events() {
        #[derive(Default)]
        struct Recorder {
            located: AtomicUsize,
            transformed: Mutex<Vec<usize>>,
        }
        impl RunObserver for Recorder {
            fn located(&self, regions: &[Region]) {
                self.located.store(regions.len(), Ordering::Relaxed);
            }
            fn transformed(&self, index: usize) {
                self.transformed.lock().push(index);
            }
        }

        let recorder = Recorder::default();
        let html = "<script src=\"a.js\"></script><script>a()</script><script>b()</script>";
        Pipeline::new(Box::new(upper))
            .run_observed(html, &recorder)
            .unwrap();

        assert_eq!(recorder.located.load(Ordering::Relaxed), 3);
        let mut transformed = recorder.transformed.into_inner();
        transformed.sort_unstable();
        assert_eq!(transformed, vec![1, 2]);
    }
}
