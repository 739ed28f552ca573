//! Per-test execution pipeline: navigate, capture, compare, retry.
//!
//! Transient failures (navigation, capture, file I/O) are retried up to
//! the configured limit, respawning the shared browser session between
//! attempts. A nonzero pixel mismatch is a final verdict and is never
//! retried. The retry counter is per test, so one flaky test cannot
//! starve the budget of unrelated tests running concurrently.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::browser::{BrowserSession, PageHandle};
use crate::compare::Comparator;
use crate::config::{ResolvedOptions, RunConfig};
use crate::error::{VisionError, VisionResult};
use crate::registry::TestCase;
use crate::reporter::Reporter;
use crate::session::SessionManager;
use crate::summary::{FailureKind, FailureRecord, Outcome};

/// Style override eliminating timing-induced flakiness: all transitions
/// and animations collapse to zero duration and the caret is pinned to
/// transparent.
const ANIMATION_KILL_CSS: &str = "*, *::before, *::after {\
    transition-duration: 0s !important;\
    transition-delay: 0s !important;\
    animation-duration: 0s !important;\
    animation-delay: 0s !important;\
    caret-color: transparent !important;\
}";

/// Image filename for a test: URL with `/` replaced by `-`, suffixed
/// with the run index and `.png`
pub fn image_name(url: &str, index: usize) -> String {
    format!("{}-{}.png", url.replace('/', "-"), index)
}

/// Runs one test end to end against the shared session
pub struct Pipeline {
    config: Arc<RunConfig>,
    session: Arc<SessionManager>,
    comparator: Arc<Comparator>,
    reporter: Arc<dyn Reporter>,
}

impl Pipeline {
    /// Create a pipeline sharing the run's session manager and comparator
    pub fn new(
        config: Arc<RunConfig>,
        session: Arc<SessionManager>,
        comparator: Arc<Comparator>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            session,
            comparator,
            reporter,
        }
    }

    /// Execute one test, retrying transient failures internally.
    ///
    /// Returns a failure record when the test ultimately failed, `None`
    /// on pass or baseline creation. Never panics past the pipeline
    /// boundary; the coordinator always gets a settled result.
    pub async fn run(&self, test: &TestCase, index: usize) -> Option<FailureRecord> {
        let resolved = ResolvedOptions::resolve(&test.url, &test.options, &self.config);
        let image = image_name(&test.url, index);
        let mut attempt: u32 = 0;

        loop {
            let (session, generation) = match self.session.current().await {
                Ok(current) => current,
                Err(err) => {
                    return Some(self.fail_to_run(test, &resolved, err.to_string()));
                }
            };

            match self.capture_and_compare(session, test, &resolved, &image).await {
                Ok(Outcome::Pass) => {
                    self.reporter.pass(&resolved.name);
                    return None;
                }
                Ok(Outcome::BaselineCreated) => {
                    log::info!("baseline created for {}", resolved.name);
                    self.reporter.pass(&resolved.name);
                    return None;
                }
                Ok(Outcome::Fail {
                    mismatch,
                    diff_path,
                }) => {
                    // A visual difference is a final verdict, not a
                    // transient fault.
                    let detail = format!(
                        "mismatch {:.2}% (diff: {})",
                        mismatch,
                        diff_path.display()
                    );
                    self.reporter.fail(&resolved.name, &detail);
                    return Some(FailureRecord {
                        test_name: resolved.name.clone(),
                        url: test.url.clone(),
                        kind: FailureKind::FailToMatch,
                        detail,
                    });
                }
                Err(err) => {
                    if attempt < self.config.retry_limit {
                        attempt += 1;
                        self.reporter.retry(&resolved.name, attempt);
                        log::warn!(
                            "attempt {} for {} failed: {}; respawning session",
                            attempt,
                            resolved.name,
                            err
                        );
                        if let Err(recover_err) = self.session.recover(generation).await {
                            return Some(self.fail_to_run(
                                test,
                                &resolved,
                                format!("session recovery failed: {}", recover_err),
                            ));
                        }
                        continue;
                    }
                    return Some(self.fail_to_run(test, &resolved, err.to_string()));
                }
            }
        }
    }

    fn fail_to_run(
        &self,
        test: &TestCase,
        resolved: &ResolvedOptions,
        detail: String,
    ) -> FailureRecord {
        self.reporter.fail(&resolved.name, &detail);
        FailureRecord {
            test_name: resolved.name.clone(),
            url: test.url.clone(),
            kind: FailureKind::FailToRun,
            detail,
        }
    }

    /// One capture attempt, run on the blocking pool since the browser
    /// driver and image work are synchronous.
    async fn capture_and_compare(
        &self,
        session: Arc<dyn BrowserSession>,
        test: &TestCase,
        resolved: &ResolvedOptions,
        image: &str,
    ) -> VisionResult<Outcome> {
        let resolved = resolved.clone();
        let full_url = format!("{}{}", resolved.base_url, test.url);
        let current_path = self.config.current_dir.join(image);
        let image = image.to_string();
        let isolated = self.config.isolated_context;
        let comparator = Arc::clone(&self.comparator);

        tokio::task::spawn_blocking(move || {
            let page = if isolated {
                session.new_isolated_page()?
            } else {
                session.new_page()?
            };
            let result = capture_steps(
                page.as_ref(),
                &resolved,
                &full_url,
                &current_path,
                &comparator,
                &image,
            );
            if let Err(err) = page.close() {
                log::debug!("failed to close page for {}: {}", full_url, err);
            }
            result
        })
        .await
        .map_err(|err| VisionError::Browser(format!("capture task failed: {}", err)))?
    }
}

fn capture_steps(
    page: &dyn PageHandle,
    resolved: &ResolvedOptions,
    full_url: &str,
    current_path: &Path,
    comparator: &Comparator,
    image: &str,
) -> VisionResult<Outcome> {
    page.goto(full_url)?;

    if resolved.ignore_css_animations {
        page.add_style_tag(ANIMATION_KILL_CSS)?;
    }

    let bytes = match &resolved.selector {
        Some(selector) => {
            if let Some(script) = &resolved.before_capture_script {
                page.evaluate(script)?;
            }
            page.wait_for_selector(selector)?;
            if !resolved.hide_selectors.is_empty() {
                page.hide_elements(&resolved.hide_selectors)?;
            }
            page.screenshot_element(selector)?
        }
        None => page.screenshot()?,
    };

    fs::write(current_path, &bytes)?;
    comparator.compare(image, &resolved.ignore_regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{LaunchConfig, MockEngine};
    use crate::config::TestOptions;
    use crate::summary::RunSummary;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct QuietReporter;

    impl Reporter for QuietReporter {
        fn info(&self, _msg: &str) {}
        fn pass(&self, _name: &str) {}
        fn fail(&self, _name: &str, _detail: &str) {}
        fn retry(&self, _name: &str, _attempt: u32) {}
        fn error(&self, _msg: &str, _err: &str) {}
        fn report(&self, _summary: &RunSummary) {}
    }

    fn config_in(dir: &TempDir, retry_limit: u32) -> RunConfig {
        let mut config = RunConfig::defaults();
        config.retry_limit = retry_limit;
        config.baseline_dir = dir.path().join("baseline");
        config.current_dir = dir.path().join("current");
        config.diff_dir = dir.path().join("diff");
        for d in [&config.baseline_dir, &config.current_dir, &config.diff_dir] {
            fs::create_dir_all(d).unwrap();
        }
        config
    }

    async fn pipeline_with(engine: &MockEngine, config: RunConfig) -> Pipeline {
        let config = Arc::new(config);
        let session = Arc::new(SessionManager::new(
            Arc::new(engine.clone()),
            LaunchConfig::default(),
        ));
        session.spawn().await.unwrap();
        let comparator = Arc::new(Comparator::new(&config));
        Pipeline::new(config, session, comparator, Arc::new(QuietReporter))
    }

    #[test]
    fn test_image_name_replaces_slashes() {
        assert_eq!(image_name("/about/team", 3), "-about-team-3.png");
        assert_eq!(image_name("/", 0), "--0.png");
    }

    #[tokio::test]
    async fn test_transient_failures_under_limit_succeed() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        engine.fail_navigations("/flaky", 2);
        let pipeline = pipeline_with(&engine, config_in(&dir, 3)).await;

        let test = TestCase::new("/flaky", TestOptions::default());
        let record = pipeline.run(&test, 0).await;
        assert!(record.is_none(), "expected success, got {:?}", record);

        // Each retry respawned the shared session.
        assert_eq!(engine.launches(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_record_one_fail_to_run() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        engine.fail_navigations("/broken", 10);
        let pipeline = pipeline_with(&engine, config_in(&dir, 2)).await;

        let test = TestCase::new("/broken", TestOptions::default());
        let record = pipeline.run(&test, 0).await.expect("expected a failure");
        assert_eq!(record.kind, FailureKind::FailToRun);
        assert_eq!(record.url, "/broken");
    }

    #[tokio::test]
    async fn test_mismatch_is_never_retried() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let config = config_in(&dir, 3);

        // Seed a baseline that differs from what the mock will render.
        let baseline = crate::browser::MockFrame::new([0, 0, 0]).render_png().unwrap();
        fs::write(
            config.baseline_dir.join(image_name("/home", 0)),
            baseline,
        )
        .unwrap();

        let pipeline = pipeline_with(&engine, config).await;
        let test = TestCase::new("/home", TestOptions::default());
        let record = pipeline.run(&test, 0).await.expect("expected a failure");
        assert_eq!(record.kind, FailureKind::FailToMatch);

        // The initial spawn is the only launch: no retry happened.
        assert_eq!(engine.launches(), 1);
    }

    #[tokio::test]
    async fn test_before_capture_hook_runs_on_selector_path() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let pipeline = pipeline_with(&engine, config_in(&dir, 0)).await;

        let options = TestOptions {
            selector: Some("#app".to_string()),
            before_capture_script: Some("window.scrollTo(0, 0)".to_string()),
            ..Default::default()
        };
        let test = TestCase::new("/scrolled", options);
        assert!(pipeline.run(&test, 0).await.is_none());
        assert_eq!(
            engine.evaluated_scripts(),
            vec!["window.scrollTo(0, 0)".to_string()]
        );
    }

    #[tokio::test]
    async fn test_before_capture_hook_skipped_on_full_page_path() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let pipeline = pipeline_with(&engine, config_in(&dir, 0)).await;

        let options = TestOptions {
            before_capture_script: Some("window.scrollTo(0, 0)".to_string()),
            ..Default::default()
        };
        let test = TestCase::new("/plain", options);
        assert!(pipeline.run(&test, 0).await.is_none());
        assert!(engine.evaluated_scripts().is_empty());
    }

    #[tokio::test]
    async fn test_hide_selectors_are_soft_hidden() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let pipeline = pipeline_with(&engine, config_in(&dir, 0)).await;

        let options = TestOptions {
            selector: Some("#app".to_string()),
            hide_selectors: vec![".ticker".to_string()],
            ..Default::default()
        };
        let test = TestCase::new("/dash", options);
        assert!(pipeline.run(&test, 0).await.is_none());
        assert_eq!(engine.hidden_selectors(), vec![".ticker".to_string()]);
    }
}
