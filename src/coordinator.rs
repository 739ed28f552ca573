//! Run coordination: directory preparation, session spawn, concurrent
//! dispatch, and summary aggregation.
//!
//! The coordinator walks a fixed state machine for every run:
//! Idle -> Preparing -> Dispatching -> Aggregating -> Done. Tests fan
//! out concurrently over one shared browser session; each task settles
//! to at most one failure record, so aggregation is a plain collect.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinSet;

use crate::browser::{BrowserEngine, LaunchConfig};
use crate::compare::Comparator;
use crate::error::{VisionError, VisionResult};
use crate::pipeline::Pipeline;
use crate::registry::TestRegistry;
use crate::reporter::Reporter;
use crate::session::SessionManager;
use crate::summary::{FailureKind, FailureRecord, RunSummary};

/// Phases of a run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Preparing,
    Dispatching,
    Aggregating,
    Done,
}

/// Drives a complete visual regression run
pub struct RunCoordinator {
    config: Arc<crate::config::RunConfig>,
    registry: TestRegistry,
    session: Arc<SessionManager>,
    reporter: Arc<dyn Reporter>,
    state: RunState,
}

impl RunCoordinator {
    /// Create a coordinator for the given configuration and test set
    pub fn new(
        config: crate::config::RunConfig,
        registry: TestRegistry,
        engine: Arc<dyn BrowserEngine>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let launch = LaunchConfig {
            headless: config.headless,
            ..LaunchConfig::default()
        };
        Self {
            config: Arc::new(config),
            registry,
            session: Arc::new(SessionManager::new(engine, launch)),
            reporter,
            state: RunState::Idle,
        }
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("run state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Execute the whole run and return its summary.
    ///
    /// Directory preparation and session launch failures are fatal and
    /// surface as errors; individual test failures never are.
    pub async fn execute(&mut self) -> VisionResult<RunSummary> {
        let started = Instant::now();

        self.transition(RunState::Preparing);
        self.prepare_directories()?;
        self.session.spawn().await?;

        let selected = self.registry.effective_set();
        let skipped = self.registry.registered_total() - selected.len();
        let focused = self.registry.focused_len();

        if selected.is_empty() {
            self.reporter.info("no tests found");
            self.session.close_all().await?;
            self.transition(RunState::Done);
            return Ok(RunSummary {
                total: 0,
                skipped,
                focused,
                failed: 0,
                passed: 0,
                failures: Vec::new(),
                duration_ms: started.elapsed().as_millis() as u64,
                finished_at: Utc::now(),
            });
        }

        self.transition(RunState::Dispatching);
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&self.config),
            Arc::clone(&self.session),
            Arc::new(Comparator::new(&self.config)),
            Arc::clone(&self.reporter),
        ));

        let total = selected.len();
        let mut tasks = JoinSet::new();
        for (index, test) in selected.into_iter().enumerate() {
            let pipeline = Arc::clone(&pipeline);
            tasks.spawn(async move { pipeline.run(&test, index).await });
        }

        self.transition(RunState::Aggregating);
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(record)) => failures.push(record),
                Ok(None) => {}
                // A panicked task still counts as exactly one failure.
                Err(err) => failures.push(FailureRecord {
                    test_name: "<unknown>".to_string(),
                    url: "<unknown>".to_string(),
                    kind: FailureKind::FailToRun,
                    detail: format!("test task panicked: {}", err),
                }),
            }
        }

        if let Err(err) = self.session.close_all().await {
            log::warn!("failed to close browser session: {}", err);
        }

        let summary = RunSummary {
            total,
            skipped,
            focused,
            failed: failures.len(),
            passed: total - failures.len(),
            failures,
            duration_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        };
        self.reporter.report(&summary);
        log::info!(
            "run finished: {} passed, {} failed in {}ms",
            summary.passed,
            summary.failed,
            summary.duration_ms
        );

        self.transition(RunState::Done);
        Ok(summary)
    }

    /// Reset the working directories: current and diff are wiped,
    /// the baseline directory is created if missing but never cleared.
    fn prepare_directories(&self) -> VisionResult<()> {
        for dir in [&self.config.current_dir, &self.config.diff_dir] {
            remove_dir_if_present(dir)?;
            fs::create_dir_all(dir)?;
        }
        fs::create_dir_all(&self.config.baseline_dir)?;
        Ok(())
    }
}

fn remove_dir_if_present(dir: &Path) -> VisionResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(VisionError::Io(std::io::Error::other(format!(
            "Failed to reset directory '{}': {}",
            dir.display(),
            err
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockEngine;
    use crate::config::{RunConfig, TestOptions};
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

    fn config_in(dir: &TempDir) -> RunConfig {
        let mut config = RunConfig::defaults();
        config.baseline_dir = dir.path().join("baseline");
        config.current_dir = dir.path().join("current");
        config.diff_dir = dir.path().join("diff");
        config
    }

    #[tokio::test]
    async fn test_empty_run_set_short_circuits() {
        let dir = TempDir::new().unwrap();
        let engine = MockEngine::new();
        let mut coordinator = RunCoordinator::new(
            config_in(&dir),
            TestRegistry::new(),
            Arc::new(engine.clone()),
            Arc::new(QuietReporter),
        );

        let summary = coordinator.execute().await.unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(engine.pages_opened(), 0);
    }

    #[tokio::test]
    async fn test_directories_are_reset_between_runs() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.current_dir).unwrap();
        fs::write(config.current_dir.join("stale.png"), b"old").unwrap();

        let mut registry = TestRegistry::new();
        registry.register_normal("/home", TestOptions::default());

        let mut coordinator = RunCoordinator::new(
            config.clone(),
            registry,
            Arc::new(MockEngine::new()),
            Arc::new(QuietReporter),
        );
        coordinator.execute().await.unwrap();

        assert!(!config.current_dir.join("stale.png").exists());
        assert!(config.baseline_dir.exists());
        assert!(config.diff_dir.exists());
    }

    #[tokio::test]
    async fn test_skipped_counts_ignored_tests() {
        let dir = TempDir::new().unwrap();
        let mut registry = TestRegistry::new();
        registry.register_normal("/a", TestOptions::default());
        registry.register_normal("/b", TestOptions::default());
        registry.register_ignored("/b", TestOptions::default());

        let mut coordinator = RunCoordinator::new(
            config_in(&dir),
            registry,
            Arc::new(MockEngine::new()),
            Arc::new(QuietReporter),
        );
        let summary = coordinator.execute().await.unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.passed, 1);
    }
}
