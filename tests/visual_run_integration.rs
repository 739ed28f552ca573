//! Integration tests for the full run lifecycle against the mock driver

use std::fs;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use web_vision::{
    FailureKind, MockEngine, MockFrame, Region, Reporter, RunConfig, RunCoordinator, RunSummary,
    SuiteFile, TestOptions, TestRegistry,
};

/// Records reporter events so tests can assert on progress output
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }

    fn push(&self, event: String) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, msg: &str) {
        self.push(format!("info:{}", msg));
    }

    fn pass(&self, name: &str) {
        self.push(format!("pass:{}", name));
    }

    fn fail(&self, name: &str, _detail: &str) {
        self.push(format!("fail:{}", name));
    }

    fn retry(&self, name: &str, attempt: u32) {
        self.push(format!("retry:{}:{}", name, attempt));
    }

    fn error(&self, msg: &str, err: &str) {
        self.push(format!("error:{}:{}", msg, err));
    }

    fn report(&self, summary: &RunSummary) {
        self.push(format!("report:{}:{}", summary.passed, summary.failed));
    }
}

fn config_in(dir: &TempDir) -> RunConfig {
    let mut config = RunConfig::defaults();
    config.baseline_dir = dir.path().join("baseline");
    config.current_dir = dir.path().join("current");
    config.diff_dir = dir.path().join("diff");
    config
}

fn registry_of(urls: &[&str]) -> TestRegistry {
    let mut registry = TestRegistry::new();
    for url in urls {
        registry.register_normal(*url, TestOptions::default());
    }
    registry
}

async fn run(
    config: RunConfig,
    registry: TestRegistry,
    engine: &MockEngine,
) -> (RunSummary, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let mut coordinator = RunCoordinator::new(
        config,
        registry,
        Arc::new(engine.clone()),
        Arc::clone(&reporter) as Arc<dyn Reporter>,
    );
    let summary = coordinator.execute().await.expect("run should complete");
    (summary, reporter)
}

#[tokio::test]
async fn test_first_run_creates_baselines_and_exits_zero() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/home", MockFrame::new([10, 20, 30]));
    engine.set_frame("/about", MockFrame::new([40, 50, 60]));

    let config = config_in(&dir);
    let (summary, _) = run(config.clone(), registry_of(&["/home", "/about"]), &engine).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.exit_code(), 0);
    assert!(config.baseline_dir.join("-home-0.png").exists());
    assert!(config.baseline_dir.join("-about-1.png").exists());
}

#[tokio::test]
async fn test_identical_second_run_passes() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/home", MockFrame::new([10, 20, 30]));

    let config = config_in(&dir);
    run(config.clone(), registry_of(&["/home"]), &engine).await;
    let (summary, reporter) = run(config, registry_of(&["/home"]), &engine).await;

    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 0);
    assert!(reporter.events().contains(&"pass:/home".to_string()));
}

#[tokio::test]
async fn test_changed_page_fails_with_diff_artifact() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/home", MockFrame::new([10, 20, 30]));

    let config = config_in(&dir);
    run(config.clone(), registry_of(&["/home"]), &engine).await;

    // The page renders differently on the second run.
    engine.set_frame("/home", MockFrame::new([200, 20, 30]));
    let (summary, _) = run(config.clone(), registry_of(&["/home"]), &engine).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::FailToMatch);
    assert!(config.diff_dir.join("-home-0.png").exists());
}

#[tokio::test]
async fn test_ignore_region_masks_changed_area() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    let patch = Region {
        x: 4,
        y: 4,
        width: 10,
        height: 8,
    };
    engine.set_frame("/dash", MockFrame::new([10, 20, 30]));

    let config = config_in(&dir);
    let options = TestOptions {
        ignore_regions: vec![patch],
        ..Default::default()
    };
    let mut registry = TestRegistry::new();
    registry.register_normal("/dash", options.clone());
    run(config.clone(), registry, &engine).await;

    // Change pixels only inside the ignored region.
    engine.set_frame(
        "/dash",
        MockFrame::new([10, 20, 30]).with_patch(patch, [250, 0, 0]),
    );
    let mut registry = TestRegistry::new();
    registry.register_normal("/dash", options);
    let (summary, _) = run(config, registry, &engine).await;

    assert_eq!(summary.failed, 0);
    assert_eq!(summary.passed, 1);
}

#[tokio::test]
async fn test_transient_failures_recover_within_retry_limit() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/flaky", MockFrame::new([10, 20, 30]));
    engine.fail_navigations("/flaky", 2);

    let mut config = config_in(&dir);
    config.retry_limit = 3;
    let (summary, reporter) = run(config, registry_of(&["/flaky"]), &engine).await;

    assert_eq!(summary.passed, 1);
    assert_eq!(summary.exit_code(), 0);
    assert!(reporter.events().contains(&"retry:/flaky:1".to_string()));
    assert!(reporter.events().contains(&"retry:/flaky:2".to_string()));

    // The session was respawned for each retry.
    assert!(engine.launches() >= 3);
}

#[tokio::test]
async fn test_exhausted_retries_record_exactly_one_failure() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.fail_navigations("/broken", 10);

    let mut config = config_in(&dir);
    config.retry_limit = 2;
    let (summary, _) = run(config, registry_of(&["/broken"]), &engine).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::FailToRun);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn test_failure_does_not_poison_other_tests() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/ok", MockFrame::new([10, 20, 30]));
    engine.fail_navigations("/broken", 10);

    let mut config = config_in(&dir);
    config.retry_limit = 1;
    let (summary, _) = run(config, registry_of(&["/broken", "/ok"]), &engine).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.passed, 1);
}

#[tokio::test]
async fn test_focused_tests_suppress_the_rest() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/focus", MockFrame::new([10, 20, 30]));

    let mut registry = TestRegistry::new();
    registry.register_normal("/a", TestOptions::default());
    registry.register_normal("/b", TestOptions::default());
    registry.register_focused("/focus", TestOptions::default());

    let (summary, reporter) = run(config_in(&dir), registry, &engine).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.focused, 1);
    let events = reporter.events();
    assert!(events.contains(&"pass:/focus".to_string()));
    assert!(!events.iter().any(|e| e.contains("/a") || e.contains("/b")));
}

#[tokio::test]
async fn test_empty_suite_reports_no_tests_found() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();

    let (summary, reporter) = run(config_in(&dir), TestRegistry::new(), &engine).await;

    assert_eq!(summary.total, 0);
    assert_eq!(summary.exit_code(), 0);
    assert!(
        reporter
            .events()
            .contains(&"info:no tests found".to_string())
    );
    assert_eq!(engine.pages_opened(), 0);
}

#[tokio::test]
async fn test_isolated_context_opens_incognito_pages() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/home", MockFrame::new([10, 20, 30]));

    let mut config = config_in(&dir);
    config.isolated_context = true;
    run(config, registry_of(&["/home"]), &engine).await;

    assert_eq!(engine.isolated_pages(), 1);
}

#[tokio::test]
async fn test_overwrite_replaces_stale_baselines() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    engine.set_frame("/home", MockFrame::new([10, 20, 30]));

    let config = config_in(&dir);
    run(config.clone(), registry_of(&["/home"]), &engine).await;

    // The page changed, but overwrite mode accepts the new rendering.
    engine.set_frame("/home", MockFrame::new([200, 20, 30]));
    let mut overwrite_config = config.clone();
    overwrite_config.overwrite = true;
    let (summary, _) = run(overwrite_config, registry_of(&["/home"]), &engine).await;
    assert_eq!(summary.exit_code(), 0);

    // A plain run now passes against the refreshed baseline.
    let (summary, _) = run(config, registry_of(&["/home"]), &engine).await;
    assert_eq!(summary.failed, 0);
}

#[test]
fn test_suite_file_end_to_end_registration() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suite.json");
    fs::write(
        &path,
        r#"{
            "defaults": { "base_url": "http://localhost:4000", "retry_limit": 1 },
            "tests": [
                { "url": "/" },
                { "url": "/legacy", "skip": true }
            ],
            "groups": [
                { "name": "auth", "tests": [ { "url": "/login", "name": "login page" } ] }
            ]
        }"#,
    )
    .unwrap();

    let suite = SuiteFile::load(&path).expect("suite should load");
    let config = RunConfig::defaults().apply(&suite.defaults);
    assert_eq!(config.base_url, "http://localhost:4000");
    assert_eq!(config.retry_limit, 1);

    let mut registry = TestRegistry::new();
    registry.register_suite(&suite, None);
    let selected = registry.effective_set();
    let urls: Vec<&str> = selected.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(urls, vec!["/", "/login"]);
    assert_eq!(selected[1].display_name(), "login page");
}
