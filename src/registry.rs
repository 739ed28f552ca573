//! Test registration and run-set selection.
//!
//! Tests accumulate into three sets: normal, focused, and ignored. The
//! effective run set is derived on demand, never stored:
//! - any focused test suppresses everything that is not focused
//! - otherwise ignored URLs are subtracted from the normal set
//! - otherwise the full normal set runs

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::TestOptions;
use crate::error::{VisionError, VisionResult};

/// A registered test case, immutable after registration
#[derive(Debug, Clone)]
pub struct TestCase {
    /// URL path appended to the base URL
    pub url: String,
    /// Options declared at registration time
    pub options: TestOptions,
}

impl TestCase {
    /// Create a test case for the given URL
    pub fn new(url: impl Into<String>, options: TestOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }

    /// Display name for reporting
    pub fn display_name(&self) -> &str {
        self.options.name.as_deref().unwrap_or(&self.url)
    }
}

/// Accumulates declared tests and resolves the effective run set
#[derive(Debug, Default)]
pub struct TestRegistry {
    normal: Vec<TestCase>,
    focused: Vec<TestCase>,
    ignored: Vec<TestCase>,
}

impl TestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a test in the normal set
    pub fn register_normal(&mut self, url: impl Into<String>, options: TestOptions) {
        self.normal.push(TestCase::new(url, options));
    }

    /// Register a test in the focused set
    pub fn register_focused(&mut self, url: impl Into<String>, options: TestOptions) {
        self.focused.push(TestCase::new(url, options));
    }

    /// Register a URL in the ignored set, excluding it from the default run
    pub fn register_ignored(&mut self, url: impl Into<String>, options: TestOptions) {
        self.ignored.push(TestCase::new(url, options));
    }

    /// Register every member of a named group.
    ///
    /// A member-level focus flag takes precedence over the group-level
    /// one. When `filter` is set, groups with a different name are not
    /// registered at all.
    pub fn register_group(&mut self, group: &SuiteGroup, filter: Option<&str>) {
        if let Some(wanted) = filter {
            if group.name != wanted {
                return;
            }
        }
        for entry in &group.tests {
            if entry.options.skip {
                self.register_ignored(entry.url.clone(), entry.options.clone());
            } else if entry.options.focus || group.focus {
                self.register_focused(entry.url.clone(), entry.options.clone());
            } else {
                self.register_normal(entry.url.clone(), entry.options.clone());
            }
        }
    }

    /// Register everything declared in a suite file
    pub fn register_suite(&mut self, suite: &SuiteFile, filter: Option<&str>) {
        for entry in &suite.tests {
            if entry.options.skip {
                self.register_ignored(entry.url.clone(), entry.options.clone());
            } else if entry.options.focus {
                self.register_focused(entry.url.clone(), entry.options.clone());
            } else {
                self.register_normal(entry.url.clone(), entry.options.clone());
            }
        }
        for group in &suite.groups {
            self.register_group(group, filter);
        }
    }

    /// Resolve the effective run set.
    ///
    /// Pure function of the accumulated sets; the registry is never
    /// mutated by selection.
    pub fn effective_set(&self) -> Vec<TestCase> {
        if !self.focused.is_empty() {
            return self.focused.clone();
        }
        if !self.ignored.is_empty() {
            return self
                .normal
                .iter()
                .filter(|test| !self.ignored.iter().any(|ignored| ignored.url == test.url))
                .cloned()
                .collect();
        }
        self.normal.clone()
    }

    /// Number of runnable registrations (normal + focused)
    pub fn registered_total(&self) -> usize {
        self.normal.len() + self.focused.len()
    }

    /// Number of focused registrations
    pub fn focused_len(&self) -> usize {
        self.focused.len()
    }
}

// ============================================================================
// Suite Files
// ============================================================================

/// One test declaration in a suite file
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteTest {
    /// URL path for the test
    pub url: String,
    /// Per-test options
    #[serde(flatten)]
    pub options: TestOptions,
}

/// A named group of test declarations
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteGroup {
    /// Group name, matched against the group filter
    pub name: String,
    /// Focus every member of the group
    #[serde(default)]
    pub focus: bool,
    /// Member tests
    #[serde(default)]
    pub tests: Vec<SuiteTest>,
}

/// A JSON suite file: run-level defaults plus test declarations
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuiteFile {
    /// Run-level option defaults declared in the suite
    pub defaults: crate::config::RunOverrides,
    /// Top-level test declarations
    pub tests: Vec<SuiteTest>,
    /// Named groups
    pub groups: Vec<SuiteGroup>,
}

impl SuiteFile {
    /// Load a suite file from disk
    pub fn load(path: &Path) -> VisionResult<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            VisionError::Config(format!(
                "Failed to read suite file '{}': {}",
                path.display(),
                err
            ))
        })?;
        let suite = serde_json::from_str(&content).map_err(|err| {
            VisionError::Config(format!(
                "Failed to parse suite file '{}': {}",
                path.display(),
                err
            ))
        })?;
        Ok(suite)
    }
}
