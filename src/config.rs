//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for Web Vision, supporting:
//! - Environment variables for all run-level values
//! - Sensible defaults for a local dev-server workflow
//! - An explicit three-tier resolution order for test options:
//!   per-test override > run-level default > built-in default
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WEB_VISION_BASE_URL` | Base URL prepended to test URLs | `http://localhost:3000` |
//! | `WEB_VISION_SELECTOR` | Global capture selector | full-page capture |
//! | `WEB_VISION_RETRY_LIMIT` | Retries per test on transient failure | `3` |
//! | `WEB_VISION_BASELINE_DIR` | Baseline image directory | `./screenshots/baseline` |
//! | `WEB_VISION_CURRENT_DIR` | Fresh capture directory | `./screenshots/current` |
//! | `WEB_VISION_DIFF_DIR` | Diff artifact directory | `./screenshots/diff` |
//! | `WEB_VISION_REPORTER` | Reporter style (`spec` or `dot`) | `spec` |
//! | `WEB_VISION_HEADED` | Run the browser headed (`1`/`true`) | headless |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

// ============================================================================
// Default Values
// ============================================================================

/// Default base URL for page navigation
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default retry limit for transient pipeline failures
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default baseline image directory
pub const DEFAULT_BASELINE_DIR: &str = "./screenshots/baseline";

/// Default directory for fresh captures
pub const DEFAULT_CURRENT_DIR: &str = "./screenshots/current";

/// Default directory for diff artifacts
pub const DEFAULT_DIFF_DIR: &str = "./screenshots/diff";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the base URL
pub const ENV_BASE_URL: &str = "WEB_VISION_BASE_URL";

/// Environment variable for the global capture selector
pub const ENV_SELECTOR: &str = "WEB_VISION_SELECTOR";

/// Environment variable for the retry limit
pub const ENV_RETRY_LIMIT: &str = "WEB_VISION_RETRY_LIMIT";

/// Environment variable for the baseline directory
pub const ENV_BASELINE_DIR: &str = "WEB_VISION_BASELINE_DIR";

/// Environment variable for the current-capture directory
pub const ENV_CURRENT_DIR: &str = "WEB_VISION_CURRENT_DIR";

/// Environment variable for the diff directory
pub const ENV_DIFF_DIR: &str = "WEB_VISION_DIFF_DIR";

/// Environment variable for the reporter style
pub const ENV_REPORTER: &str = "WEB_VISION_REPORTER";

/// Environment variable for headed mode
pub const ENV_HEADED: &str = "WEB_VISION_HEADED";

// ============================================================================
// Run Configuration
// ============================================================================

/// Console reporter style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReporterStyle {
    /// One line per test
    Spec,
    /// One character per test
    Dot,
}

impl ReporterStyle {
    /// Parse a reporter style name ("spec" or "dot")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "spec" => Some(ReporterStyle::Spec),
            "dot" => Some(ReporterStyle::Dot),
            _ => None,
        }
    }
}

/// Run-level configuration for a whole visual regression run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL prepended to every test URL
    pub base_url: String,
    /// Global capture selector (tests may override)
    pub selector: Option<String>,
    /// Disable CSS animations globally (tests may override)
    pub ignore_css_animations: bool,
    /// Overwrite-baseline mode: every capture becomes the new baseline
    pub overwrite: bool,
    /// Give each test an isolated (incognito) page context
    pub isolated_context: bool,
    /// Restrict group registration to this named group
    pub group_filter: Option<String>,
    /// Retries per test on transient failure
    pub retry_limit: u32,
    /// Launch the browser headless
    pub headless: bool,
    /// Reporter style for console output
    pub reporter: ReporterStyle,
    /// Baseline image directory
    pub baseline_dir: PathBuf,
    /// Fresh capture directory
    pub current_dir: PathBuf,
    /// Diff artifact directory
    pub diff_dir: PathBuf,
}

impl RunConfig {
    /// Create a run configuration with built-in defaults
    pub fn defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            selector: None,
            ignore_css_animations: false,
            overwrite: false,
            isolated_context: false,
            group_filter: None,
            retry_limit: DEFAULT_RETRY_LIMIT,
            headless: true,
            reporter: ReporterStyle::Spec,
            baseline_dir: PathBuf::from(DEFAULT_BASELINE_DIR),
            current_dir: PathBuf::from(DEFAULT_CURRENT_DIR),
            diff_dir: PathBuf::from(DEFAULT_DIFF_DIR),
        }
    }

    /// Apply a layer of overrides on top of this configuration.
    ///
    /// Layers are applied lowest-precedence first: suite-file defaults,
    /// then environment, then CLI flags.
    pub fn apply(mut self, overrides: &RunOverrides) -> Self {
        if let Some(base_url) = &overrides.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(selector) = &overrides.selector {
            self.selector = Some(selector.clone());
        }
        if let Some(ignore) = overrides.ignore_css_animations {
            self.ignore_css_animations = ignore;
        }
        if let Some(overwrite) = overrides.overwrite {
            self.overwrite = overwrite;
        }
        if let Some(isolated) = overrides.isolated_context {
            self.isolated_context = isolated;
        }
        if let Some(filter) = &overrides.group_filter {
            self.group_filter = Some(filter.clone());
        }
        if let Some(limit) = overrides.retry_limit {
            self.retry_limit = limit;
        }
        if let Some(headless) = overrides.headless {
            self.headless = headless;
        }
        if let Some(reporter) = overrides.reporter {
            self.reporter = reporter;
        }
        if let Some(dir) = &overrides.baseline_dir {
            self.baseline_dir = dir.clone();
        }
        if let Some(dir) = &overrides.current_dir {
            self.current_dir = dir.clone();
        }
        if let Some(dir) = &overrides.diff_dir {
            self.diff_dir = dir.clone();
        }
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// A partial run configuration; unset fields leave the lower layer intact
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunOverrides {
    pub base_url: Option<String>,
    pub selector: Option<String>,
    pub ignore_css_animations: Option<bool>,
    pub overwrite: Option<bool>,
    pub isolated_context: Option<bool>,
    pub group_filter: Option<String>,
    pub retry_limit: Option<u32>,
    pub headless: Option<bool>,
    #[serde(skip)]
    pub reporter: Option<ReporterStyle>,
    pub baseline_dir: Option<PathBuf>,
    pub current_dir: Option<PathBuf>,
    pub diff_dir: Option<PathBuf>,
}

impl RunOverrides {
    /// Read the environment-variable layer
    pub fn from_env() -> Self {
        Self {
            base_url: env::var(ENV_BASE_URL).ok(),
            selector: env::var(ENV_SELECTOR).ok(),
            ignore_css_animations: None,
            overwrite: None,
            isolated_context: None,
            group_filter: None,
            retry_limit: env::var(ENV_RETRY_LIMIT).ok().and_then(|s| s.parse().ok()),
            headless: env::var(ENV_HEADED).ok().map(|s| !parse_bool(&s)),
            reporter: env::var(ENV_REPORTER)
                .ok()
                .and_then(|s| ReporterStyle::from_name(&s)),
            baseline_dir: env::var(ENV_BASELINE_DIR).ok().map(PathBuf::from),
            current_dir: env::var(ENV_CURRENT_DIR).ok().map(PathBuf::from),
            diff_dir: env::var(ENV_DIFF_DIR).ok().map(PathBuf::from),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

// ============================================================================
// Per-Test Options
// ============================================================================

/// A rectangular region excluded from pixel comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Whether the region contains the given pixel coordinate.
    ///
    /// Compares offsets instead of `origin + extent` so regions near
    /// the top of the coordinate space cannot overflow.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px - self.x < self.width && py >= self.y && py - self.y < self.height
    }
}

/// Per-test options, set at registration time and immutable thereafter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestOptions {
    /// Display name for reporting (defaults to the URL)
    pub name: Option<String>,

    /// Custom base URL for this test only
    pub base_url: Option<String>,

    /// DOM selector scoping the screenshot to one element
    pub selector: Option<String>,

    /// Selectors to soft-hide (opacity 0) before capture
    pub hide_selectors: Vec<String>,

    /// Disable CSS animations/transitions for this test
    pub ignore_css_animations: Option<bool>,

    /// Regions excluded from pixel comparison
    pub ignore_regions: Vec<Region>,

    /// JavaScript evaluated in the page right before capture
    pub before_capture_script: Option<String>,

    /// Run only focused tests when any exist
    pub focus: bool,

    /// Exclude this URL from the default run set
    pub skip: bool,
}

/// Options for one test after three-tier resolution.
///
/// Precedence is fixed: per-test override, then run-level default,
/// then built-in default.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// Display name used in reporting
    pub name: String,
    /// Base URL the test URL is appended to
    pub base_url: String,
    /// Capture selector, if any (test-level wins over global)
    pub selector: Option<String>,
    /// Selectors to soft-hide before capture
    pub hide_selectors: Vec<String>,
    /// Whether to inject the animation-disabling style
    pub ignore_css_animations: bool,
    /// Regions excluded from comparison
    pub ignore_regions: Vec<Region>,
    /// Optional pre-capture hook script
    pub before_capture_script: Option<String>,
}

impl ResolvedOptions {
    /// Resolve effective options for one test against the run configuration
    pub fn resolve(url: &str, options: &TestOptions, run: &RunConfig) -> Self {
        Self {
            name: options.name.clone().unwrap_or_else(|| url.to_string()),
            base_url: options
                .base_url
                .clone()
                .unwrap_or_else(|| run.base_url.clone()),
            selector: options.selector.clone().or_else(|| run.selector.clone()),
            hide_selectors: options.hide_selectors.clone(),
            ignore_css_animations: options
                .ignore_css_animations
                .unwrap_or(run.ignore_css_animations),
            ignore_regions: options.ignore_regions.clone(),
            before_capture_script: options.before_capture_script.clone(),
        }
    }
}
