//! Web Vision - Visual regression testing for web pages.
//!
//! This crate provides:
//! - Headless Chrome page capture (full page or element-scoped)
//! - Pixel-exact baseline comparison with ignore regions and diff artifacts
//! - Concurrent test execution over one shared browser session
//! - Transient-failure retry with automatic session recovery
//! - JSON suite files with focus/skip selection and named groups
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use web_vision::{
//!     ChromeEngine, RunConfig, RunCoordinator, SpecReporter, TestOptions, TestRegistry,
//! };
//!
//! # async fn run() -> web_vision::VisionResult<()> {
//! let mut registry = TestRegistry::new();
//! registry.register_normal("/", TestOptions::default());
//!
//! let mut coordinator = RunCoordinator::new(
//!     RunConfig::defaults(),
//!     registry,
//!     Arc::new(ChromeEngine::new()),
//!     Arc::new(SpecReporter),
//! );
//! let summary = coordinator.execute().await?;
//! std::process::exit(summary.exit_code());
//! # }
//! ```

pub mod browser;
pub mod compare;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod reporter;
pub mod session;
pub mod summary;

// Re-export configuration types
pub use config::{Region, ReporterStyle, ResolvedOptions, RunConfig, RunOverrides, TestOptions};

// Re-export error types
pub use error::{VisionError, VisionResult};

// Re-export registration and suite-file types
pub use registry::{SuiteFile, SuiteGroup, SuiteTest, TestCase, TestRegistry};

// Re-export browser engines
pub use browser::{BrowserEngine, BrowserSession, ChromeEngine, LaunchConfig, MockEngine, MockFrame, PageHandle};

// Re-export run machinery
pub use coordinator::RunCoordinator;
pub use pipeline::Pipeline;
pub use session::SessionManager;

// Re-export comparison types
pub use compare::{Comparator, DiffResult, Differ, PixelDiff};

// Re-export reporting
pub use reporter::{DotReporter, Reporter, SpecReporter};

// Re-export result types
pub use summary::{FailureKind, FailureRecord, Outcome, RunSummary};
