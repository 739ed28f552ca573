//! Browser automation abstraction for page capture.
//!
//! This module provides a unified interface over browser drivers:
//! - `ChromeEngine` for headless Chrome via the DevTools protocol
//! - `MockEngine` for deterministic, scriptable captures in tests

use std::sync::Arc;

use crate::error::VisionResult;

pub mod chrome;
pub mod mock;

pub use chrome::ChromeEngine;
pub use mock::{MockEngine, MockFrame};

/// Static launch configuration for browser sessions
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Launch without a visible window
    pub headless: bool,
    /// Initial window size in pixels
    pub window_size: (u32, u32),
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1280, 800),
        }
    }
}

/// Launches browser sessions from a static configuration
pub trait BrowserEngine: Send + Sync {
    /// Launch a new browser session
    fn launch(&self, config: &LaunchConfig) -> VisionResult<Arc<dyn BrowserSession>>;
}

/// A live browser session; shared read access across concurrent tests
pub trait BrowserSession: Send + Sync {
    /// Open a page context in the default browser context
    fn new_page(&self) -> VisionResult<Box<dyn PageHandle>>;

    /// Open a page context in a fresh isolated (incognito) context
    fn new_isolated_page(&self) -> VisionResult<Box<dyn PageHandle>>;

    /// Close the session and release the underlying browser.
    ///
    /// The driver process may outlive this call briefly: it exits once
    /// the last outstanding handle to the session drops, so a
    /// replacement session can overlap the old process for that window.
    fn close(&self) -> VisionResult<()>;
}

/// A single page context within a session
pub trait PageHandle: Send {
    /// Navigate and wait for both load and DOM-ready
    fn goto(&self, url: &str) -> VisionResult<()>;

    /// Inject a style tag into the page
    fn add_style_tag(&self, css: &str) -> VisionResult<()>;

    /// Wait for the selector to appear in the DOM
    fn wait_for_selector(&self, selector: &str) -> VisionResult<()>;

    /// Soft-hide every element matching the selectors by forcing
    /// `opacity: 0`. Layout is preserved; nodes are never removed.
    fn hide_elements(&self, selectors: &[String]) -> VisionResult<()>;

    /// Evaluate a script in the page
    fn evaluate(&self, script: &str) -> VisionResult<()>;

    /// Capture the full page as PNG bytes
    fn screenshot(&self) -> VisionResult<Vec<u8>>;

    /// Capture only the bounding box of the first element matching the
    /// selector as PNG bytes
    fn screenshot_element(&self, selector: &str) -> VisionResult<Vec<u8>>;

    /// Close the page context
    fn close(&self) -> VisionResult<()>;
}

/// Script forcing `opacity: 0` on every element matching the selectors.
///
/// Selectors are embedded as a JSON array so arbitrary selector syntax
/// survives quoting.
pub(crate) fn soft_hide_script(selectors: &[String]) -> String {
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(function() {{
            var selectors = {list};
            for (var i = 0; i < selectors.length; i++) {{
                var nodes = document.querySelectorAll(selectors[i]);
                for (var j = 0; j < nodes.length; j++) {{
                    nodes[j].style.opacity = '0';
                }}
            }}
            return true;
        }})()"#
    )
}

/// Script appending a style tag with the given CSS to the document head
pub(crate) fn style_injection_script(css: &str) -> String {
    let css_literal = serde_json::to_string(css).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(function() {{
            var style = document.createElement('style');
            style.appendChild(document.createTextNode({css_literal}));
            var head = document.head || document.getElementsByTagName('head')[0] || document.documentElement;
            head.appendChild(style);
            return true;
        }})()"#
    )
}
