//! Headless Chrome driver over the DevTools protocol.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};

use super::{
    BrowserEngine, BrowserSession, LaunchConfig, PageHandle, soft_hide_script,
    style_injection_script,
};
use crate::error::{VisionError, VisionResult};

/// How long an idle browser stays alive before the driver gives up on it
const IDLE_BROWSER_TIMEOUT_SECS: u64 = 300;

fn browser_err(err: impl std::fmt::Display) -> VisionError {
    VisionError::Browser(err.to_string())
}

/// Launches headless Chrome sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeEngine;

impl ChromeEngine {
    /// Create a Chrome engine
    pub fn new() -> Self {
        Self
    }
}

impl BrowserEngine for ChromeEngine {
    fn launch(&self, config: &LaunchConfig) -> VisionResult<Arc<dyn BrowserSession>> {
        let launch_opts = LaunchOptionsBuilder::default()
            .headless(config.headless)
            .window_size(Some(config.window_size))
            .idle_browser_timeout(Duration::from_secs(IDLE_BROWSER_TIMEOUT_SECS))
            .args(vec![
                OsStr::new("--force-device-scale-factor=1"),
                OsStr::new("--disable-features=OverlayScrollbar"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-background-networking"),
                OsStr::new("--disable-sync"),
                OsStr::new("--hide-scrollbars"),
            ])
            .build()
            .map_err(browser_err)?;
        let browser = Browser::new(launch_opts).map_err(browser_err)?;
        Ok(Arc::new(ChromeSession { browser }))
    }
}

/// A live Chrome process
struct ChromeSession {
    browser: Browser,
}

impl BrowserSession for ChromeSession {
    fn new_page(&self) -> VisionResult<Box<dyn PageHandle>> {
        let tab = self.browser.new_tab().map_err(browser_err)?;
        Ok(Box::new(ChromePage { tab }))
    }

    fn new_isolated_page(&self) -> VisionResult<Box<dyn PageHandle>> {
        let context = self.browser.new_context().map_err(browser_err)?;
        let tab = context.new_tab().map_err(browser_err)?;
        Ok(Box::new(ChromePage { tab }))
    }

    fn close(&self) -> VisionResult<()> {
        // Close remaining tabs eagerly so the process can exit as soon
        // as the last handle to this session drops.
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|_| VisionError::Browser("tab list lock poisoned".to_string()))?;
        for tab in tabs.iter() {
            if let Err(err) = tab.close(true) {
                log::debug!("failed to close tab during session close: {}", err);
            }
        }
        Ok(())
    }
}

/// One Chrome tab
struct ChromePage {
    tab: Arc<Tab>,
}

impl PageHandle for ChromePage {
    fn goto(&self, url: &str) -> VisionResult<()> {
        self.tab.navigate_to(url).map_err(browser_err)?;
        self.tab.wait_until_navigated().map_err(browser_err)?;
        Ok(())
    }

    fn add_style_tag(&self, css: &str) -> VisionResult<()> {
        self.evaluate(&style_injection_script(css))
    }

    fn wait_for_selector(&self, selector: &str) -> VisionResult<()> {
        self.tab.wait_for_element(selector).map_err(browser_err)?;
        Ok(())
    }

    fn hide_elements(&self, selectors: &[String]) -> VisionResult<()> {
        self.evaluate(&soft_hide_script(selectors))
    }

    fn evaluate(&self, script: &str) -> VisionResult<()> {
        self.tab.evaluate(script, true).map_err(browser_err)?;
        Ok(())
    }

    fn screenshot(&self) -> VisionResult<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(browser_err)
    }

    fn screenshot_element(&self, selector: &str) -> VisionResult<Vec<u8>> {
        let element = self.tab.wait_for_element(selector).map_err(browser_err)?;
        element
            .capture_screenshot(CaptureScreenshotFormatOption::Png)
            .map_err(browser_err)
    }

    fn close(&self) -> VisionResult<()> {
        self.tab.close(true).map_err(browser_err)?;
        Ok(())
    }
}
