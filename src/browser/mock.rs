//! Deterministic mock driver for testing the orchestration.
//!
//! Pages are "rendered" as solid-color PNG frames with an optional
//! rectangular patch, so tests can produce pixel-identical captures,
//! controlled differences, and scripted transient failures without a
//! real browser.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbImage;

use super::{BrowserEngine, BrowserSession, LaunchConfig, PageHandle};
use crate::config::Region;
use crate::error::{VisionError, VisionResult};

/// Frame dimensions used by the mock driver
const FRAME_WIDTH: u32 = 80;
const FRAME_HEIGHT: u32 = 60;

/// A synthetic page rendering: a solid color with an optional patch
#[derive(Debug, Clone)]
pub struct MockFrame {
    color: [u8; 3],
    patch: Option<(Region, [u8; 3])>,
}

impl MockFrame {
    /// Create a solid-color frame
    pub fn new(color: [u8; 3]) -> Self {
        Self { color, patch: None }
    }

    /// Paint a rectangular patch over the base color
    pub fn with_patch(mut self, region: Region, color: [u8; 3]) -> Self {
        self.patch = Some((region, color));
        self
    }

    /// Render the frame as PNG bytes
    pub fn render_png(&self) -> VisionResult<Vec<u8>> {
        let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, image::Rgb(self.color));
        if let Some((region, color)) = &self.patch {
            for py in region.y..(region.y + region.height).min(FRAME_HEIGHT) {
                for px in region.x..(region.x + region.width).min(FRAME_WIDTH) {
                    img.put_pixel(px, py, image::Rgb(*color));
                }
            }
        }
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| VisionError::Browser(format!("Failed to encode mock frame: {}", e)))?;
        Ok(bytes)
    }
}

impl Default for MockFrame {
    fn default() -> Self {
        Self::new([255, 255, 255])
    }
}

#[derive(Default)]
struct MockState {
    frames: Mutex<HashMap<String, MockFrame>>,
    fail_remaining: Mutex<HashMap<String, u32>>,
    launches: AtomicUsize,
    pages_opened: AtomicUsize,
    isolated_pages: AtomicUsize,
    hidden_selectors: Mutex<Vec<String>>,
    evaluated_scripts: Mutex<Vec<String>>,
}

/// Scriptable browser engine for tests
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<MockState>,
}

impl MockEngine {
    /// Create a mock engine with white default frames
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frame rendered for URLs containing `url_part`
    pub fn set_frame(&self, url_part: impl Into<String>, frame: MockFrame) {
        self.state
            .frames
            .lock()
            .expect("mock frames lock")
            .insert(url_part.into(), frame);
    }

    /// Make the next `count` navigations to URLs containing `url_part` fail
    pub fn fail_navigations(&self, url_part: impl Into<String>, count: u32) {
        self.state
            .fail_remaining
            .lock()
            .expect("mock failure lock")
            .insert(url_part.into(), count);
    }

    /// Number of sessions launched so far
    pub fn launches(&self) -> usize {
        self.state.launches.load(Ordering::SeqCst)
    }

    /// Number of page contexts opened so far
    pub fn pages_opened(&self) -> usize {
        self.state.pages_opened.load(Ordering::SeqCst)
    }

    /// Number of isolated page contexts opened so far
    pub fn isolated_pages(&self) -> usize {
        self.state.isolated_pages.load(Ordering::SeqCst)
    }

    /// Selectors soft-hidden across all pages, in call order
    pub fn hidden_selectors(&self) -> Vec<String> {
        self.state
            .hidden_selectors
            .lock()
            .expect("mock hidden lock")
            .clone()
    }

    /// Scripts evaluated across all pages, in call order
    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.state
            .evaluated_scripts
            .lock()
            .expect("mock scripts lock")
            .clone()
    }
}

impl BrowserEngine for MockEngine {
    fn launch(&self, _config: &LaunchConfig) -> VisionResult<Arc<dyn BrowserSession>> {
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    state: Arc<MockState>,
}

impl BrowserSession for MockSession {
    fn new_page(&self) -> VisionResult<Box<dyn PageHandle>> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            state: Arc::clone(&self.state),
            url: Mutex::new(None),
        }))
    }

    fn new_isolated_page(&self) -> VisionResult<Box<dyn PageHandle>> {
        self.state.isolated_pages.fetch_add(1, Ordering::SeqCst);
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            state: Arc::clone(&self.state),
            url: Mutex::new(None),
        }))
    }

    fn close(&self) -> VisionResult<()> {
        Ok(())
    }
}

struct MockPage {
    state: Arc<MockState>,
    url: Mutex<Option<String>>,
}

impl MockPage {
    fn current_frame(&self) -> MockFrame {
        let url = self.url.lock().expect("mock url lock").clone();
        let frames = self.state.frames.lock().expect("mock frames lock");
        if let Some(url) = url {
            for (part, frame) in frames.iter() {
                if url.contains(part.as_str()) {
                    return frame.clone();
                }
            }
        }
        MockFrame::default()
    }
}

impl PageHandle for MockPage {
    fn goto(&self, url: &str) -> VisionResult<()> {
        let mut fail_remaining = self.state.fail_remaining.lock().expect("mock failure lock");
        for (part, remaining) in fail_remaining.iter_mut() {
            if url.contains(part.as_str()) && *remaining > 0 {
                *remaining -= 1;
                return Err(VisionError::Browser(format!(
                    "scripted navigation failure for {}",
                    url
                )));
            }
        }
        drop(fail_remaining);
        *self.url.lock().expect("mock url lock") = Some(url.to_string());
        Ok(())
    }

    fn add_style_tag(&self, _css: &str) -> VisionResult<()> {
        Ok(())
    }

    fn wait_for_selector(&self, _selector: &str) -> VisionResult<()> {
        Ok(())
    }

    fn hide_elements(&self, selectors: &[String]) -> VisionResult<()> {
        self.state
            .hidden_selectors
            .lock()
            .expect("mock hidden lock")
            .extend(selectors.iter().cloned());
        Ok(())
    }

    fn evaluate(&self, script: &str) -> VisionResult<()> {
        self.state
            .evaluated_scripts
            .lock()
            .expect("mock scripts lock")
            .push(script.to_string());
        Ok(())
    }

    fn screenshot(&self) -> VisionResult<Vec<u8>> {
        self.current_frame().render_png()
    }

    fn screenshot_element(&self, _selector: &str) -> VisionResult<Vec<u8>> {
        self.current_frame().render_png()
    }

    fn close(&self) -> VisionResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_frames_render_identical_png() {
        let a = MockFrame::new([10, 20, 30]).render_png().unwrap();
        let b = MockFrame::new([10, 20, 30]).render_png().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_patch_changes_rendering() {
        let plain = MockFrame::new([10, 20, 30]).render_png().unwrap();
        let patched = MockFrame::new([10, 20, 30])
            .with_patch(
                Region {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4,
                },
                [200, 0, 0],
            )
            .render_png()
            .unwrap();
        assert_ne!(plain, patched);
    }

    #[test]
    fn test_scripted_navigation_failures_run_out() {
        let engine = MockEngine::new();
        engine.fail_navigations("/flaky", 2);
        let session = engine.launch(&LaunchConfig::default()).unwrap();
        let page = session.new_page().unwrap();

        assert!(page.goto("http://localhost/flaky").is_err());
        assert!(page.goto("http://localhost/flaky").is_err());
        assert!(page.goto("http://localhost/flaky").is_ok());
    }
}
