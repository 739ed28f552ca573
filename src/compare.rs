//! Baseline comparison: decides create-baseline, pass, or fail.
//!
//! The pixel-level work sits behind the `Differ` trait; the default
//! `PixelDiff` counts RGBA pixels that differ outside the configured
//! ignore regions and paints a red-on-black diff image for failures.

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use image::{Rgba, RgbaImage};

use crate::config::{Region, RunConfig};
use crate::error::{VisionError, VisionResult};
use crate::summary::Outcome;

/// Result of a pixel-level comparison
#[derive(Debug, Clone)]
pub struct DiffResult {
    /// Percentage of compared pixels that differ
    pub mismatch_percentage: f64,
    /// PNG diff image, present when the mismatch is nonzero and the
    /// dimensions allowed a pixel-wise overlay
    pub diff_image: Option<Vec<u8>>,
}

/// Pixel-level comparison between a baseline and a current capture
pub trait Differ: Send + Sync {
    /// Compare two PNG byte buffers, excluding the ignore regions
    fn diff(&self, baseline: &[u8], current: &[u8], ignore: &[Region]) -> VisionResult<DiffResult>;
}

/// Default differ: exact per-pixel RGBA comparison with region masking
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDiff;

impl PixelDiff {
    fn is_masked(px: u32, py: u32, ignore: &[Region]) -> bool {
        ignore.iter().any(|region| region.contains(px, py))
    }
}

impl Differ for PixelDiff {
    fn diff(&self, baseline: &[u8], current: &[u8], ignore: &[Region]) -> VisionResult<DiffResult> {
        let baseline_img = image::load_from_memory(baseline)?.to_rgba8();
        let current_img = image::load_from_memory(current)?.to_rgba8();

        if baseline_img.dimensions() != current_img.dimensions() {
            // No pixel-wise overlay exists for mismatched dimensions.
            return Ok(DiffResult {
                mismatch_percentage: 100.0,
                diff_image: None,
            });
        }

        let (width, height) = baseline_img.dimensions();
        let mut compared: u64 = 0;
        let mut differing: u64 = 0;
        let mut diff_img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

        for py in 0..height {
            for px in 0..width {
                if Self::is_masked(px, py, ignore) {
                    continue;
                }
                compared += 1;
                if baseline_img.get_pixel(px, py) != current_img.get_pixel(px, py) {
                    differing += 1;
                    diff_img.put_pixel(px, py, Rgba([255, 0, 0, 255]));
                }
            }
        }

        let mismatch_percentage = if compared == 0 {
            0.0
        } else {
            differing as f64 * 100.0 / compared as f64
        };

        let diff_image = if differing > 0 {
            let mut bytes = Vec::new();
            image::DynamicImage::ImageRgba8(diff_img)
                .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
            Some(bytes)
        } else {
            None
        };

        Ok(DiffResult {
            mismatch_percentage,
            diff_image,
        })
    }
}

/// Decides the outcome for one captured test image
pub struct Comparator {
    baseline_dir: PathBuf,
    current_dir: PathBuf,
    diff_dir: PathBuf,
    overwrite: bool,
    differ: Box<dyn Differ>,
}

impl Comparator {
    /// Create a comparator from the run configuration, using `PixelDiff`
    pub fn new(config: &RunConfig) -> Self {
        Self {
            baseline_dir: config.baseline_dir.clone(),
            current_dir: config.current_dir.clone(),
            diff_dir: config.diff_dir.clone(),
            overwrite: config.overwrite,
            differ: Box::new(PixelDiff),
        }
    }

    /// Replace the differ implementation
    pub fn with_differ(mut self, differ: Box<dyn Differ>) -> Self {
        self.differ = differ;
        self
    }

    /// Compare the named current capture against its stored baseline.
    ///
    /// A missing baseline, or overwrite mode, promotes the capture to
    /// baseline and reports `BaselineCreated` — never a failure. Any
    /// nonzero mismatch fails; there is no tolerance band.
    pub fn compare(&self, image_name: &str, ignore_regions: &[Region]) -> VisionResult<Outcome> {
        let baseline_path = self.baseline_dir.join(image_name);
        let current_path = self.current_dir.join(image_name);

        if self.overwrite || !baseline_path.exists() {
            fs::copy(&current_path, &baseline_path).map_err(|err| {
                VisionError::Io(std::io::Error::other(format!(
                    "Failed to promote '{}' to baseline: {}",
                    current_path.display(),
                    err
                )))
            })?;
            return Ok(Outcome::BaselineCreated);
        }

        let baseline_bytes = fs::read(&baseline_path)?;
        let current_bytes = fs::read(&current_path)?;
        let result = self
            .differ
            .diff(&baseline_bytes, &current_bytes, ignore_regions)?;

        if result.mismatch_percentage == 0.0 {
            return Ok(Outcome::Pass);
        }

        let diff_path = self.diff_dir.join(image_name);
        match result.diff_image {
            Some(bytes) => fs::write(&diff_path, bytes)?,
            // Dimension mismatch: keep the current capture as the artifact.
            None => {
                fs::copy(&current_path, &diff_path)?;
            }
        }

        Ok(Outcome::Fail {
            mismatch: result.mismatch_percentage,
            diff_path,
        })
    }
}
