use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::{GROUP_EPS, MIN_NEIGHBORS, SCALE_FACTOR};
use crate::shared::region::Region;

use super::haar_cascade::HaarCascade;
use super::integral_image::IntegralImage;
use super::rect_grouping::group_rectangles;

/// Multi-scale search and grouping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Ratio between consecutive pyramid levels. Must exceed 1.
    pub scale_factor: f64,
    /// Minimum overlapping raw hits for a face to be reported.
    pub min_neighbors: usize,
    pub group_eps: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: SCALE_FACTOR,
            min_neighbors: MIN_NEIGHBORS,
            group_eps: GROUP_EPS,
        }
    }
}

/// Sliding-window face detector over an image pyramid.
///
/// The cascade is shared so several sessions can reuse one parsed model.
#[derive(Clone)]
pub struct HaarCascadeDetector {
    cascade: Arc<HaarCascade>,
    params: DetectionParams,
}

impl HaarCascadeDetector {
    pub fn new(cascade: Arc<HaarCascade>, params: DetectionParams) -> Result<Self, &'static str> {
        if params.scale_factor.is_nan() || params.scale_factor <= 1.0 {
            return Err("scale_factor must be > 1");
        }
        if params.group_eps.is_nan() || params.group_eps <= 0.0 {
            return Err("group_eps must be > 0");
        }
        Ok(Self { cascade, params })
    }

    /// Loads a cascade file and builds a detector with default parameters.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let cascade = HaarCascade::load(path)?;
        Ok(Self::new(Arc::new(cascade), DetectionParams::default())?)
    }

    pub fn params(&self) -> DetectionParams {
        self.params
    }

    /// Every window accepted by the cascade, before grouping.
    ///
    /// The image is shrunk by `scale_factor` per level while the cascade
    /// window stays fixed; hits are mapped back to source coordinates.
    /// Window offsets run up to and including the last position that fits.
    pub fn candidates(&self, gray: &GrayImage) -> Vec<Region> {
        let (win_w, win_h) = (self.cascade.window_width(), self.cascade.window_height());
        let mut found = Vec::new();
        let mut factor = 1.0f64;

        loop {
            let scaled_w = (gray.width() as f64 / factor).round() as u32;
            let scaled_h = (gray.height() as f64 / factor).round() as u32;
            if scaled_w < win_w || scaled_h < win_h {
                break;
            }

            let scaled: Cow<GrayImage> = if (scaled_w, scaled_h) == gray.dimensions() {
                Cow::Borrowed(gray)
            } else {
                Cow::Owned(imageops::resize(gray, scaled_w, scaled_h, FilterType::Triangle))
            };
            let ii = IntegralImage::new(&scaled);

            let found_w = (win_w as f64 * factor).round() as i32;
            let found_h = (win_h as f64 * factor).round() as i32;
            let step: u32 = if factor > 2.0 { 1 } else { 2 };

            for y in (0..=scaled_h - win_h).step_by(step as usize) {
                let mut x = 0;
                while x <= scaled_w - win_w {
                    match self.cascade.rejecting_stage(&ii, x, y) {
                        None => found.push(Region::new(
                            (x as f64 * factor).round() as i32,
                            (y as f64 * factor).round() as i32,
                            found_w,
                            found_h,
                        )),
                        // Rejected by the first stage: the next window over is skipped too.
                        Some(0) => x += step,
                        Some(_) => {}
                    }
                    x += step;
                }
            }

            factor *= self.params.scale_factor;
        }

        found
    }
}

impl FaceDetector for HaarCascadeDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let candidates = self.candidates(gray);
        let faces = group_rectangles(&candidates, self.params.min_neighbors, self.params.group_eps);
        log::trace!("{} raw hits grouped into {} faces", candidates.len(), faces.len());
        Ok(faces)
    }
}
