use image::GrayImage;

use crate::shared::region::Region;

/// Domain interface for face detection on a luminance image.
///
/// Results are produced fresh per call; implementations keep no identity
/// across frames.
pub trait FaceDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
