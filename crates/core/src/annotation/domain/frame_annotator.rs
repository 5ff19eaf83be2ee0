use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for drawing detection overlays onto a frame.
///
/// Implementations modify the frame in-place and draw regions in the order
/// given; overlapping regions are drawn independently.
pub trait FrameAnnotator {
    fn annotate(&self, frame: &mut Frame, regions: &[Region])
        -> Result<(), Box<dyn std::error::Error>>;
}
