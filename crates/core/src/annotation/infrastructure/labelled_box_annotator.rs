use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::shared::constants::{
    BOX_COLOR, BOX_THICKNESS, FACE_LABEL, LABEL_COLOR, LABEL_OFFSET, LABEL_PX,
};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

static LABEL_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSans-Bold.ttf");

#[derive(Error, Debug)]
#[error("embedded label font could not be parsed")]
pub struct InvalidFont;

/// Parses the font bundled for overlay labels.
pub fn label_font() -> Result<FontRef<'static>, InvalidFont> {
    FontRef::try_from_slice(LABEL_FONT).map_err(|_| InvalidFont)
}

/// Draws a rectangle outline per region with a text label above it.
pub struct LabelledBoxAnnotator {
    font: FontRef<'static>,
    label: String,
    box_color: Rgb<u8>,
    label_color: Rgb<u8>,
    thickness: u32,
    label_offset: i32,
    scale: PxScale,
}

impl LabelledBoxAnnotator {
    pub fn new() -> Result<Self, InvalidFont> {
        Ok(Self::with_font(label_font()?))
    }

    pub fn with_font(font: FontRef<'static>) -> Self {
        Self {
            font,
            label: FACE_LABEL.to_string(),
            box_color: Rgb(BOX_COLOR),
            label_color: Rgb(LABEL_COLOR),
            thickness: BOX_THICKNESS,
            label_offset: LABEL_OFFSET,
            scale: PxScale::from(LABEL_PX),
        }
    }

    /// Rectangles making up a `thickness`-pixel outline, outermost first.
    fn outline_rects(&self, region: &Region) -> Vec<Rect> {
        (0..self.thickness as i32)
            .map_while(|inset| {
                let width = region.width - 2 * inset;
                let height = region.height - 2 * inset;
                (width > 0 && height > 0).then(|| {
                    Rect::at(region.x + inset, region.y + inset).of_size(width as u32, height as u32)
                })
            })
            .collect()
    }
}

impl FrameAnnotator for LabelledBoxAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if regions.is_empty() {
            return Ok(());
        }

        let mut canvas = frame
            .as_canvas()
            .ok_or("frame buffer does not match its dimensions")?;
        let ascent = self.font.as_scaled(self.scale).ascent().round() as i32;

        for region in regions.iter().filter(|r| !r.is_empty()) {
            for rect in self.outline_rects(region) {
                draw_hollow_rect_mut(&mut canvas, rect, self.box_color);
            }

            // Baseline sits `label_offset` pixels above the box.
            let top = region.y - self.label_offset - ascent;
            draw_text_mut(
                &mut canvas,
                self.label_color,
                region.x,
                top,
                self.scale,
                &self.font,
                &self.label,
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    #[test]
    fn test_embedded_font_parses() {
        assert!(label_font().is_ok());
    }

    #[test]
    fn test_no_regions_leaves_frame_untouched() {
        let annotator = LabelledBoxAnnotator::new().unwrap();
        let mut frame = black_frame(50, 50);
        annotator.annotate(&mut frame, &[]).unwrap();
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_draws_two_pixel_outline() {
        let annotator = LabelledBoxAnnotator::new().unwrap();
        let mut frame = black_frame(200, 200);
        annotator
            .annotate(&mut frame, &[Region::new(60, 80, 50, 40)])
            .unwrap();

        // Outer and inner outline rows/columns are box-coloured.
        assert_eq!(pixel(&frame, 60, 100), BOX_COLOR);
        assert_eq!(pixel(&frame, 61, 100), BOX_COLOR);
        assert_eq!(pixel(&frame, 109, 100), BOX_COLOR);
        assert_eq!(pixel(&frame, 108, 100), BOX_COLOR);
        assert_eq!(pixel(&frame, 80, 80), BOX_COLOR);
        assert_eq!(pixel(&frame, 80, 81), BOX_COLOR);
        assert_eq!(pixel(&frame, 80, 119), BOX_COLOR);
        // Interior stays untouched.
        assert_eq!(pixel(&frame, 85, 100), [0, 0, 0]);
        assert_eq!(pixel(&frame, 62, 100), [0, 0, 0]);
    }

    #[test]
    fn test_label_is_drawn_above_the_box() {
        let annotator = LabelledBoxAnnotator::new().unwrap();
        let mut frame = black_frame(200, 200);
        let region = Region::new(40, 100, 80, 60);
        annotator.annotate(&mut frame, &[region]).unwrap();

        let label_rows_lit = (0..region.y as u32 - LABEL_OFFSET as u32).any(|y| {
            (region.x as u32..region.right() as u32).any(|x| pixel(&frame, x, y) != [0, 0, 0])
        });
        assert!(label_rows_lit, "expected label pixels above the box");

        let gap_lit = (region.y as u32 - 5..region.y as u32)
            .any(|y| (0..200).any(|x| pixel(&frame, x, y) == LABEL_COLOR));
        assert!(!gap_lit, "label must stay above the box");
    }

    #[test]
    fn test_regions_at_frame_edge_are_clipped() {
        let annotator = LabelledBoxAnnotator::new().unwrap();
        let mut frame = black_frame(40, 40);
        annotator
            .annotate(&mut frame, &[Region::new(-10, -10, 30, 30), Region::new(30, 30, 50, 50)])
            .unwrap();
        assert_eq!(pixel(&frame, 19, 5), BOX_COLOR);
    }

    #[test]
    fn test_degenerate_regions_are_skipped() {
        let annotator = LabelledBoxAnnotator::new().unwrap();
        let mut frame = black_frame(40, 40);
        annotator
            .annotate(&mut frame, &[Region::new(5, 5, 0, 10), Region::new(5, 5, 10, -1)])
            .unwrap();
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_overlapping_regions_are_all_drawn() {
        let annotator = LabelledBoxAnnotator::new().unwrap();
        let mut frame = black_frame(200, 200);
        annotator
            .annotate(
                &mut frame,
                &[Region::new(50, 60, 60, 60), Region::new(70, 80, 60, 60)],
            )
            .unwrap();
        assert_eq!(pixel(&frame, 50, 90), BOX_COLOR);
        assert_eq!(pixel(&frame, 129, 110), BOX_COLOR);
    }
}
