use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgb};

use crate::shared::frame::Frame;

/// A ready-to-show RGBA image at the presentation surface's fixed size.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayFrame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl DisplayFrame {
    /// Uniform opaque black image shown while no camera is running.
    pub fn placeholder(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = u8::MAX;
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Stretches `frame` to `width` x `height` and expands it to RGBA.
    pub fn from_frame(
        frame: &Frame,
        width: u32,
        height: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let resized = if (frame.width(), frame.height()) == (width, height) {
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, frame.data().to_vec())
        } else {
            ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(frame.width(), frame.height(), frame.data())
                .map(|view| imageops::resize(&view, width, height, FilterType::Triangle))
        }
        .ok_or("frame buffer does not match its dimensions")?;
        let rgba = DynamicImage::ImageRgb8(resized).into_rgba8();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// True when every pixel is opaque black.
    pub fn is_blank(&self) -> bool {
        self.pixels
            .chunks_exact(4)
            .all(|px| px[..3] == [0, 0, 0] && px[3] == u8::MAX)
    }
}
