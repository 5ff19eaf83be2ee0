use image::{GrayImage, ImageBuffer, Luma, Rgb};

/// A single captured camera frame: contiguous RGB bytes in row-major order.
///
/// Frames live for one tick of the capture loop and are never retained.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

pub type RgbCanvas<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Position of this frame in the capture session, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Borrows the pixels as a drawable RGB image.
    ///
    /// Returns `None` if the buffer does not match the frame dimensions.
    pub fn as_canvas(&mut self) -> Option<RgbCanvas<'_>> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_mut_slice())
    }

    /// Luminance image with the BT.601 weights the cascade models were
    /// trained on (fixed-point, 14 fractional bits).
    pub fn to_gray(&self) -> GrayImage {
        let luma: Vec<u8> = self
            .data
            .chunks_exact(Self::CHANNELS)
            .map(|px| {
                let r = px[0] as u32;
                let g = px[1] as u32;
                let b = px[2] as u32;
                ((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8
            })
            .collect();
        ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(self.width, self.height, luma)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}
