use image::GrayImage;
use ndarray::Array2;

/// Summed-area tables of pixel values and squared pixel values.
///
/// Both tables have one extra leading row and column of zeros, so the sum
/// over any rectangle is four lookups.
pub struct IntegralImage {
    sum: Array2<u64>,
    square_sum: Array2<u64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = (gray.width() as usize, gray.height() as usize);
        let mut sum = Array2::<u64>::zeros((height + 1, width + 1));
        let mut square_sum = Array2::<u64>::zeros((height + 1, width + 1));

        for (y, row) in gray.rows().enumerate() {
            let mut row_sum = 0u64;
            let mut row_square_sum = 0u64;
            for (x, px) in row.enumerate() {
                let v = px[0] as u64;
                row_sum += v;
                row_square_sum += v * v;
                sum[[y + 1, x + 1]] = sum[[y, x + 1]] + row_sum;
                square_sum[[y + 1, x + 1]] = square_sum[[y, x + 1]] + row_square_sum;
            }
        }

        Self { sum, square_sum }
    }

    /// Width of the source image.
    pub fn width(&self) -> u32 {
        (self.sum.ncols() - 1) as u32
    }

    /// Height of the source image.
    pub fn height(&self) -> u32 {
        (self.sum.nrows() - 1) as u32
    }

    pub fn rect_sum(&self, x: u32, y: u32, width: u32, height: u32) -> u64 {
        lookup(&self.sum, x, y, width, height)
    }

    pub fn rect_square_sum(&self, x: u32, y: u32, width: u32, height: u32) -> u64 {
        lookup(&self.square_sum, x, y, width, height)
    }
}

fn lookup(table: &Array2<u64>, x: u32, y: u32, width: u32, height: u32) -> u64 {
    let (x0, y0) = (x as usize, y as usize);
    let (x1, y1) = (x0 + width as usize, y0 + height as usize);
    // Added before subtracting so intermediate values never underflow.
    (table[[y1, x1]] + table[[y0, x0]]) - (table[[y0, x1]] + table[[y1, x0]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn image_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)]))
    }

    #[test]
    fn test_dimensions() {
        let ii = IntegralImage::new(&GrayImage::new(7, 3));
        assert_eq!(ii.width(), 7);
        assert_eq!(ii.height(), 3);
    }

    #[test]
    fn test_full_image_sum() {
        let gray = image_from_fn(4, 3, |_, _| 2);
        let ii = IntegralImage::new(&gray);
        assert_eq!(ii.rect_sum(0, 0, 4, 3), 24);
        assert_eq!(ii.rect_square_sum(0, 0, 4, 3), 48);
    }

    #[test]
    fn test_sub_rectangle_matches_brute_force() {
        let gray = image_from_fn(9, 7, |x, y| ((x * 31 + y * 17) % 256) as u8);
        let ii = IntegralImage::new(&gray);

        let (rx, ry, rw, rh) = (2, 1, 5, 4);
        let mut expected = 0u64;
        let mut expected_sq = 0u64;
        for y in ry..ry + rh {
            for x in rx..rx + rw {
                let v = gray.get_pixel(x, y)[0] as u64;
                expected += v;
                expected_sq += v * v;
            }
        }
        assert_eq!(ii.rect_sum(rx, ry, rw, rh), expected);
        assert_eq!(ii.rect_square_sum(rx, ry, rw, rh), expected_sq);
    }

    #[test]
    fn test_empty_rectangle_is_zero() {
        let gray = image_from_fn(5, 5, |_, _| 200);
        let ii = IntegralImage::new(&gray);
        assert_eq!(ii.rect_sum(2, 2, 0, 3), 0);
    }

    #[test]
    fn test_single_pixel() {
        let gray = image_from_fn(3, 3, |x, y| if (x, y) == (1, 2) { 9 } else { 0 });
        let ii = IntegralImage::new(&gray);
        assert_eq!(ii.rect_sum(1, 2, 1, 1), 9);
        assert_eq!(ii.rect_square_sum(1, 2, 1, 1), 81);
    }
}
