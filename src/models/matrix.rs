use crate::models::BitArray;
use std::fmt;

/// Packed two-dimensional grid of modules (or binarized pixels).
///
/// `true` is a dark module. Coordinates outside the grid read as light through
/// [`BitMatrix::get`]; [`BitMatrix::try_get`] reports them as unknown instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create a new bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Create a square matrix
    pub fn square(dimension: usize) -> Self {
        Self::new(dimension, dimension)
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y)
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Tri-state read: `None` when (x, y) lies outside the grid.
    pub fn try_get(&self, x: i32, y: i32) -> Option<bool> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.get(x, y))
    }

    /// Whether the signed coordinate lies inside the grid
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        if value {
            self.data[index / 8] |= 1 << (index % 8);
        } else {
            self.data[index / 8] &= !(1 << (index % 8));
        }
    }

    /// Toggle bit at (x, y)
    pub fn toggle(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        self.data[index / 8] ^= 1 << (index % 8);
    }

    /// Set every bit of the `width` x `height` rectangle at (left, top); clipped at the edges.
    pub fn set_region(&mut self, left: usize, top: usize, width: usize, height: usize) {
        let right = (left + width).min(self.width);
        let bottom = (top + height).min(self.height);
        for y in top..bottom {
            for x in left..right {
                self.set(x, y, true);
            }
        }
    }

    /// Clear all bits to 0
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Copy row `y` into a bit sequence (empty if `y` is out of range)
    pub fn row(&self, y: usize) -> BitArray {
        if y >= self.height {
            return BitArray::new(0);
        }
        let mut row = BitArray::new(self.width);
        for x in 0..self.width {
            if self.get(x, y) {
                row.set(x);
            }
        }
        row
    }

    /// Get raw data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Render with custom glyphs, one line per row, rows separated by `\n`
    pub fn to_string_with(&self, set: &str, unset: &str) -> String {
        let mut out = String::with_capacity(self.height * (self.width * set.len().max(1) + 1));
        for y in 0..self.height {
            if y > 0 {
                out.push('\n');
            }
            for x in 0..self.width {
                out.push_str(if self.get(x, y) { set } else { unset });
            }
        }
        out
    }

    /// Parse the inverse of [`BitMatrix::to_string_with`]. Returns `None` for ragged rows
    /// or unknown glyphs.
    pub fn parse(text: &str, set: char, unset: char) -> Option<Self> {
        let rows: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        let width = rows.first().map(|r| r.chars().count())?;
        let mut matrix = Self::new(width, rows.len());
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return None;
            }
            for (x, c) in row.chars().enumerate() {
                match c {
                    c if c == set => matrix.set(x, y, true),
                    c if c == unset => {}
                    _ => return None,
                }
            }
        }
        Some(matrix)
    }

    /// Binarize a grayscale image with a fixed threshold (pixels darker than it are set)
    pub fn from_luma(image: &image::GrayImage, threshold: u8) -> Self {
        let (width, height) = image.dimensions();
        let mut matrix = Self::new(width as usize, height as usize);
        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel.0[0] < threshold {
                matrix.set(x as usize, y as usize, true);
            }
        }
        matrix
    }

    /// Rasterize into a grayscale image (dark modules black)
    pub fn to_luma(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.get(x as usize, y as usize) {
                image::Luma([0u8])
            } else {
                image::Luma([255u8])
            }
        })
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl fmt::Display for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with("X ", "  "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(8, 8);
        assert_eq!(matrix.width(), 8);
        assert_eq!(matrix.height(), 8);

        matrix.set(3, 4, true);
        assert!(matrix.get(3, 4));
        assert!(!matrix.get(3, 3));

        matrix.toggle(3, 4);
        assert!(!matrix.get(3, 4));

        matrix.set_region(1, 1, 2, 2);
        assert!(matrix.get(2, 2));
        matrix.clear();
        assert!(!matrix.get(2, 2));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10, true); // Should not panic
        assert!(!matrix.get(10, 10));
        assert_eq!(matrix.try_get(10, 1), None);
        assert_eq!(matrix.try_get(-1, 1), None);
        assert_eq!(matrix.try_get(1, 1), Some(false));
    }

    #[test]
    fn test_parse_and_render() {
        let text = "X..X\n.XX.";
        let matrix = BitMatrix::parse(text, 'X', '.').unwrap();
        assert_eq!(matrix.width(), 4);
        assert_eq!(matrix.height(), 2);
        assert_eq!(matrix.to_string_with("X", "."), text);
        assert!(BitMatrix::parse("X.\nX", 'X', '.').is_none());
    }

    #[test]
    fn test_row_extraction() {
        let mut matrix = BitMatrix::new(5, 2);
        matrix.set(0, 1, true);
        matrix.set(4, 1, true);
        let row = matrix.row(1);
        assert_eq!(row.to_string(), "10001");
        assert_eq!(matrix.row(7).len(), 0);
    }

    #[test]
    fn test_luma_round_trip() {
        let mut matrix = BitMatrix::new(3, 3);
        matrix.set(1, 1, true);
        let img = matrix.to_luma();
        assert_eq!(BitMatrix::from_luma(&img, 128), matrix);
    }
}
