/// 2D point with floating point coordinates (image pixels or module space)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Translate point by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Nearest pixel
    pub fn round(&self) -> PointI {
        PointI::new(self.x.round() as i32, self.y.round() as i32)
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Integer point for pixel coordinates. Signed so walks can step past the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointI {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl PointI {
    /// Create a new integer point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Step by (dx, dy)
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Pixel center as a float point
    pub fn to_point(self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }

    /// Euclidean distance to another pixel
    pub fn distance(&self, other: &PointI) -> f32 {
        self.to_point().distance(&other.to_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ops() {
        let a = Point::new(1.0, 1.0);
        let b = Point::new(4.0, 5.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert_eq!(a.midpoint(&b), Point::new(2.5, 3.0));
        assert_eq!(b.translate(-0.4, 0.6).round(), PointI::new(4, 6));
    }

    #[test]
    fn test_point_i() {
        let p = PointI::new(2, 3).offset(3, 4);
        assert_eq!(p, PointI::new(5, 7));
        assert!((PointI::new(0, 0).distance(&PointI::new(3, 4)) - 5.0).abs() < 1e-6);
    }
}
