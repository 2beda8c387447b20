//! Module grid sampling through a validated perspective transform
use crate::debug::trace;
use crate::error::DecodeError;
use crate::models::{BitMatrix, Point};
use crate::utils::geometry::{PerspectiveTransform, is_convex};

/// Maps the module grid of a symbol onto the image
#[derive(Debug, Clone, Copy)]
pub struct GridSampler {
    transform: PerspectiveTransform,
    dimension: usize,
}

impl GridSampler {
    /// Build the mapping from the mode-message ring. `ring_corners` are image
    /// positions of the ring's corner module centres in top-left, top-right,
    /// bottom-right, bottom-left order; `radius` is the ring's distance from the
    /// centre in modules.
    pub fn new(
        ring_corners: &[Point; 4],
        dimension: usize,
        radius: usize,
    ) -> Result<Self, DecodeError> {
        let low = dimension as f32 / 2.0 - radius as f32;
        let high = dimension as f32 / 2.0 + radius as f32;
        let module_points = [
            Point::new(low, low),
            Point::new(high, low),
            Point::new(high, high),
            Point::new(low, high),
        ];

        if !is_convex(ring_corners) {
            trace!("sampler: ring corners are not convex");
            return Err(DecodeError::GeometryDegenerate);
        }
        let transform = PerspectiveTransform::from_points(&module_points, ring_corners)
            .ok_or(DecodeError::GeometryDegenerate)?;
        if transform.inverse().is_none() {
            return Err(DecodeError::GeometryDegenerate);
        }
        Ok(Self {
            transform,
            dimension,
        })
    }

    /// Modules per side
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Image position of a point given in module coordinates
    pub fn project(&self, p: Point) -> Result<Point, DecodeError> {
        self.transform
            .transform(&p)
            .ok_or(DecodeError::GeometryDegenerate)
    }

    /// Largest distance, in modules, between where the transform puts the
    /// given module-space references and where they were measured
    pub fn reprojection_error(&self, references: &[(Point, Point)], module_size: f32) -> f32 {
        let (module_points, image_points): (Vec<Point>, Vec<Point>) =
            references.iter().copied().unzip();
        self.transform
            .reprojection_error(&module_points, &image_points)
            / module_size.max(f32::EPSILON)
    }

    /// Image corners of the whole symbol, top-left first, clockwise
    pub fn symbol_corners(&self) -> Result<[Point; 4], DecodeError> {
        let d = self.dimension as f32;
        Ok([
            self.project(Point::new(0.0, 0.0))?,
            self.project(Point::new(d, 0.0))?,
            self.project(Point::new(d, d))?,
            self.project(Point::new(0.0, d))?,
        ])
    }

    /// Sample every module centre. A centre more than one pixel outside the
    /// image is an error; closer ones are clamped onto the border.
    pub fn sample(&self, image: &BitMatrix) -> Result<BitMatrix, DecodeError> {
        let width = image.width() as f32;
        let height = image.height() as f32;
        let mut bits = BitMatrix::square(self.dimension);
        for y in 0..self.dimension {
            for x in 0..self.dimension {
                let p = self.project(Point::new(x as f32 + 0.5, y as f32 + 0.5))?;
                if p.x < -1.0 || p.y < -1.0 || p.x > width + 1.0 || p.y > height + 1.0 {
                    trace!("sampler: module ({}, {}) maps outside the image", x, y);
                    return Err(DecodeError::GeometryDegenerate);
                }
                let px = (p.x.max(0.0) as usize).min(image.width().saturating_sub(1));
                let py = (p.y.max(0.0) as usize).min(image.height().saturating_sub(1));
                if image.get(px, py) {
                    bits.set(x, y, true);
                }
            }
        }
        Ok(bits)
    }
}
