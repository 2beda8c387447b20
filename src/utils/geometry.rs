//! Projective mapping between module space and image space.

use crate::models::Point;

/// 3x3 homography, row-major, normalized so the last entry is 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    m: [f64; 9],
}

impl PerspectiveTransform {
    /// Homography taking each `src[i]` onto `dst[i]`. `None` when three of the
    /// points are collinear.
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (f64::from(src[i].x), f64::from(src[i].y));
            let (dx, dy) = (f64::from(dst[i].x), f64::from(dst[i].y));
            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        let h = solve_linear_system(a, b)?;
        let transform = Self {
            m: [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0],
        };
        transform.is_invertible().then_some(transform)
    }

    /// Map `p`; `None` when it lands on the line at infinity
    pub fn transform(&self, p: &Point) -> Option<Point> {
        let (x, y) = (f64::from(p.x), f64::from(p.y));
        let m = &self.m;
        let w = m[6] * x + m[7] * y + m[8];
        if w.abs() < 1e-12 {
            return None;
        }
        let tx = (m[0] * x + m[1] * y + m[2]) / w;
        let ty = (m[3] * x + m[4] * y + m[5]) / w;
        Some(Point::new(tx as f32, ty as f32))
    }

    /// Determinant of the 3x3 matrix
    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
            + m[2] * (m[3] * m[7] - m[4] * m[6])
    }

    /// True when the mapping can be inverted
    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det.abs() > 1e-12
    }

    /// Inverse mapping via the adjugate
    pub fn inverse(&self) -> Option<Self> {
        if !self.is_invertible() {
            return None;
        }
        let m = &self.m;
        let adj = [
            m[4] * m[8] - m[5] * m[7],
            m[2] * m[7] - m[1] * m[8],
            m[1] * m[5] - m[2] * m[4],
            m[5] * m[6] - m[3] * m[8],
            m[0] * m[8] - m[2] * m[6],
            m[2] * m[3] - m[0] * m[5],
            m[3] * m[7] - m[4] * m[6],
            m[1] * m[6] - m[0] * m[7],
            m[0] * m[4] - m[1] * m[3],
        ];
        let scale = adj[8];
        if scale.abs() < 1e-12 {
            return None;
        }
        Some(Self {
            m: adj.map(|v| v / scale),
        })
    }

    /// Largest distance between `transform(src[i])` and `dst[i]`
    pub fn reprojection_error(&self, src: &[Point], dst: &[Point]) -> f32 {
        src.iter()
            .zip(dst)
            .map(|(s, d)| match self.transform(s) {
                Some(p) => p.distance(d),
                None => f32::INFINITY,
            })
            .fold(0.0f32, f32::max)
    }
}

/// True when the four corners, taken in order, form a strictly convex quadrilateral
pub fn is_convex(quad: &[Point; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let c = quad[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < 1e-6 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Gaussian elimination with partial pivoting
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    let n = 8;
    for i in 0..n {
        let mut max_val = a[i][i].abs();
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }
        if max_val < 1e-10 {
            return None;
        }
        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }
        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f32) -> [Point; 4] {
        [
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn test_scaling_transform() {
        let t = PerspectiveTransform::from_points(&square(100.0), &square(50.0)).unwrap();
        let p = t.transform(&Point::new(50.0, 50.0)).unwrap();
        assert!((p.x - 25.0).abs() < 1e-3 && (p.y - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_perspective_round_trip() {
        let dst = [
            Point::new(12.0, 8.0),
            Point::new(140.0, 20.0),
            Point::new(130.0, 150.0),
            Point::new(5.0, 120.0),
        ];
        let t = PerspectiveTransform::from_points(&square(21.0), &dst).unwrap();
        assert!(t.reprojection_error(&square(21.0), &dst) < 1e-3);

        let inv = t.inverse().unwrap();
        let probe = Point::new(7.5, 13.25);
        let back = inv.transform(&t.transform(&probe).unwrap()).unwrap();
        assert!(back.distance(&probe) < 1e-3);
    }

    #[test]
    fn test_degenerate_points() {
        let collinear = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        ];
        assert!(PerspectiveTransform::from_points(&square(10.0), &collinear).is_none());
    }

    #[test]
    fn test_convexity() {
        assert!(is_convex(&square(4.0)));
        let bowtie = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ];
        assert!(!is_convex(&bowtie));
        let mut reversed = square(4.0);
        reversed.reverse();
        assert!(is_convex(&reversed));
    }
}
