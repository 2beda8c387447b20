//! Aztec bullseye location: a row scan for the 1:1:1:1:1:1:1 ring signature,
//! then rays cast from each candidate centre to trace the ring outline at any
//! rotation.
use crate::debug::trace;
use crate::error::DecodeError;
use crate::models::{BitMatrix, Point, PointI};
use crate::utils::geometry::{PerspectiveTransform, is_convex};
use rayon::prelude::*;

/// Possible bullseye centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BullseyeCandidate {
    /// Centre in image coordinates
    pub center: Point,
    /// Estimated pixels per module
    pub module_size: f32,
    /// Scan rows that confirmed this centre
    pub hits: usize,
}

impl BullseyeCandidate {
    /// Single-hit candidate at `(x, y)`
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            hits: 1,
        }
    }

    /// Pixel holding the centre
    pub fn pixel(&self) -> PointI {
        PointI::new(self.center.x.floor() as i32, self.center.y.floor() as i32)
    }
}

/// Row-scan finder for bullseye centres
pub struct BullseyeFinder;

impl BullseyeFinder {
    /// Every candidate, ranked by hit count. Reference grid crossings tie with
    /// the real centre here, so callers rank again after [`locate`].
    pub fn detect(matrix: &BitMatrix) -> Vec<BullseyeCandidate> {
        let height = matrix.height();
        let found: Vec<BullseyeCandidate> = (0..height)
            .into_par_iter()
            .filter(|&y| Self::has_significant_edges(matrix, y))
            .flat_map_iter(|y| Self::scan_row(matrix, y))
            .collect();

        let mut merged = Self::merge_candidates(found);
        merged.sort_by(|a, b| b.hits.cmp(&a.hits));
        trace!("bullseye: {} candidates after merge", merged.len());
        merged
    }

    /// A bullseye row crosses at least eight edges
    fn has_significant_edges(matrix: &BitMatrix, y: usize) -> bool {
        let mut transitions = 0;
        let mut prev = matrix.get(0, y);
        for x in 1..matrix.width() {
            let color = matrix.get(x, y);
            if color != prev {
                transitions += 1;
                if transitions >= 8 {
                    return true;
                }
                prev = color;
            }
        }
        false
    }

    fn scan_row(matrix: &BitMatrix, y: usize) -> Vec<BullseyeCandidate> {
        let width = matrix.width();
        let mut candidates = Vec::new();
        let mut run_lengths: Vec<usize> = Vec::new();
        let mut run_starts: Vec<usize> = Vec::new();
        let mut run_colors: Vec<bool> = Vec::new();
        let mut run_start = 0usize;
        let mut current = matrix.get(0, y);

        for x in 1..=width {
            let color = x < width && matrix.get(x, y);
            if x < width && color == current {
                continue;
            }
            run_lengths.push(x - run_start);
            run_starts.push(run_start);
            run_colors.push(current);
            run_start = x;
            current = color;

            let n = run_lengths.len();
            if n < 9 || !run_colors[n - 9] {
                continue;
            }
            let lengths = &run_lengths[n - 9..];
            let Some(unit) = Self::check_pattern(lengths) else {
                continue;
            };
            let center_x = run_starts[n - 5] as f32 + lengths[4] as f32 / 2.0;
            if let Some(candidate) = Self::cross_check(matrix, center_x, y as f32 + 0.5, unit) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    /// Nine runs, dark first: the inner seven one module each, the outer two at
    /// least half a module. Returns the module size.
    fn check_pattern(lengths: &[usize]) -> Option<f32> {
        let inner = &lengths[1..8];
        let total: usize = inner.iter().sum();
        if total < 7 {
            return None;
        }
        let unit = total as f32 / 7.0;
        let within = |len: usize| {
            let r = len as f32 / unit;
            (0.5..=1.5).contains(&r)
        };
        if !inner.iter().all(|&l| within(l)) {
            return None;
        }
        if (lengths[0] as f32) < unit * 0.5 || (lengths[8] as f32) < unit * 0.5 {
            return None;
        }
        Some(unit)
    }

    /// Confirm the signature vertically through the centre, then horizontally
    /// through the refined centre
    fn cross_check(
        matrix: &BitMatrix,
        center_x: f32,
        center_y: f32,
        unit: f32,
    ) -> Option<BullseyeCandidate> {
        let x = center_x.floor() as i32;
        let y = center_y.floor() as i32;
        let (refined_y, unit_y) = Self::check_axis(matrix, PointI::new(x, y), (0, 1), unit)?;
        let (refined_x, unit_x) =
            Self::check_axis(matrix, PointI::new(x, refined_y.floor() as i32), (1, 0), unit)?;
        Some(BullseyeCandidate::new(
            refined_x,
            refined_y,
            (unit + unit_x + unit_y) / 3.0,
        ))
    }

    /// Measure the seven inner runs along one axis through `origin`. Returns the
    /// centre coordinate on that axis and the measured module size.
    fn check_axis(
        matrix: &BitMatrix,
        origin: PointI,
        (dx, dy): (i32, i32),
        unit: f32,
    ) -> Option<(f32, f32)> {
        if matrix.try_get(origin.x, origin.y) != Some(true) {
            return None;
        }
        let limit = (unit * 2.0).ceil() as i32 + 2;
        let run = |from: PointI, sx: i32, sy: i32, dark: bool| -> Option<(i32, PointI)> {
            let mut p = from;
            let mut len = 0;
            while matrix.try_get(p.x, p.y) == Some(dark) {
                len += 1;
                if len > limit {
                    return None;
                }
                p = p.offset(sx, sy);
            }
            Some((len, p))
        };

        // Centre run in both directions
        let (back, back_end) = run(origin, -dx, -dy, true)?;
        let (fwd, fwd_end) = run(origin, dx, dy, true)?;
        let center_len = back + fwd - 1;

        let mut lengths = vec![center_len];
        let mut p_back = back_end;
        let mut p_fwd = fwd_end;
        let mut dark = false;
        for _ in 0..3 {
            let (lb, nb) = run(p_back, -dx, -dy, dark)?;
            let (lf, nf) = run(p_fwd, dx, dy, dark)?;
            if lb == 0 || lf == 0 {
                return None;
            }
            lengths.push(lb);
            lengths.push(lf);
            p_back = nb;
            p_fwd = nf;
            dark = !dark;
        }
        // The outer dark ring only has to be there
        if matrix.try_get(p_back.x, p_back.y) != Some(true)
            || matrix.try_get(p_fwd.x, p_fwd.y) != Some(true)
        {
            return None;
        }

        let total: i32 = lengths.iter().sum();
        let measured = total as f32 / 7.0;
        if (measured - unit).abs() > unit * 0.5 {
            return None;
        }
        if !lengths
            .iter()
            .all(|&l| (0.5..=1.5).contains(&(l as f32 / measured)))
        {
            return None;
        }

        let start = if dx != 0 { origin.x - back + 1 } else { origin.y - back + 1 };
        Some((start as f32 + center_len as f32 / 2.0, measured))
    }

    fn merge_candidates(candidates: Vec<BullseyeCandidate>) -> Vec<BullseyeCandidate> {
        let mut merged: Vec<BullseyeCandidate> = Vec::new();
        for candidate in candidates {
            let existing = merged.iter_mut().find(|e| {
                let limit = 2.0 * e.module_size.max(candidate.module_size);
                e.center.distance_squared(&candidate.center) <= limit * limit
            });
            match existing {
                Some(e) => {
                    let w = e.hits as f32;
                    let total = w + 1.0;
                    e.center = Point::new(
                        (e.center.x * w + candidate.center.x) / total,
                        (e.center.y * w + candidate.center.y) / total,
                    );
                    e.module_size = (e.module_size * w + candidate.module_size) / total;
                    e.hits += 1;
                }
                None => merged.push(candidate),
            }
        }
        merged
    }
}

/// Rays cast from a candidate centre, evenly spread over the full turn
const RAY_COUNT: usize = 120;

/// Sampling distance along a ray, in pixels
const RAY_STEP: f32 = 0.25;

/// Share of rays that must show the ring sequence
const MIN_RAY_SHARE: f32 = 0.75;

/// Share of bullseye modules that must have the expected colour
const MIN_RING_QUALITY: f32 = 0.9;

/// Bullseye confirmed around a candidate, with the projective mapping from
/// module space (centre module at the origin, one unit per module) to the image
#[derive(Debug, Clone, Copy)]
pub struct Bullseye {
    /// Compact (five rings) or full-range (seven rings) reading
    pub compact: bool,
    /// Share of bullseye modules that matched the expected ring colour
    pub quality: f32,
    /// Pixels per module along the measured edge
    pub module_size: f32,
    transform: PerspectiveTransform,
}

impl Bullseye {
    /// Image position of a point in centred module coordinates
    pub fn project(&self, p: Point) -> Option<Point> {
        self.transform.transform(&p)
    }

    /// Image positions of the corner module centres of the square ring
    /// `radius` modules out, clockwise. The first corner is whichever the
    /// edge fit met first; orientation is resolved later.
    pub fn ring_corners(&self, radius: f32) -> Result<[Point; 4], DecodeError> {
        let mut out = [Point::default(); 4];
        for (o, (sx, sy)) in out.iter_mut().zip(SQUARE) {
            *o = self
                .project(Point::new(sx * radius, sy * radius))
                .ok_or(DecodeError::GeometryDegenerate)?;
        }
        Ok(out)
    }
}

/// Unit square corners in the winding of increasing ray angle
const SQUARE: [(f32, f32); 4] = [(1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0)];

/// Confirm the bullseye around `candidate`. Returns the full-range reading
/// first when the seven-ring pattern holds, then the compact one; an empty
/// list means no ring structure was found.
pub fn locate(matrix: &BitMatrix, candidate: &BullseyeCandidate) -> Vec<Bullseye> {
    let center = candidate.center;
    let pixel = candidate.pixel();
    if matrix.try_get(pixel.x, pixel.y) != Some(true) {
        return Vec::new();
    }
    let max_dist = candidate.module_size * 11.0;
    let min_run = candidate.module_size * 0.35;
    let rays: Vec<(Point, Vec<f32>)> = (0..RAY_COUNT)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / RAY_COUNT as f32;
            let (dy, dx) = angle.sin_cos();
            let edges = ray_edges(matrix, center, (dx, dy), max_dist, min_run, 6);
            (Point::new(dx, dy), edges)
        })
        .collect();

    [(false, 6usize), (true, 4usize)]
        .into_iter()
        .filter_map(|(compact, edge)| fit_bullseye(matrix, center, &rays, edge, compact))
        .collect()
}

/// Fit the square outline where ring `edge - 1` meets the outermost dark ring
/// and check every bullseye module through the resulting mapping
fn fit_bullseye(
    matrix: &BitMatrix,
    center: Point,
    rays: &[(Point, Vec<f32>)],
    edge: usize,
    compact: bool,
) -> Option<Bullseye> {
    let points: Vec<Point> = rays
        .iter()
        .filter(|(_, edges)| evenly_spaced(edges, edge))
        .map(|(dir, edges)| center.translate(dir.x * edges[edge - 1], dir.y * edges[edge - 1]))
        .collect();
    if (points.len() as f32) < RAY_COUNT as f32 * MIN_RAY_SHARE {
        trace!(
            "bullseye: {} of {} rays show {} rings",
            points.len(),
            RAY_COUNT,
            edge
        );
        return None;
    }

    let quad = fit_quadrilateral(&points, center)?;
    let half = edge as f32 - 0.5;
    let square: [Point; 4] = SQUARE.map(|(sx, sy)| Point::new(sx * half, sy * half));
    let transform = PerspectiveTransform::from_points(&square, &quad)?;

    let (matching, total) = ring_agreement(matrix, &transform, edge);
    let quality = matching as f32 / total as f32;
    if quality < MIN_RING_QUALITY {
        trace!("bullseye: {} ring modules match {:.2}", edge + 1, quality);
        return None;
    }

    let perimeter: f32 = (0..4).map(|i| quad[i].distance(&quad[(i + 1) % 4])).sum();
    Some(Bullseye {
        compact,
        quality,
        module_size: perimeter / 4.0 / (2.0 * half),
        transform,
    })
}

/// Distances from `center` along `dir` at which the colour flips, nearest
/// first. The first run must be dark; runs shorter than `min_run` are noise
/// and fold into their neighbours.
fn ray_edges(
    matrix: &BitMatrix,
    center: Point,
    (dx, dy): (f32, f32),
    max_dist: f32,
    min_run: f32,
    wanted: usize,
) -> Vec<f32> {
    // (colour, start, end) of each raw run
    let mut raw: Vec<(bool, f32, f32)> = Vec::new();
    let mut current: Option<(bool, f32)> = None;
    let mut t = 0.0f32;
    while t <= max_dist {
        let x = (center.x + t * dx).floor() as i32;
        let y = (center.y + t * dy).floor() as i32;
        let Some(color) = matrix.try_get(x, y) else {
            break;
        };
        match current {
            Some((c, start)) if c != color => {
                // The flip lies between this sample and the previous one
                let edge = t - RAY_STEP / 2.0;
                raw.push((c, start, edge));
                current = Some((color, edge));
            }
            None => current = Some((color, t)),
            _ => {}
        }
        t += RAY_STEP;
    }
    if let Some((c, start)) = current {
        raw.push((c, start, t));
    }

    let mut runs: Vec<(bool, f32, f32)> = Vec::with_capacity(raw.len());
    for (color, start, end) in raw {
        match runs.last_mut() {
            Some(last) if last.0 == color || end - start < min_run => last.2 = end,
            _ => runs.push((color, start, end)),
        }
    }
    if runs.first().is_none_or(|first| !first.0) {
        return Vec::new();
    }
    runs.iter().skip(1).take(wanted).map(|run| run.1).collect()
}

/// The first `count` edges sit half a ring pitch apart from one another,
/// within half a pitch
fn evenly_spaced(edges: &[f32], count: usize) -> bool {
    if count == 0 || edges.len() < count {
        return false;
    }
    let pitch = edges[count - 1] / (count as f32 - 0.5);
    edges[..count]
        .iter()
        .enumerate()
        .all(|(j, &e)| (e - (j as f32 + 0.5) * pitch).abs() <= 0.5 * pitch)
}

/// Corners of the convex quadrilateral traced by `points`, which are ordered
/// by angle around `center`. Coarse corners come from extreme points; each
/// side is then refitted as a line through its middle points and adjacent
/// lines are intersected.
fn fit_quadrilateral(points: &[Point], center: Point) -> Option<[Point; 4]> {
    let n = points.len();
    if n < 12 {
        return None;
    }
    let farthest_from = |from: Point| {
        (0..n).max_by(|&a, &b| {
            from.distance_squared(&points[a])
                .total_cmp(&from.distance_squared(&points[b]))
        })
    };
    let c0 = farthest_from(center)?;
    let c2 = farthest_from(points[c0])?;
    let (a, b) = (points[c0], points[c2]);
    let side = |p: &Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let c1 = (0..n).max_by(|&i, &j| side(&points[i]).total_cmp(&side(&points[j])))?;
    let c3 = (0..n).min_by(|&i, &j| side(&points[i]).total_cmp(&side(&points[j])))?;
    if side(&points[c1]) <= 0.0 || side(&points[c3]) >= 0.0 {
        return None;
    }

    let mut idx = [c0, c1, c2, c3];
    idx.sort_unstable();
    if idx.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }
    let coarse: [Point; 4] = idx.map(|i| points[i]);

    let lines: Vec<Option<(Point, Point)>> = (0..4)
        .map(|s| {
            let (from, to) = (idx[s], idx[(s + 1) % 4]);
            let span = (to + n - from) % n;
            let between: Vec<Point> = (1..span).map(|k| points[(from + k) % n]).collect();
            let trim = between.len() / 5;
            fit_line(&between[trim..between.len() - trim])
        })
        .collect();

    let mut corners = coarse;
    for (s, corner) in corners.iter_mut().enumerate() {
        let refined = match (lines[(s + 3) % 4], lines[s]) {
            (Some(before), Some(after)) => intersect(before, after),
            _ => None,
        };
        if let Some(p) = refined {
            if p.distance(&coarse[s]) <= 0.25 * coarse[s].distance(&center) {
                *corner = p;
            }
        }
    }
    is_convex(&corners).then_some(corners)
}

/// Total least squares line through `points` as (centroid, unit direction)
fn fit_line(points: &[Point]) -> Option<(Point, Point)> {
    if points.len() < 3 {
        return None;
    }
    let count = points.len() as f32;
    let mx = points.iter().map(|p| p.x).sum::<f32>() / count;
    let my = points.iter().map(|p| p.y).sum::<f32>() / count;
    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for p in points {
        let (dx, dy) = (p.x - mx, p.y - my);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (sin, cos) = theta.sin_cos();
    Some((Point::new(mx, my), Point::new(cos, sin)))
}

fn intersect((p1, d1): (Point, Point), (p2, d2): (Point, Point)) -> Option<Point> {
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < 1e-3 {
        return None;
    }
    let t = ((p2.x - p1.x) * d2.y - (p2.y - p1.y) * d2.x) / cross;
    Some(p1.translate(t * d1.x, t * d1.y))
}

/// Modules of rings 0..=`edge` whose colour matches the bullseye (dark on
/// even rings), and the number of modules checked
fn ring_agreement(matrix: &BitMatrix, transform: &PerspectiveTransform, edge: usize) -> (usize, usize) {
    let reach = edge as i32;
    let mut matching = 0usize;
    let mut total = 0usize;
    for my in -reach..=reach {
        for mx in -reach..=reach {
            let ring = mx.abs().max(my.abs());
            let Some(p) = transform.transform(&Point::new(mx as f32, my as f32)) else {
                continue;
            };
            total += 1;
            if matrix.try_get(p.x.floor() as i32, p.y.floor() as i32) == Some(ring % 2 == 0) {
                matching += 1;
            }
        }
    }
    (matching, total.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Concentric square rings, dark at even distances, `scale` pixels per module
    fn bullseye(rings: usize, scale: usize, margin: usize) -> BitMatrix {
        let modules = 2 * rings - 1;
        let size = (modules + 2 * margin) * scale;
        let mut m = BitMatrix::square(size);
        let center = (rings - 1) as i32;
        for my in 0..modules {
            for mx in 0..modules {
                let d = (mx as i32 - center).abs().max((my as i32 - center).abs());
                if d % 2 == 0 {
                    m.set_region((mx + margin) * scale, (my + margin) * scale, scale, scale);
                }
            }
        }
        m
    }

    /// The same rings turned by `degrees` about the image centre
    fn turned_bullseye(rings: usize, module: f32, degrees: f32, size: usize) -> BitMatrix {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let c = size as f32 / 2.0;
        let mut m = BitMatrix::square(size);
        for y in 0..size {
            for x in 0..size {
                let (dx, dy) = (x as f32 + 0.5 - c, y as f32 + 0.5 - c);
                let u = (dx * cos + dy * sin) / module;
                let v = (-dx * sin + dy * cos) / module;
                let ring = (u.abs().max(v.abs()) + 0.5).floor() as usize;
                if ring < rings && ring % 2 == 0 {
                    m.set(x, y, true);
                }
            }
        }
        m
    }

    #[test]
    fn test_finds_centre() {
        let m = bullseye(5, 3, 3);
        let found = BullseyeFinder::detect(&m);
        assert!(!found.is_empty());
        let c = &found[0];
        // centre module spans pixels 21..24
        assert!((c.center.x - 22.5).abs() < 1.0, "{:?}", c.center);
        assert!((c.center.y - 22.5).abs() < 1.0, "{:?}", c.center);
        assert!((c.module_size - 3.0).abs() < 0.5);
        assert!(c.hits >= 2);
    }

    #[test]
    fn test_blank_field_has_no_candidates() {
        assert!(BullseyeFinder::detect(&BitMatrix::square(64)).is_empty());
    }

    #[test]
    fn test_ray_edges() {
        let m = bullseye(5, 4, 4);
        // centre module spans pixels 32..36
        let edges = ray_edges(&m, Point::new(34.0, 34.0), (1.0, 0.0), 40.0, 1.0, 6);
        assert_eq!(edges, vec![1.875, 5.875, 9.875, 13.875, 17.875]);
        assert!(ray_edges(&m, Point::new(2.0, 2.0), (1.0, 0.0), 40.0, 1.0, 6).is_empty());
    }

    #[test]
    fn test_flicker_is_folded() {
        let mut m = bullseye(5, 4, 4);
        m.set(38, 34, true);
        let edges = ray_edges(&m, Point::new(34.0, 34.0), (1.0, 0.0), 40.0, 1.5, 4);
        assert_eq!(edges, vec![1.875, 5.875, 9.875, 13.875]);
    }

    #[test]
    fn test_spacing() {
        assert!(evenly_spaced(&[2.0, 6.0, 10.0, 14.0, 30.0], 4));
        assert!(!evenly_spaced(&[2.0, 6.0, 12.0, 14.0], 4));
        assert!(!evenly_spaced(&[2.0, 6.0], 4));
    }

    #[test]
    fn test_locate_upright() {
        let m = bullseye(5, 4, 4);
        let candidate = BullseyeCandidate::new(34.0, 34.0, 4.0);
        let found = locate(&m, &candidate);
        assert_eq!(found.len(), 1);
        let b = &found[0];
        assert!(b.compact);
        assert!(b.quality > 0.99);
        assert!((b.module_size - 4.0).abs() < 0.3, "{}", b.module_size);
        let centre = b.project(Point::new(0.0, 0.0)).unwrap();
        assert!(centre.distance(&Point::new(34.0, 34.0)) < 0.5, "{centre:?}");
    }

    #[test]
    fn test_locate_turned() {
        for degrees in [20.0, 30.0, 45.0, 60.0] {
            let m = turned_bullseye(7, 5.0, degrees, 120);
            let found = BullseyeFinder::detect(&m);
            assert!(!found.is_empty(), "{degrees} degrees: no candidate");
            let located = locate(&m, &found[0]);
            assert_eq!(located.len(), 2, "{degrees} degrees");
            assert!(!located[0].compact && located[1].compact);

            // Corner modules of the ring five out land where the turn puts them
            let corners = located[0].ring_corners(5.0).unwrap();
            let (sin, cos) = f32::to_radians(degrees).sin_cos();
            let expected: Vec<Point> = SQUARE
                .iter()
                .map(|&(sx, sy)| {
                    let (u, v) = (sx * 25.0, sy * 25.0);
                    Point::new(60.0 + u * cos - v * sin, 60.0 + u * sin + v * cos)
                })
                .collect();
            for corner in corners {
                assert!(
                    expected.iter().any(|e| e.distance(&corner) < 2.0),
                    "{degrees} degrees: stray corner {corner:?}"
                );
            }
        }
    }

    #[test]
    fn test_locate_rejects_grid_crossing() {
        // Alternating cross through a dark module: rays along the axes see
        // rings, the diagonals do not
        let mut m = BitMatrix::square(80);
        for i in 0..20 {
            if i % 2 == 1 {
                m.set_region(i * 4, 36, 4, 4);
                m.set_region(36, i * 4, 4, 4);
            }
        }
        let candidate = BullseyeCandidate::new(38.0, 38.0, 4.0);
        assert!(locate(&m, &candidate).is_empty());
    }

    #[test]
    fn test_fit_quadrilateral() {
        // Points on a 20 px square around (50, 50), in angular order
        let center = Point::new(50.0, 50.0);
        let points: Vec<Point> = (0..72)
            .map(|i| {
                let (s, c) = (i as f32 * std::f32::consts::TAU / 72.0).sin_cos();
                let r = 10.0 / c.abs().max(s.abs());
                center.translate(r * c, r * s)
            })
            .collect();
        let quad = fit_quadrilateral(&points, center).unwrap();
        for expected in [
            Point::new(60.0, 40.0),
            Point::new(60.0, 60.0),
            Point::new(40.0, 60.0),
            Point::new(40.0, 40.0),
        ] {
            assert!(
                quad.iter().any(|q| q.distance(&expected) < 0.1),
                "{expected:?} missing from {quad:?}"
            );
        }
    }
}
