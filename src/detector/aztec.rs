//! Aztec symbol detection.
//!
//! Bullseye candidates are found by a row scan, confirmed by tracing the ring
//! outline with rays from the centre, oriented with the corner marks of the mode-message ring and only
//! then sampled into a module grid.

use crate::debug::trace;
use crate::decoder::config;
use crate::detector::bullseye::{Bullseye, BullseyeCandidate, BullseyeFinder, locate};
use crate::detector::orientation::read_mode_message;
use crate::detector::sampler::GridSampler;
use crate::error::DecodeError;
use crate::models::{BitMatrix, Point};
use rayon::prelude::*;

/// Detection settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
    /// Read the symbol as its mirror image
    pub mirrored: bool,
    /// Bullseye candidates examined
    pub max_candidates: usize,
    /// Accepted centre re-projection error, in modules
    pub reprojection_tolerance: f32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            mirrored: false,
            max_candidates: config::max_finder_candidates(),
            reprojection_tolerance: config::reprojection_tolerance(),
        }
    }
}

/// Sampled symbol handed to the payload decoder
#[derive(Debug, PartialEq)]
pub struct DetectorResult {
    bits: BitMatrix,
    compact: bool,
    layers: usize,
    data_blocks: usize,
    reader_init: bool,
    corners: [Point; 4],
}

impl DetectorResult {
    /// Bundle a sampled grid with its mode message facts
    pub fn new(
        bits: BitMatrix,
        compact: bool,
        layers: usize,
        data_blocks: usize,
        reader_init: bool,
        corners: [Point; 4],
    ) -> Self {
        Self {
            bits,
            compact,
            layers,
            data_blocks,
            reader_init,
            corners,
        }
    }

    /// Module grid, one bit per module
    pub fn bits(&self) -> &BitMatrix {
        &self.bits
    }

    /// Take the module grid
    pub fn into_bits(self) -> BitMatrix {
        self.bits
    }

    /// Compact (true) or full-range symbol
    pub fn is_compact(&self) -> bool {
        self.compact
    }

    /// Number of data layers
    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Data codewords announced by the mode message
    pub fn data_blocks(&self) -> usize {
        self.data_blocks
    }

    /// Reader initialization symbol
    pub fn reader_init(&self) -> bool {
        self.reader_init
    }

    /// Symbol outline in the image: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }
}

/// Module grid side for a layer count
pub fn dimension(compact: bool, layers: usize) -> usize {
    if compact {
        4 * layers + 11
    } else {
        4 * layers + 2 * ((2 * layers + 6) / 15) + 15
    }
}

/// Aztec detector
#[derive(Debug, Clone, Copy, Default)]
pub struct AztecDetector {
    options: DetectOptions,
}

impl AztecDetector {
    /// Create a detector with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with explicit options
    pub fn with_options(options: DetectOptions) -> Self {
        Self { options }
    }

    /// Options this detector runs with
    pub fn options(&self) -> &DetectOptions {
        &self.options
    }

    /// Locate and sample one symbol.
    ///
    /// Every candidate's rings are confirmed first and the candidates are
    /// re-ranked by how well they match a bullseye; only then is the
    /// `max_candidates` budget applied. The survivors are evaluated in
    /// parallel; the best-ranked success wins and, when none succeeds, the
    /// error from the candidate that got furthest is returned.
    pub fn detect(&self, matrix: &BitMatrix) -> Result<DetectorResult, DecodeError> {
        let candidates = BullseyeFinder::detect(matrix);
        if candidates.is_empty() {
            trace!("aztec: no bullseye candidates");
            return Err(DecodeError::FinderNotFound);
        }

        let mut located: Vec<(&BullseyeCandidate, Vec<Bullseye>)> = candidates
            .par_iter()
            .map(|candidate| (candidate, locate(matrix, candidate)))
            .filter(|(_, found)| !found.is_empty())
            .collect();
        located.sort_by(|a, b| best_quality(&b.1).total_cmp(&best_quality(&a.1)));
        located.truncate(self.options.max_candidates);
        trace!(
            "aztec: {} of {} candidates show a bullseye",
            located.len(),
            candidates.len()
        );
        if located.is_empty() {
            return Err(DecodeError::FinderNotFound);
        }

        let outcomes: Vec<Result<DetectorResult, DecodeError>> = located
            .par_iter()
            .map(|(candidate, found)| self.try_candidate(matrix, candidate, found))
            .collect();

        let mut best: Option<DecodeError> = None;
        for (rank, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => {
                    trace!("aztec: candidate {} accepted", rank);
                    return Ok(result);
                }
                Err(err) => {
                    trace!("aztec: candidate {} rejected: {}", rank, err);
                    best = Some(match best {
                        Some(current) => current.most_specific(err),
                        None => err,
                    });
                }
            }
        }
        Err(best.unwrap_or(DecodeError::FinderNotFound))
    }

    /// A full-range symbol also shows the compact ring pattern, so each
    /// reading is only a suggestion; the mode message decides
    fn try_candidate(
        &self,
        matrix: &BitMatrix,
        candidate: &BullseyeCandidate,
        found: &[Bullseye],
    ) -> Result<DetectorResult, DecodeError> {
        let mut failure: Option<DecodeError> = None;
        for bullseye in found {
            match self.try_size(matrix, candidate.center, bullseye) {
                Ok(result) => return Ok(result),
                Err(err) => {
                    failure = Some(match failure {
                        Some(previous) => previous.most_specific(err),
                        None => err,
                    })
                }
            }
        }
        Err(failure.unwrap_or(DecodeError::FinderNotFound))
    }

    /// Read the mode message on the ring just outside the bullseye (five
    /// modules out for compact symbols, seven for full ones) and sample the grid
    fn try_size(
        &self,
        matrix: &BitMatrix,
        centre: Point,
        bullseye: &Bullseye,
    ) -> Result<DetectorResult, DecodeError> {
        let compact = bullseye.compact;
        let radius = if compact { 5usize } else { 7usize };
        let module_size = bullseye.module_size;
        if module_size < 1.0 {
            return Err(DecodeError::FinderNotFound);
        }

        let mut corners = bullseye.ring_corners(radius as f32)?;
        if self.options.mirrored {
            corners.swap(0, 2);
        }

        let mode = read_mode_message(matrix, &corners, compact)?;
        let dimension = dimension(compact, mode.layers);
        let oriented: [Point; 4] = std::array::from_fn(|i| corners[(mode.shift + i) % 4]);
        let sampler = GridSampler::new(&oriented, dimension, radius)?;

        let half = dimension as f32 / 2.0;
        let error = sampler.reprojection_error(&[(Point::new(half, half), centre)], module_size);
        if error > self.options.reprojection_tolerance {
            trace!(
                "aztec: centre re-projects {:.2} modules off (tolerance {:.2})",
                error,
                self.options.reprojection_tolerance
            );
            return Err(DecodeError::GeometryDegenerate);
        }

        let bits = sampler.sample(matrix)?;
        let outline = sampler.symbol_corners()?;
        trace!(
            "aztec: {} symbol, {} layers, {} data words, {}x{} modules",
            if compact { "compact" } else { "full" },
            mode.layers,
            mode.data_blocks,
            dimension,
            dimension
        );
        Ok(DetectorResult::new(
            bits,
            compact,
            mode.layers,
            mode.data_blocks,
            mode.reader_init,
            outline,
        ))
    }
}

fn best_quality(found: &[Bullseye]) -> f32 {
    found.iter().map(|b| b.quality).fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::aztec::AztecWriter;
    use crate::encoder::render::render_matrix;
    use crate::models::Content;

    fn render(code: &BitMatrix, scale: usize) -> BitMatrix {
        let side = (code.width() + 8) * scale;
        render_matrix(code, side, side, 4 * scale)
    }

    fn rotate(matrix: &BitMatrix) -> BitMatrix {
        let mut out = BitMatrix::new(matrix.height(), matrix.width());
        for y in 0..matrix.height() {
            for x in 0..matrix.width() {
                if matrix.get(x, y) {
                    out.set(matrix.height() - 1 - y, x, true);
                }
            }
        }
        out
    }

    fn mirror(matrix: &BitMatrix) -> BitMatrix {
        let mut out = BitMatrix::new(matrix.width(), matrix.height());
        for y in 0..matrix.height() {
            for x in 0..matrix.width() {
                if matrix.get(x, y) {
                    out.set(matrix.width() - 1 - x, y, true);
                }
            }
        }
        out
    }

    #[test]
    fn test_dimension() {
        assert_eq!(dimension(true, 1), 15);
        assert_eq!(dimension(true, 4), 27);
        assert_eq!(dimension(false, 4), 31);
        assert_eq!(dimension(false, 5), 37);
        assert_eq!(dimension(false, 32), 151);
    }

    #[test]
    fn test_detect_compact_in_all_rotations() {
        let code = AztecWriter::new()
            .encode_symbol(&Content::from("Aztec detector"))
            .unwrap();
        assert!(code.compact);
        let mut image = render(&code.matrix, 3);
        for _ in 0..4 {
            let result = AztecDetector::new().detect(&image).unwrap();
            assert!(result.is_compact());
            assert_eq!(result.layers(), code.layers);
            assert_eq!(result.data_blocks(), code.data_blocks);
            assert!(!result.reader_init());
            assert_eq!(result.bits(), &code.matrix);
            image = rotate(&image);
        }
    }

    #[test]
    fn test_detect_full_symbol() {
        let text = "Full range symbols carry a seven ring bullseye and a forty bit mode message";
        let code = AztecWriter::new()
            .with_layers(5)
            .encode_symbol(&Content::from(text))
            .unwrap();
        assert!(!code.compact);
        let image = render(&code.matrix, 3);
        let result = AztecDetector::new().detect(&image).unwrap();
        assert!(!result.is_compact());
        assert_eq!(result.layers(), 5);
        assert_eq!(result.bits(), &code.matrix);
        let corners = result.corners();
        // 4 module quiet zone at 3 px per module
        assert!(corners[0].distance(&Point::new(12.0, 12.0)) < 1.5);
    }

    #[test]
    fn test_mirrored_symbol() {
        let code = AztecWriter::new()
            .encode_symbol(&Content::from("MIRROR"))
            .unwrap();
        let image = mirror(&render(&code.matrix, 3));
        let options = DetectOptions {
            mirrored: true,
            ..DetectOptions::default()
        };
        let result = AztecDetector::with_options(options).detect(&image).unwrap();
        assert_eq!(result.bits(), &code.matrix);
    }

    #[test]
    fn test_budget_applies_after_ring_ranking() {
        // 22 layers carry a reference grid with dozens of crossings that
        // look like bullseye centres to the row scan
        let code = AztecWriter::new()
            .with_layers(22)
            .encode_symbol(&Content::from("ZZZ"))
            .unwrap();
        let image = render(&code.matrix, 3);
        assert!(BullseyeFinder::detect(&image).len() > 1);

        let options = DetectOptions {
            max_candidates: 1,
            ..DetectOptions::default()
        };
        let detector = AztecDetector::with_options(options);
        assert_eq!(detector.options().max_candidates, 1);
        let result = detector.detect(&image).unwrap();
        assert_eq!(result.layers(), 22);
        assert_eq!(result.bits(), &code.matrix);
    }

    #[test]
    fn test_blank_image() {
        assert_eq!(
            AztecDetector::new().detect(&BitMatrix::square(60)).unwrap_err(),
            DecodeError::FinderNotFound
        );
    }
}
