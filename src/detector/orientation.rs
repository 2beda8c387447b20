//! Orientation marks and mode message around the Aztec bullseye.

use crate::debug::trace;
use crate::decoder::galois::GaloisField;
use crate::decoder::reed_solomon::ReedSolomonDecoder;
use crate::error::DecodeError;
use crate::models::{BitMatrix, Point};

/// Orientation bits (corner marks read clockwise from each side's start) for
/// the four rotations. Consecutive rotations differ in eight bits.
const EXPECTED_CORNER_BITS: [u32; 4] = [0xee0, 0x1dc, 0x83b, 0x707];

/// Symbol parameters carried by the mode message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeMessage {
    /// Compact (true) or full-range symbol
    pub compact: bool,
    /// Number of data layers
    pub layers: usize,
    /// Number of data codewords
    pub data_blocks: usize,
    /// Reader initialization symbol
    pub reader_init: bool,
    /// Index of the bullseye corner that is the symbol's top-left
    pub shift: usize,
}

/// Read `size` modules from `p1` towards `p2` (exclusive), most significant bit first
pub fn sample_line(matrix: &BitMatrix, p1: Point, p2: Point, size: usize) -> u32 {
    let mut result = 0u32;
    let step_x = (p2.x - p1.x) / size as f32;
    let step_y = (p2.y - p1.y) / size as f32;
    for i in 0..size {
        let x = (p1.x + i as f32 * step_x).floor() as i32;
        let y = (p1.y + i as f32 * step_y).floor() as i32;
        if matrix.try_get(x, y) == Some(true) {
            result |= 1 << (size - i - 1);
        }
    }
    result
}

/// Which corner holds the three-mark pattern. Tolerates two flipped marks.
pub fn rotation(sides: &[u32; 4], length: usize) -> Result<usize, DecodeError> {
    let mut corner_bits = 0u32;
    for &side in sides {
        // XX......X: two marks at the start of the side, one at the end
        let t = ((side >> (length - 2)) << 1) + (side & 1);
        corner_bits = (corner_bits << 3) + t;
    }
    // Rotate so the three bits around each corner are adjacent
    corner_bits = ((corner_bits & 1) << 11) + (corner_bits >> 1);

    EXPECTED_CORNER_BITS
        .iter()
        .position(|&expected| (corner_bits ^ expected).count_ones() <= 2)
        .ok_or(DecodeError::OrientationAmbiguous)
}

/// Read the orientation marks and the mode message from the ring whose corner
/// module centres are `corners`, taken clockwise from any corner
pub fn read_mode_message(
    matrix: &BitMatrix,
    corners: &[Point; 4],
    compact: bool,
) -> Result<ModeMessage, DecodeError> {
    let length = if compact { 10 } else { 14 };
    let sides: [u32; 4] =
        std::array::from_fn(|i| sample_line(matrix, corners[i], corners[(i + 1) % 4], length));
    let shift = rotation(&sides, length)?;

    let mut parameter_data = 0u64;
    for i in 0..4 {
        let side = u64::from(sides[(shift + i) % 4]);
        if compact {
            // ..XXXXXXX.
            parameter_data = (parameter_data << 7) + ((side >> 1) & 0x7F);
        } else {
            // ..XXXXX.XXXXX.  (the middle module belongs to the reference grid)
            parameter_data =
                (parameter_data << 10) + ((side >> 2) & (0x1F << 5)) + ((side >> 1) & 0x1F);
        }
    }

    let (layers, data_blocks, reader_init) = decode_parameters(parameter_data, compact)?;
    trace!(
        "mode message: compact={} layers={} data_blocks={} reader_init={} shift={}",
        compact,
        layers,
        data_blocks,
        reader_init,
        shift
    );
    Ok(ModeMessage {
        compact,
        layers,
        data_blocks,
        reader_init,
        shift,
    })
}

/// Correct the 28- or 40-bit mode message and split it into layer count,
/// data codeword count and the reader-initialization flag
pub fn decode_parameters(
    parameter_data: u64,
    compact: bool,
) -> Result<(usize, usize, bool), DecodeError> {
    let (num_codewords, num_data) = if compact { (7, 2) } else { (10, 4) };
    let mut words = vec![0u16; num_codewords];
    let mut data = parameter_data;
    for word in words.iter_mut().rev() {
        *word = (data & 0xF) as u16;
        data >>= 4;
    }

    ReedSolomonDecoder::new(GaloisField::aztec_param())
        .correct(&mut words, num_codewords - num_data)
        .map_err(|_| DecodeError::ModeMessageCorrupt)?;

    let corrected = words[..num_data]
        .iter()
        .fold(0usize, |acc, &w| (acc << 4) + w as usize);

    let (layers, mut data_blocks) = if compact {
        ((corrected >> 6) + 1, (corrected & 0x3F) + 1)
    } else {
        ((corrected >> 11) + 1, (corrected & 0x7FF) + 1)
    };

    // The top bit of the data-word field flags reader initialization
    let mut reader_init = false;
    let (flag, max_layers) = if compact { (0x20, 1) } else { (0x400, 22) };
    if layers <= max_layers && (data_blocks - 1) & flag != 0 {
        reader_init = true;
        data_blocks = ((data_blocks - 1) & !flag) + 1;
    }
    Ok((layers, data_blocks, reader_init))
}
