//! Module-to-pixel rendering shared by the writers.

use crate::models::{BitArray, BitMatrix};

/// Render a row of modules into a `width` x `height` matrix.
///
/// `margin` is the total quiet zone in modules, split evenly between the two
/// sides. Each module is widened to the largest integer number of pixels that
/// fits; leftover pixels pad both sides equally.
pub fn render_linear(code: &BitArray, width: usize, height: usize, margin: usize) -> BitMatrix {
    let input_width = code.len();
    let full_width = input_width + margin;
    let output_width = width.max(full_width);
    let output_height = height.max(1);
    let multiple = if full_width == 0 {
        1
    } else {
        output_width / full_width
    };
    let left_padding = (output_width - input_width * multiple) / 2;

    let mut result = BitMatrix::new(output_width, output_height);
    for (input_x, bit) in code.iter().enumerate() {
        if bit {
            result.set_region(left_padding + input_x * multiple, 0, multiple, output_height);
        }
    }
    result
}

/// Scale a module matrix up to at least `width` x `height` pixels with a quiet
/// zone of `quiet_zone` modules on every side, keeping modules square.
pub fn render_matrix(
    code: &BitMatrix,
    width: usize,
    height: usize,
    quiet_zone: usize,
) -> BitMatrix {
    let code_width = code.width();
    let code_height = code.height();
    let output_width = width.max(code_width + 2 * quiet_zone);
    let output_height = height.max(code_height + 2 * quiet_zone);
    if code_width == 0 || code_height == 0 {
        return BitMatrix::new(output_width, output_height);
    }

    let scale = ((output_width - 2 * quiet_zone) / code_width)
        .min((output_height - 2 * quiet_zone) / code_height)
        .max(1);
    let left_padding = (output_width - code_width * scale) / 2;
    let top_padding = (output_height - code_height * scale) / 2;

    let mut result = BitMatrix::new(output_width, output_height);
    for y in 0..code_height {
        for x in 0..code_width {
            if code.get(x, y) {
                result.set_region(
                    left_padding + x * scale,
                    top_padding + y * scale,
                    scale,
                    scale,
                );
            }
        }
    }
    result
}
