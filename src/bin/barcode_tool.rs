//! Decode barcodes from image files or render text into a symbol image.
//!
//! ```text
//! barcode_tool decode <image>...
//! barcode_tool encode <aztec|code128> <text> <output.png> [width] [height]
//! ```

use rust_barcode::{BarcodeFormat, BitMatrix, DEFAULT_THRESHOLD, SymbolMetadata};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("decode") if args.len() > 1 => decode_cmd(&args[1..]),
        Some("encode") if args.len() > 3 => encode_cmd(&args[1..]),
        _ => {
            eprintln!("usage: barcode_tool decode <image>...");
            eprintln!(
                "       barcode_tool encode <aztec|code128> <text> <output.png> [width] [height]"
            );
            ExitCode::FAILURE
        }
    }
}

fn decode_cmd(paths: &[String]) -> ExitCode {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match image::open(Path::new(path)) {
            Ok(img) => images.push(BitMatrix::from_luma(&img.to_luma8(), DEFAULT_THRESHOLD)),
            Err(err) => {
                eprintln!("Failed to load image {}: {}", path, err);
                return ExitCode::FAILURE;
            }
        }
    }

    let mut success = 0;
    for (path, result) in paths.iter().zip(rust_barcode::decode_batch(&images)) {
        match result {
            Ok(decoded) => {
                success += 1;
                println!(
                    "OK: {} -> {} {} {:?}",
                    path, decoded.format, decoded.symbology_identifier, decoded.text
                );
                match decoded.metadata {
                    SymbolMetadata::Aztec {
                        compact,
                        layers,
                        data_blocks,
                        errors_corrected,
                        ..
                    } => println!(
                        "  compact={} layers={} data_blocks={} errors_corrected={}",
                        compact, layers, data_blocks, errors_corrected
                    ),
                    SymbolMetadata::Linear {
                        row,
                        line_count,
                        module_width,
                    } => println!(
                        "  row={} line_count={} module_width={:.2}",
                        row, line_count, module_width
                    ),
                }
            }
            Err(err) => println!("FAIL: {} -> {} ({:?})", path, err, err.kind()),
        }
    }

    println!("\nResult: {}/{}", success, paths.len());
    if success == paths.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn encode_cmd(args: &[String]) -> ExitCode {
    let format = match args[0].parse::<BarcodeFormat>() {
        Ok(format) => format,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let width = args.get(3).and_then(|v| v.parse().ok()).unwrap_or(0);
    let height = args.get(4).and_then(|v| v.parse().ok()).unwrap_or(0);

    let matrix = match rust_barcode::encode(format, &args[1], width, height) {
        Ok(matrix) => matrix,
        Err(err) => {
            eprintln!("Failed to encode: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = matrix.to_luma().save(&args[2]) {
        eprintln!("Failed to write {}: {}", args[2], err);
        return ExitCode::FAILURE;
    }
    println!(
        "Wrote {} ({}x{}) to {}",
        format,
        matrix.width(),
        matrix.height(),
        args[2]
    );
    ExitCode::SUCCESS
}
