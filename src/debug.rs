use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Detector/decoder trace switch, read once from `BARCODE_DEBUG`.
pub(crate) fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| std::env::var("BARCODE_DEBUG").is_ok())
}

/// Trace line on stderr in debug builds when `BARCODE_DEBUG` is set
macro_rules! trace {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) && $crate::debug::debug_enabled() {
            eprintln!("DEBUG: {}", format_args!($($arg)*));
        }
    };
}

pub(crate) use trace;
