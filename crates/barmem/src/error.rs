use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BarError>;

/// Unified error type for barmem operations.
///
/// A failed access leaves its handle open and usable for subsequent operations; only
/// [`BarError::Open`] concerns construction, and a failed open constructs nothing.
/// No partial-transfer result is reported on failure: every access validates its
/// whole range before the first register is touched.
#[derive(Debug, Error)]
pub enum BarError {
    /// The resource could not be opened or mapped.
    #[error("cannot map {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The handle was closed before this operation.
    #[error("handle is closed")]
    Closed,

    /// The access would touch bytes outside the mapped window, or the end of the
    /// range overflows `u64`.
    #[error("access out of bounds: offset={offset:#x} len={len:#x} size={size:#x}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// A write buffer longer than the 32-bit word-count domain.
    #[error("transfer of {len} words exceeds the u32 word-count domain")]
    TransferSize { len: usize },
}
