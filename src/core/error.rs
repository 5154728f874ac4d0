use std::path::PathBuf;

use super::format::PixelFormat;
use super::frame_source::FrameIndex;

/// Errors raised by the frame geometry and frame access layer.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The pixel-format tag is not one the catalog knows.
    #[error("unsupported pixel format '{0}' (expected one of YV12, IYUV, YUY2, UYVY, YVYU)")]
    UnsupportedFormat(String),

    /// The dimensions cannot be laid out in the requested format.
    #[error("invalid dimensions {width}x{height} for {format}: {reason}")]
    InvalidDimensions {
        format: PixelFormat,
        width: u32,
        height: u32,
        reason: &'static str,
    },

    /// The input file cannot be opened.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No complete frame exists at the requested index.
    #[error("no complete frame at index {index}")]
    EndOfStream { index: FrameIndex },
}
