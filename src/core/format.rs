//! Pixel format catalog and frame geometry.
//!
//! Every supported format is described by exactly one [`FormatDescriptor`],
//! returned from [`PixelFormat::descriptor`]. Everything else (frame size,
//! plane offsets, luma addressing) is derived from that entry.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::FrameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PixelFormat {
    #[serde(rename = "YV12")]
    Yv12,
    #[serde(rename = "IYUV")]
    Iyuv,
    #[serde(rename = "YUY2")]
    Yuy2,
    #[serde(rename = "UYVY")]
    Uyvy,
    #[serde(rename = "YVYU")]
    Yvyu,
}

/// Which chroma component comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chroma {
    Cb,
    Cr,
}

/// Byte layout rule of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Layout {
    /// 4:2:0 planar: a full Y plane followed by two quarter-size chroma planes.
    Planar { first_chroma: Chroma },
    /// 4:2:2 packed: 4-byte macropixels covering two horizontal pixels.
    /// The fields are byte offsets inside the macropixel (`y` is Y0, Y1 is at `y + 2`).
    Packed { y: usize, cb: usize, cr: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    pub tag: &'static str,
    pub layout: Layout,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 5] = [
        PixelFormat::Yv12,
        PixelFormat::Iyuv,
        PixelFormat::Yuy2,
        PixelFormat::Uyvy,
        PixelFormat::Yvyu,
    ];

    pub const fn descriptor(self) -> FormatDescriptor {
        match self {
            PixelFormat::Yv12 => FormatDescriptor {
                tag: "YV12",
                layout: Layout::Planar { first_chroma: Chroma::Cr },
            },
            PixelFormat::Iyuv => FormatDescriptor {
                tag: "IYUV",
                layout: Layout::Planar { first_chroma: Chroma::Cb },
            },
            PixelFormat::Yuy2 => FormatDescriptor {
                tag: "YUY2",
                layout: Layout::Packed { y: 0, cb: 1, cr: 3 },
            },
            PixelFormat::Uyvy => FormatDescriptor {
                tag: "UYVY",
                layout: Layout::Packed { y: 1, cb: 0, cr: 2 },
            },
            PixelFormat::Yvyu => FormatDescriptor {
                tag: "YVYU",
                layout: Layout::Packed { y: 0, cb: 3, cr: 1 },
            },
        }
    }

    pub fn tag(self) -> &'static str {
        self.descriptor().tag
    }

    pub fn layout(self) -> Layout {
        self.descriptor().layout
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PixelFormat {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelFormat::ALL
            .into_iter()
            .find(|format| format.tag() == s)
            .ok_or_else(|| FrameError::UnsupportedFormat(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    Y,
    Cb,
    Cr,
}

/// Where one component's samples live inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaneRegion {
    pub plane: Plane,
    /// Byte offset of the first sample.
    pub offset: usize,
    /// Number of samples.
    pub samples: usize,
    /// Distance in bytes between consecutive samples.
    pub step: usize,
}

/// Byte layout of one frame, derived once from `(format, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameGeometry {
    format: PixelFormat,
    width: u32,
    height: u32,
    pixel_count: usize,
    frame_size: usize,
    luma_size: usize,
    chroma_plane_size: usize,
}

impl FrameGeometry {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Result<Self, FrameError> {
        let invalid = |reason| FrameError::InvalidDimensions {
            format,
            width,
            height,
            reason,
        };

        if width == 0 || height == 0 {
            return Err(invalid("width and height must be positive"));
        }

        let layout = format.layout();
        match layout {
            Layout::Planar { .. } if width % 2 != 0 || height % 2 != 0 => {
                return Err(invalid("4:2:0 planar formats need even width and height"));
            }
            Layout::Packed { .. } if width % 2 != 0 => {
                return Err(invalid("4:2:2 packed formats need an even width"));
            }
            _ => {}
        }

        let pixel_count = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| invalid("frame too large"))?;
        let (frame_size, chroma_plane_size) = match layout {
            Layout::Planar { .. } => (pixel_count.checked_mul(3).map(|n| n / 2), pixel_count / 4),
            Layout::Packed { .. } => (pixel_count.checked_mul(2), pixel_count / 2),
        };
        let frame_size = frame_size.ok_or_else(|| invalid("frame too large"))?;

        Ok(Self {
            format,
            width,
            height,
            pixel_count,
            frame_size,
            luma_size: pixel_count,
            chroma_plane_size,
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn luma_size(&self) -> usize {
        self.luma_size
    }

    /// Samples per chroma component.
    pub fn chroma_plane_size(&self) -> usize {
        self.chroma_plane_size
    }

    /// Y, Cb and Cr regions, in that order.
    pub fn planes(&self) -> [PlaneRegion; 3] {
        let region = |plane, offset, step| PlaneRegion {
            plane,
            offset,
            samples: if plane == Plane::Y { self.luma_size } else { self.chroma_plane_size },
            step,
        };

        match self.format.layout() {
            Layout::Planar { first_chroma } => {
                let first = self.luma_size;
                let second = self.luma_size + self.chroma_plane_size;
                let (cb, cr) = match first_chroma {
                    Chroma::Cb => (first, second),
                    Chroma::Cr => (second, first),
                };
                [
                    region(Plane::Y, 0, 1),
                    region(Plane::Cb, cb, 1),
                    region(Plane::Cr, cr, 1),
                ]
            }
            Layout::Packed { y, cb, cr } => [
                region(Plane::Y, y, 2),
                region(Plane::Cb, cb, 4),
                region(Plane::Cr, cr, 4),
            ],
        }
    }

    /// Byte offset of the luma sample for pixel `(x, y)`.
    pub fn luma_offset(&self, x: u32, y: u32) -> usize {
        let pixel = y as usize * self.width as usize + x as usize;
        match self.format.layout() {
            Layout::Planar { .. } => pixel,
            Layout::Packed { y: y_offset, .. } => pixel * 2 + y_offset,
        }
    }

    /// Luma sample of pixel `(x, y)`, or `None` when out of bounds.
    pub fn luma_at(&self, frame: &[u8], x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        frame.get(self.luma_offset(x, y)).copied()
    }
}
