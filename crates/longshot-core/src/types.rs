use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ── Rect ──────────────────────────────────────────────────────────────────────

/// Rectangle in capture-space coordinates: device-physical pixels already
/// adjusted for the page's minimum scale factor.
///
/// A `left == right == 0` pair means "full page width" — the native service
/// treats a zero-width clip as horizontally unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left:   i32,
    pub top:    i32,
    pub right:  i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Full-width vertical span (`left`/`right` zero — see the type docs).
    pub const fn vertical_span(top: i32, bottom: i32) -> Self {
        Self { left: 0, top, right: 0, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// A rectangle with no vertical extent selects nothing. Zero width is
    /// legal (full-width convention).
    pub fn is_empty(&self) -> bool {
        self.height() <= 0
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{} → {},{}]", self.left, self.top, self.right, self.bottom)
    }
}

// ── Size ──────────────────────────────────────────────────────────────────────

/// Content dimensions in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width:  i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// ── ScrollOffset ──────────────────────────────────────────────────────────────

/// Page scroll position at capture time, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: i32,
    pub y: i32,
}

impl ScrollOffset {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for ScrollOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ── PixelFormat ───────────────────────────────────────────────────────────────

/// Pixel layout of a composited bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8888,
    /// 2 bytes per pixel, no alpha.
    Rgb565,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgba8888 => 4,
            Self::Rgb565 => 2,
        }
    }
}

// ── Bitmap ────────────────────────────────────────────────────────────────────

/// One composited tile of the captured page.
#[derive(Clone, PartialEq)]
pub struct Bitmap {
    data:   Bytes,
    width:  u32,
    height: u32,
    format: PixelFormat,
}

impl Bitmap {
    pub fn new(data: Bytes, width: u32, height: u32, format: PixelFormat) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * format.bytes_per_pixel(),
            "bitmap data length does not match {width}×{height} {format:?}"
        );
        Self { data, width, height, format }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Allocated pixel storage in bytes — the unit the memory accounting
    /// upstream works in.
    pub fn byte_count(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}
