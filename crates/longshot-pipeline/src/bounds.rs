use longshot_core::{CaptureConfig, Rect, ScrollOffset, Size};

/// Number of viewport-heights one capture covers. One capture spans a
/// generous scroll range without unbounded native memory use.
pub(crate) const CAPTURE_VIEWPORT_COUNT: i32 = 10;

/// Viewport-heights included above the scroll offset in a full entry.
pub(crate) const ENTRY_VIEWPORTS_ABOVE: i32 = 2;

/// Viewport-heights included below the scroll offset in a full entry.
pub(crate) const ENTRY_VIEWPORTS_BELOW: i32 = 4;

/// Translates "which part of the page is wanted" into capture-space
/// rectangles. Pure geometry; no I/O.
///
/// The viewport height is fixed at construction (display height scaled by
/// the page's minimum page-scale factor); content size and scroll offset
/// arrive later, once the compositor reports ready, via the two setters.
pub struct BoundsManager {
    viewport_width:  i32,
    viewport_height: i32,
    capture_bounds:  Rect,
    content_size:    Option<Size>,
    scroll_offset:   Option<ScrollOffset>,
}

impl BoundsManager {
    pub fn new(config: &CaptureConfig) -> Self {
        let viewport_height = config.scaled_viewport_height();
        // The −1 keeps the height an exact multiple of the viewport height.
        let capture_bounds =
            Rect::vertical_span(0, CAPTURE_VIEWPORT_COUNT * viewport_height - 1);
        Self {
            viewport_width: config.viewport_width_px,
            viewport_height,
            capture_bounds,
            content_size: None,
            scroll_offset: None,
        }
    }

    /// The window handed to the capture step: `CAPTURE_VIEWPORT_COUNT`
    /// viewport-heights from the top of the document, full width.
    pub fn capture_bounds(&self) -> Rect {
        self.capture_bounds
    }

    /// Viewport height in capture-space pixels, the unit for all window
    /// sizing here.
    pub fn viewport_height(&self) -> i32 {
        self.viewport_height
    }

    pub fn set_content_size(&mut self, size: Size) {
        self.content_size = Some(size);
    }

    pub fn set_scroll_offset(&mut self, offset: ScrollOffset) {
        self.scroll_offset = Some(offset);
    }

    pub fn content_size(&self) -> Option<Size> {
        self.content_size
    }

    pub fn scroll_offset(&self) -> Option<ScrollOffset> {
        self.scroll_offset
    }

    /// Scale that maps the composited content width onto the device
    /// viewport width. `1.0` when the content width is unknown or zero
    /// (page content vanished mid-flow).
    pub fn bitmap_scale_factor(&self) -> f32 {
        match self.content_size {
            Some(size) if size.width > 0 => self.viewport_width as f32 / size.width as f32,
            _ => 1.0,
        }
    }

    /// Window of `ENTRY_VIEWPORTS_ABOVE + ENTRY_VIEWPORTS_BELOW + 1`
    /// viewport-heights around the current scroll offset, clamped to
    /// `[0, content_height]`. Clamping at one edge hands the freed space to
    /// the other side, so the span is preserved whenever the document is
    /// tall enough; a shorter document yields the whole of it.
    ///
    /// # Panics
    ///
    /// If content size or scroll offset are not yet known; callers must
    /// wait for the compositor to report ready.
    pub fn full_entry_bounds(&self) -> Rect {
        let content = self
            .content_size
            .expect("full_entry_bounds requires the content size");
        let scroll = self
            .scroll_offset
            .expect("full_entry_bounds requires the scroll offset");

        let total = (ENTRY_VIEWPORTS_ABOVE + ENTRY_VIEWPORTS_BELOW + 1) * self.viewport_height;
        let mut top = scroll.y - ENTRY_VIEWPORTS_ABOVE * self.viewport_height;
        let mut bottom = top + total;
        if top < 0 {
            bottom -= top;
            top = 0;
        }
        if bottom > content.height {
            top -= bottom - content.height;
            bottom = content.height;
            top = top.max(0);
        }
        Rect::vertical_span(top, bottom)
    }

    /// One viewport-height immediately above `y_ref`, clamped to the top of
    /// the document. `None` when `y_ref` is already at the top.
    pub fn clip_bounds_above(&self, y_ref: i32) -> Option<Rect> {
        if y_ref <= 0 {
            return None;
        }
        Some(Rect::vertical_span((y_ref - self.viewport_height).max(0), y_ref))
    }

    /// One viewport-height immediately below `y_ref`, clamped to the bottom
    /// of the document. `None` when `y_ref` is already at the bottom, or
    /// before the content height is known.
    pub fn clip_bounds_below(&self, y_ref: i32) -> Option<Rect> {
        let content = self.content_size?;
        if y_ref >= content.height {
            return None;
        }
        Some(Rect::vertical_span(y_ref, (y_ref + self.viewport_height).min(content.height)))
    }
}
