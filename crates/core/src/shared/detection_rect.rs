/// An axis-aligned face rectangle in frame-pixel coordinates.
///
/// Detectors guarantee `x, y >= 0` and that the rectangle lies inside the
/// frame; consumers that draw near the edges still clamp via [`clamped`].
///
/// [`clamped`]: DetectionRect::clamped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DetectionRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DetectionRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Corner coordinates `(x0, y0, x1, y1)` clamped into a `frame_w` x
    /// `frame_h` raster, with `x1`/`y1` inclusive.
    ///
    /// Returns `None` for empty rectangles, rectangles entirely outside the
    /// frame, and empty frames.
    pub fn clamped(&self, frame_w: u32, frame_h: u32) -> Option<(u32, u32, u32, u32)> {
        if self.width <= 0 || self.height <= 0 || frame_w == 0 || frame_h == 0 {
            return None;
        }
        let max_x = frame_w as i64 - 1;
        let max_y = frame_h as i64 - 1;
        let (x0, y0) = (self.x as i64, self.y as i64);
        let (x1, y1) = (self.right() as i64, self.bottom() as i64);
        if x1 < 0 || y1 < 0 || x0 > max_x || y0 > max_y {
            return None;
        }
        Some((
            x0.clamp(0, max_x) as u32,
            y0.clamp(0, max_y) as u32,
            x1.clamp(0, max_x) as u32,
            y1.clamp(0, max_y) as u32,
        ))
    }
}
