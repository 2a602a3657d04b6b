use crate::shared::detection_rect::DetectionRect;
use crate::shared::frame::Frame;

/// Domain interface for drawing detections onto a frame.
///
/// Implementations modify the frame in-place and never fail: rectangles
/// that cannot be drawn are skipped.
pub trait FrameAnnotator: Send {
    fn annotate(&self, frame: &mut Frame, rects: &[DetectionRect]);
}
