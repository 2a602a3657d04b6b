use std::ops::RangeInclusive;

use ndarray::{arr1, s, Array1, ArrayViewMut3};
use serde::{Deserialize, Serialize};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::shared::constants::{DEFAULT_BOX_COLOR, DEFAULT_BOX_THICKNESS};
use crate::shared::detection_rect::DetectionRect;
use crate::shared::frame::Frame;

/// Outline color (RGB) and stroke width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxStyle {
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_BOX_COLOR,
            thickness: DEFAULT_BOX_THICKNESS,
        }
    }
}

/// Draws an unfilled rectangle around each detection.
///
/// The outline covers the corners `(x, y)` and `(x + width, y + height)`
/// after clamping them into the frame; strokes grow inward.
pub struct RectangleAnnotator {
    style: BoxStyle,
}

impl RectangleAnnotator {
    pub fn new(style: BoxStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &BoxStyle {
        &self.style
    }
}

impl Default for RectangleAnnotator {
    fn default() -> Self {
        Self::new(BoxStyle::default())
    }
}

impl FrameAnnotator for RectangleAnnotator {
    fn annotate(&self, frame: &mut Frame, rects: &[DetectionRect]) {
        let (fw, fh) = (frame.width(), frame.height());
        let t = self.style.thickness.max(1) as usize;
        let color = arr1(&self.style.color);
        let mut view = frame.as_ndarray_mut();

        for rect in rects {
            let Some((x0, y0, x1, y1)) = rect.clamped(fw, fh) else {
                continue;
            };
            let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);

            fill(&mut view, y0..=(y0 + t - 1).min(y1), x0..=x1, &color);
            fill(&mut view, y1.saturating_sub(t - 1).max(y0)..=y1, x0..=x1, &color);
            fill(&mut view, y0..=y1, x0..=(x0 + t - 1).min(x1), &color);
            fill(&mut view, y0..=y1, x1.saturating_sub(t - 1).max(x0)..=x1, &color);
        }
    }
}

fn fill(
    view: &mut ArrayViewMut3<'_, u8>,
    rows: RangeInclusive<usize>,
    cols: RangeInclusive<usize>,
    color: &Array1<u8>,
) {
    view.slice_mut(s![rows, cols, ..]).assign(color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const GREEN: [u8; 3] = [0, 255, 0];
    const BLACK: [u8; 3] = [0, 0, 0];

    fn black_frame(w: u32, h: u32) -> Frame {
        Frame::filled(w, h, BLACK, 0)
    }

    #[test]
    fn test_default_style() {
        let style = BoxStyle::default();
        assert_eq!(style.color, GREEN);
        assert_eq!(style.thickness, 2);
    }

    #[test]
    fn test_no_rects_leaves_frame_identical() {
        let original = Frame::new((0..20 * 10 * 3).map(|i| (i % 251) as u8).collect(), 20, 10, 0);
        let mut frame = original.clone();
        RectangleAnnotator::default().annotate(&mut frame, &[]);
        assert_eq!(frame, original);
    }

    #[rstest]
    // Outer corners.
    #[case(5, 5, GREEN)]
    #[case(15, 5, GREEN)]
    #[case(5, 15, GREEN)]
    #[case(15, 15, GREEN)]
    // Second stroke pixel on each side.
    #[case(6, 10, GREEN)]
    #[case(14, 10, GREEN)]
    #[case(10, 6, GREEN)]
    #[case(10, 14, GREEN)]
    // Inside the stroke.
    #[case(7, 10, BLACK)]
    #[case(13, 10, BLACK)]
    #[case(10, 10, BLACK)]
    // Just outside.
    #[case(4, 10, BLACK)]
    #[case(16, 10, BLACK)]
    #[case(10, 4, BLACK)]
    #[case(10, 16, BLACK)]
    fn test_outline_edges(#[case] x: u32, #[case] y: u32, #[case] expected: [u8; 3]) {
        let mut frame = black_frame(20, 20);
        RectangleAnnotator::default().annotate(&mut frame, &[DetectionRect::new(5, 5, 10, 10)]);
        assert_eq!(frame.pixel(x, y), expected, "pixel ({x}, {y})");
    }

    #[test]
    fn test_thickness_one() {
        let mut frame = black_frame(20, 20);
        let annotator = RectangleAnnotator::new(BoxStyle {
            color: [255, 0, 0],
            thickness: 1,
        });
        annotator.annotate(&mut frame, &[DetectionRect::new(5, 5, 10, 10)]);
        assert_eq!(frame.pixel(5, 10), [255, 0, 0]);
        assert_eq!(frame.pixel(6, 10), BLACK);
    }

    #[test]
    fn test_zero_thickness_draws_one_pixel() {
        let mut frame = black_frame(20, 20);
        let annotator = RectangleAnnotator::new(BoxStyle {
            color: GREEN,
            thickness: 0,
        });
        annotator.annotate(&mut frame, &[DetectionRect::new(5, 5, 10, 10)]);
        assert_eq!(frame.pixel(5, 10), GREEN);
        assert_eq!(frame.pixel(6, 10), BLACK);
    }

    #[test]
    fn test_thick_stroke_fills_small_box() {
        let mut frame = black_frame(20, 20);
        let annotator = RectangleAnnotator::new(BoxStyle {
            color: GREEN,
            thickness: 10,
        });
        annotator.annotate(&mut frame, &[DetectionRect::new(2, 2, 4, 4)]);
        for y in 2..=6 {
            for x in 2..=6 {
                assert_eq!(frame.pixel(x, y), GREEN);
            }
        }
        assert_eq!(frame.pixel(7, 7), BLACK);
    }

    #[test]
    fn test_clamps_at_top_left() {
        let mut frame = black_frame(20, 20);
        RectangleAnnotator::default().annotate(&mut frame, &[DetectionRect::new(-5, -5, 10, 10)]);
        assert_eq!(frame.pixel(0, 0), GREEN);
        assert_eq!(frame.pixel(5, 0), GREEN);
        assert_eq!(frame.pixel(0, 5), GREEN);
        assert_eq!(frame.pixel(5, 5), GREEN);
        assert_eq!(frame.pixel(2, 2), BLACK);
        assert_eq!(frame.pixel(6, 6), BLACK);
    }

    #[test]
    fn test_clamps_at_bottom_right() {
        let mut frame = black_frame(20, 20);
        RectangleAnnotator::default().annotate(&mut frame, &[DetectionRect::new(15, 15, 10, 10)]);
        assert_eq!(frame.pixel(15, 15), GREEN);
        assert_eq!(frame.pixel(19, 19), GREEN);
        assert_eq!(frame.pixel(18, 17), GREEN);
        assert_eq!(frame.pixel(17, 17), BLACK);
    }

    #[rstest]
    #[case::outside_right(DetectionRect::new(30, 5, 5, 5))]
    #[case::outside_above(DetectionRect::new(5, -20, 5, 5))]
    #[case::zero_width(DetectionRect::new(5, 5, 0, 5))]
    #[case::negative_height(DetectionRect::new(5, 5, 5, -3))]
    fn test_undrawable_rects_are_skipped(#[case] rect: DetectionRect) {
        let mut frame = black_frame(20, 20);
        RectangleAnnotator::default().annotate(&mut frame, &[rect]);
        assert_eq!(frame, black_frame(20, 20));
    }

    #[test]
    fn test_draws_every_rect() {
        let mut frame = black_frame(40, 20);
        RectangleAnnotator::default().annotate(
            &mut frame,
            &[DetectionRect::new(1, 1, 5, 5), DetectionRect::new(20, 10, 5, 5)],
        );
        assert_eq!(frame.pixel(1, 1), GREEN);
        assert_eq!(frame.pixel(25, 15), GREEN);
    }

    #[test]
    fn test_style_deserializes_with_defaults() {
        let style: BoxStyle = serde_json::from_str(r#"{"thickness": 4}"#).unwrap();
        assert_eq!(style, BoxStyle { color: GREEN, thickness: 4 });
    }
}
