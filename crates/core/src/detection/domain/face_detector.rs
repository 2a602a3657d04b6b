use image::GrayImage;

use crate::shared::detection_rect::DetectionRect;

/// Domain interface for face detection on a single grayscale image.
///
/// Detectors hold no per-frame state, so one instance can be shared
/// behind an `Arc` by concurrent pipeline runs.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Result<Vec<DetectionRect>, Box<dyn std::error::Error>>;
}
