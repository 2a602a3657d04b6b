use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::grayscale::to_grayscale;
use crate::shared::detection_rect::DetectionRect;
use crate::shared::frame::Frame;

/// Runs a shared [`FaceDetector`] against RGB frames.
///
/// Each call converts the frame to grayscale and makes exactly one
/// detection pass. An empty result is a normal outcome.
#[derive(Clone)]
pub struct FaceDetectionAdapter {
    detector: Arc<dyn FaceDetector>,
}

impl FaceDetectionAdapter {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    pub fn detect_faces(
        &self,
        frame: &Frame,
    ) -> Result<Vec<DetectionRect>, Box<dyn std::error::Error>> {
        let gray = to_grayscale(frame);
        self.detector.detect(&gray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use std::sync::Mutex;

    struct RecordingDetector {
        seen: Mutex<Vec<(u32, u32, u8)>>,
        result: Vec<DetectionRect>,
    }

    impl FaceDetector for RecordingDetector {
        fn detect(
            &self,
            image: &GrayImage,
        ) -> Result<Vec<DetectionRect>, Box<dyn std::error::Error>> {
            let (w, h) = image.dimensions();
            self.seen.lock().unwrap().push((w, h, image.get_pixel(0, 0).0[0]));
            Ok(self.result.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&self, _: &GrayImage) -> Result<Vec<DetectionRect>, Box<dyn std::error::Error>> {
            Err("model exploded".into())
        }
    }

    #[test]
    fn test_passes_grayscale_frame_to_detector() {
        let detector = Arc::new(RecordingDetector {
            seen: Mutex::new(Vec::new()),
            result: vec![DetectionRect::new(1, 2, 3, 4)],
        });
        let adapter = FaceDetectionAdapter::new(detector.clone());

        let rects = adapter
            .detect_faces(&Frame::filled(8, 6, [255, 255, 255], 0))
            .unwrap();

        assert_eq!(rects, vec![DetectionRect::new(1, 2, 3, 4)]);
        assert_eq!(*detector.seen.lock().unwrap(), vec![(8, 6, 255)]);
    }

    #[test]
    fn test_one_pass_per_frame() {
        let detector = Arc::new(RecordingDetector {
            seen: Mutex::new(Vec::new()),
            result: Vec::new(),
        });
        let adapter = FaceDetectionAdapter::new(detector.clone());

        for i in 0..3 {
            assert!(adapter
                .detect_faces(&Frame::filled(4, 4, [0, 0, 0], i))
                .unwrap()
                .is_empty());
        }
        assert_eq!(detector.seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_detector_error_propagates() {
        let adapter = FaceDetectionAdapter::new(Arc::new(FailingDetector));
        let err = adapter
            .detect_faces(&Frame::filled(4, 4, [0, 0, 0], 0))
            .unwrap_err();
        assert!(err.to_string().contains("model exploded"));
    }
}
