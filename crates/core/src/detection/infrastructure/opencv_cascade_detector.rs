use std::path::Path;
use std::sync::Mutex;

use image::GrayImage;
use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use crate::detection::domain::detection_params::DetectionParams;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::detection_rect::DetectionRect;

/// Haar cascade detection through OpenCV's `CascadeClassifier`.
pub struct OpenCvCascadeDetector {
    // detect_multi_scale needs &mut; one frame at a time per instance.
    classifier: Mutex<CascadeClassifier>,
    params: DetectionParams,
}

impl OpenCvCascadeDetector {
    pub fn new(
        cascade_path: &Path,
        params: DetectionParams,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        params.validate()?;
        let path = cascade_path
            .to_str()
            .ok_or_else(|| format!("non UTF-8 cascade path: {}", cascade_path.display()))?;
        let classifier = CascadeClassifier::new(path)?;
        if classifier.empty()? {
            return Err(format!("OpenCV could not load cascade {}", cascade_path.display()).into());
        }
        log::debug!("Loaded OpenCV cascade {}", cascade_path.display());
        Ok(Self {
            classifier: Mutex::new(classifier),
            params,
        })
    }
}

impl FaceDetector for OpenCvCascadeDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<DetectionRect>, Box<dyn std::error::Error>> {
        let (width, height) = image.dimensions();
        let mat = Mat::new_rows_cols_with_data(height as i32, width as i32, image.as_raw())?
            .try_clone()?;

        let min = self.params.min_size as i32;
        let mut faces = Vector::<Rect>::new();
        self.classifier
            .lock()
            .map_err(|_| "OpenCV classifier lock poisoned")?
            .detect_multi_scale(
                &mat,
                &mut faces,
                self.params.scale_factor,
                self.params.min_neighbors as i32,
                0,
                Size::new(min, min),
                Size::default(),
            )?;

        Ok(faces
            .iter()
            .map(|r| DetectionRect::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}
