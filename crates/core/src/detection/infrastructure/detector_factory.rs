use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::detection::domain::detection_params::DetectionParams;
use crate::detection::domain::face_detector::FaceDetector;

use super::cascade_detector::HaarCascadeDetector;

/// Cascade evaluation backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectorBackend {
    /// OpenCV's `CascadeClassifier`. Needs the `opencv` feature (on by default).
    #[default]
    OpenCv,
    /// Built-in Haar evaluator, for builds without OpenCV.
    Native,
}

impl FromStr for DetectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "opencv" => Ok(Self::OpenCv),
            other => Err(format!("unknown detector backend: {other}")),
        }
    }
}

/// Builds a shareable detector for `cascade_path`.
///
/// Called once at startup; the result is reused for every frame.
pub fn create_detector(
    backend: DetectorBackend,
    cascade_path: &Path,
    params: DetectionParams,
) -> Result<Arc<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!(
        "Using {:?} cascade backend with {} (scale_factor={}, min_neighbors={})",
        backend,
        cascade_path.display(),
        params.scale_factor,
        params.min_neighbors
    );
    match backend {
        DetectorBackend::OpenCv => create_opencv(cascade_path, params),
        DetectorBackend::Native => Ok(Arc::new(HaarCascadeDetector::from_file(cascade_path, params)?)),
    }
}

#[cfg(feature = "opencv")]
fn create_opencv(
    cascade_path: &Path,
    params: DetectionParams,
) -> Result<Arc<dyn FaceDetector>, Box<dyn std::error::Error>> {
    use super::opencv_cascade_detector::OpenCvCascadeDetector;
    Ok(Arc::new(OpenCvCascadeDetector::new(cascade_path, params)?))
}

#[cfg(not(feature = "opencv"))]
fn create_opencv(
    _cascade_path: &Path,
    _params: DetectionParams,
) -> Result<Arc<dyn FaceDetector>, Box<dyn std::error::Error>> {
    Err("the OpenCV backend was not compiled in (enable the `opencv` feature or use --backend native)".into())
}
