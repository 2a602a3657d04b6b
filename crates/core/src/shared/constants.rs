pub const CASCADE_MODEL_NAME: &str = "haarcascade_frontalface_default.xml";
pub const CASCADE_MODEL_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

/// Frame rate used when the input container does not report one.
pub const DEFAULT_FPS: f64 = 24.0;

/// Ratio between successive detection window sizes.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;

/// Overlapping raw hits required before a region counts as a face.
pub const DEFAULT_MIN_NEIGHBORS: u32 = 5;

/// Similarity tolerance used when clustering raw detections.
pub const GROUPING_EPS: f64 = 0.2;

pub const DEFAULT_BOX_COLOR: [u8; 3] = [0, 255, 0];
pub const DEFAULT_BOX_THICKNESS: u32 = 2;

pub const OUTPUT_PREFIX: &str = "processed_";
pub const OUTPUT_EXTENSION: &str = "avi";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];
