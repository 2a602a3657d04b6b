pub mod detection_adapter;
pub mod detection_params;
pub mod face_detector;
pub mod grayscale;
