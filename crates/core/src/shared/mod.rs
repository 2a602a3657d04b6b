pub mod constants;
pub mod detection_rect;
pub mod frame;
pub mod model_resolver;
pub mod video_metadata;
