//! Face detection and bounding-box annotation for video files.
//!
//! Frames are decoded with ffmpeg, run through a Haar cascade detector,
//! outlined and re-encoded as MJPEG in an AVI container.

pub mod annotation;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;
