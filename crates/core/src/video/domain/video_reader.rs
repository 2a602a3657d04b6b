use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Reads frames from an encoded video source.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoMetadata`
/// types.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Metadata of the currently open stream, if any.
    fn metadata(&self) -> Option<&VideoMetadata>;

    /// Returns a forward-only iterator over frames in decode order.
    ///
    /// A decode failure is yielded as an `Err` item and ends the sequence.
    /// Re-reading requires closing and opening again.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader. Idempotent.
    fn close(&mut self);
}
