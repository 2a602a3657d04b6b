use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Abstracts video encoding so the pipeline can write output without
/// depending on a specific codec library.
pub trait VideoWriter: Send {
    /// Creates the output container for `metadata`'s geometry and frame rate.
    ///
    /// All codec and container setup happens here so an unsupported
    /// combination fails before any frame is accepted.
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes pending packets and finalizes the container. Only the first
    /// call after `open` does any work.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
