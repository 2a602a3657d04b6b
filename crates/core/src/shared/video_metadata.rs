use std::path::PathBuf;

/// Stream properties reported by a video source.
///
/// `fps` is what the container declared; `0.0` means it declared nothing
/// usable. Callers resolve it with [`VideoMetadata::effective_fps`].
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count from the container header, 0 when unknown.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Whether the container reported a usable frame rate.
    pub fn reports_fps(&self) -> bool {
        self.fps.is_finite() && self.fps > 0.0
    }

    /// The reported frame rate, or `fallback` when none was reported.
    pub fn effective_fps(&self, fallback: f64) -> f64 {
        if self.reports_fps() {
            self.fps
        } else {
            fallback
        }
    }

    pub fn has_valid_geometry(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
