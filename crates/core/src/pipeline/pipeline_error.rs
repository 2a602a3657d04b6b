use std::path::PathBuf;

use thiserror::Error;

type Source = Box<dyn std::error::Error>;

/// Outcome of one run: the written video's path, or why nothing was kept.
pub type PipelineResult = Result<PathBuf, PipelineError>;

/// Why a pipeline run failed. Every variant names the stage that failed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read input video {path}: {source}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: Source,
    },
    #[error("cannot create output video {path}: {source}")]
    UnwritableOutput {
        path: PathBuf,
        #[source]
        source: Source,
    },
    #[error("failed to decode frame {frame_index}: {source}")]
    DecodeFailure {
        frame_index: usize,
        #[source]
        source: Source,
    },
    #[error("failed to encode frame {frame_index}: {source}")]
    EncodeFailure {
        frame_index: usize,
        #[source]
        source: Source,
    },
    #[error("failed to finalize output video {path}: {source}")]
    FinalizeFailure {
        path: PathBuf,
        #[source]
        source: Source,
    },
    #[error("face detector unavailable: {0}")]
    DetectorUnavailable(#[source] Source),
    #[error("face detection failed on frame {frame_index}: {source}")]
    DetectionFailure {
        frame_index: usize,
        #[source]
        source: Source,
    },
    #[error("cancelled after {frames_written} frames")]
    Cancelled { frames_written: usize },
    #[error("pipeline already executed")]
    AlreadyExecuted,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
