use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection_adapter::FaceDetectionAdapter;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::output_naming::output_path_for;
use super::pipeline_config::PipelineConfig;
use super::pipeline_error::{PipelineError, PipelineResult};
use super::pipeline_logger::PipelineLogger;

/// Lifecycle of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Source and sink are open with matching geometry and rate.
    Opened,
    Streaming,
    Finalized,
    Failed,
}

/// Decodes a video, draws a box around every detected face and re-encodes
/// the result next to the configured output directory.
///
/// Frames flow strictly in order, one at a time: decode, detect, annotate,
/// encode. Single-use: a second `execute` returns
/// [`PipelineError::AlreadyExecuted`].
pub struct AnnotateVideoUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    detector: FaceDetectionAdapter,
    annotator: Box<dyn FrameAnnotator>,
    logger: Box<dyn PipelineLogger>,
    config: PipelineConfig,
    cancelled: Arc<AtomicBool>,
    state: PipelineState,
}

impl AnnotateVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: FaceDetectionAdapter,
        annotator: Box<dyn FrameAnnotator>,
        logger: Box<dyn PipelineLogger>,
        config: PipelineConfig,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            detector,
            annotator,
            logger,
            config,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
            state: PipelineState::Idle,
        }
    }

    /// Setting this flag stops the run before the next frame is pulled.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the whole pipeline and returns the path of the written video.
    ///
    /// On failure both streams are closed and any partial output file is
    /// removed before the error is returned.
    pub fn execute(&mut self, input: &Path, output_dir: &Path) -> PipelineResult {
        let (Some(reader), Some(writer)) = (self.reader.take(), self.writer.take()) else {
            return Err(PipelineError::AlreadyExecuted);
        };

        let result = self
            .config
            .validate()
            .and_then(|()| self.run(reader, writer, input, output_dir));

        match &result {
            Ok(path) => {
                self.transition(PipelineState::Finalized);
                log::info!("Annotated {} -> {}", input.display(), path.display());
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                log::debug!("Run for {} failed: {e}", input.display());
            }
        }
        result
    }

    fn run(
        &mut self,
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        input: &Path,
        output_dir: &Path,
    ) -> PipelineResult {
        let unreadable = |source: Box<dyn std::error::Error>| PipelineError::UnreadableInput {
            path: input.to_path_buf(),
            source,
        };

        let mut source = ReaderSession::new(reader);
        let mut metadata = source.reader.open(input).map_err(unreadable)?;
        if !metadata.has_valid_geometry() {
            return Err(unreadable(
                format!(
                    "video reports zero-sized frames ({}x{})",
                    metadata.width, metadata.height
                )
                .into(),
            ));
        }

        if !metadata.reports_fps() {
            log::warn!(
                "{} reports no frame rate, writing at {} fps",
                input.display(),
                self.config.default_fps
            );
        }
        metadata.fps = metadata.effective_fps(self.config.default_fps);

        let output_path = output_path_for(input, output_dir, &self.config.output_prefix);
        let unwritable = |source: Box<dyn std::error::Error>| PipelineError::UnwritableOutput {
            path: output_path.clone(),
            source,
        };
        if is_same_file(input, &output_path) {
            return Err(unwritable("output would overwrite the input video".into()));
        }
        let mut sink = WriterSession::new(writer, output_path.clone());
        sink.open(&metadata).map_err(unwritable)?;
        self.transition(PipelineState::Opened);
        self.logger.info(&format!(
            "Annotating {} ({}x{} @ {:.2} fps) -> {}",
            input.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            output_path.display()
        ));

        self.transition(PipelineState::Streaming);
        let frames_written = self.stream(&mut source, &mut sink, metadata.total_frames)?;

        drop(source);
        sink.finish()
            .map_err(|source| PipelineError::FinalizeFailure {
                path: output_path.clone(),
                source,
            })?;

        self.logger.info(&format!("Wrote {frames_written} frames"));
        self.logger.summary();
        Ok(output_path)
    }

    /// Moves every frame from source to sink; returns the number written.
    fn stream(
        &mut self,
        source: &mut ReaderSession,
        sink: &mut WriterSession,
        total_frames: usize,
    ) -> Result<usize, PipelineError> {
        let mut frames_written = 0;
        let mut frames = source.reader.frames();

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled { frames_written });
            }

            let t = Instant::now();
            let Some(next) = frames.next() else {
                break;
            };
            let mut frame = next.map_err(|source| PipelineError::DecodeFailure {
                frame_index: frames_written,
                source,
            })?;
            self.logger.timing("decode", elapsed_ms(t));

            let t = Instant::now();
            let faces = self.detector.detect_faces(&frame).map_err(|source| {
                PipelineError::DetectionFailure {
                    frame_index: frame.index(),
                    source,
                }
            })?;
            self.logger.timing("detect", elapsed_ms(t));
            self.logger.metric("faces", faces.len() as f64);

            let t = Instant::now();
            self.annotator.annotate(&mut frame, &faces);
            self.logger.timing("annotate", elapsed_ms(t));

            let t = Instant::now();
            sink.writer
                .write(&frame)
                .map_err(|source| PipelineError::EncodeFailure {
                    frame_index: frame.index(),
                    source,
                })?;
            self.logger.timing("encode", elapsed_ms(t));

            frames_written += 1;
            self.logger.progress(frames_written, total_frames);
        }

        Ok(frames_written)
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("Pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Whether both paths resolve to the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Closes the reader when dropped.
struct ReaderSession {
    reader: Box<dyn VideoReader>,
}

impl ReaderSession {
    fn new(reader: Box<dyn VideoReader>) -> Self {
        Self { reader }
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.reader.close();
    }
}

/// Finalizes the writer exactly once. Unless [`finish`](Self::finish)
/// succeeds, a file this session created is deleted on drop. A file that
/// already existed is left alone when `open` fails before touching it.
struct WriterSession {
    writer: Box<dyn VideoWriter>,
    path: PathBuf,
    opened: bool,
    owns_file: bool,
    closed: bool,
    committed: bool,
}

impl WriterSession {
    fn new(writer: Box<dyn VideoWriter>, path: PathBuf) -> Self {
        Self {
            writer,
            path,
            opened: false,
            owns_file: false,
            closed: false,
            committed: false,
        }
    }

    fn open(&mut self, metadata: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
        self.owns_file = !self.path.exists();
        self.writer.open(&self.path, metadata)?;
        self.opened = true;
        self.owns_file = true;
        Ok(())
    }

    fn finish(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.closed = true;
        self.writer.close()?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for WriterSession {
    fn drop(&mut self) {
        if self.opened && !self.closed {
            if let Err(e) = self.writer.close() {
                log::warn!("Failed to close writer for {}: {e}", self.path.display());
            }
        }
        if self.owns_file && !self.committed {
            match std::fs::remove_file(&self.path) {
                Ok(()) => log::debug!("Removed incomplete output {}", self.path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!(
                    "Failed to remove incomplete output {}: {e}",
                    self.path.display()
                ),
            }
        }
    }
}
