use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use face_annotate_core::annotation::infrastructure::box_annotator::RectangleAnnotator;
use face_annotate_core::detection::domain::detection_adapter::FaceDetectionAdapter;
use face_annotate_core::detection::infrastructure::detector_factory::{
    create_detector, DetectorBackend,
};
use face_annotate_core::pipeline::annotate_video_use_case::AnnotateVideoUseCase;
use face_annotate_core::pipeline::output_naming::is_supported_input;
use face_annotate_core::pipeline::pipeline_config::PipelineConfig;
use face_annotate_core::pipeline::pipeline_error::PipelineError;
use face_annotate_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use face_annotate_core::shared::constants::{
    CASCADE_MODEL_NAME, CASCADE_MODEL_URL, VIDEO_EXTENSIONS,
};
use face_annotate_core::shared::model_resolver::{self, ModelLocation};
use face_annotate_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use face_annotate_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Draws a box around every face in a video.
#[derive(Parser)]
#[command(name = "face-annotate")]
struct Cli {
    /// Input video (.mp4, .avi or .mov).
    input: PathBuf,

    /// Directory for the annotated video (defaults to the current directory).
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Ratio between successive detection window sizes (> 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Overlapping raw hits needed to keep a face.
    #[arg(long)]
    min_neighbors: Option<u32>,

    /// Smallest face size in pixels (0 = no limit).
    #[arg(long)]
    min_size: Option<u32>,

    /// Frame rate to write when the input reports none.
    #[arg(long)]
    default_fps: Option<f64>,

    /// Box outline width in pixels.
    #[arg(long)]
    thickness: Option<u32>,

    /// Haar cascade XML file (downloaded and cached when omitted).
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Cascade backend: opencv, or native for builds without OpenCV.
    #[arg(long, default_value = "opencv")]
    backend: DetectorBackend,

    /// JSON file with pipeline settings; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    config.validate()?;

    let cascade_path = resolve_cascade(cli.cascade.as_deref())?;
    let detector = create_detector(cli.backend, &cascade_path, config.detection)
        .map_err(PipelineError::DetectorUnavailable)?;

    let annotator = RectangleAnnotator::new(config.annotation);
    let mut use_case = AnnotateVideoUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        FaceDetectionAdapter::new(detector),
        Box::new(annotator),
        Box::new(StdoutPipelineLogger::default()),
        config,
        None,
    );

    let output = use_case.execute(&cli.input, &cli.output_dir)?;
    println!("{}", output.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !is_supported_input(&cli.input) {
        return Err(format!(
            "Unsupported input {}: expected one of {}",
            cli.input.display(),
            VIDEO_EXTENSIONS.join(", ")
        )
        .into());
    }
    if !cli.input.is_file() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !cli.output_dir.is_dir() {
        return Err(format!(
            "Output directory not found: {}",
            cli.output_dir.display()
        )
        .into());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(v) = cli.scale_factor {
        config.detection.scale_factor = v;
    }
    if let Some(v) = cli.min_neighbors {
        config.detection.min_neighbors = v;
    }
    if let Some(v) = cli.min_size {
        config.detection.min_size = v;
    }
    if let Some(v) = cli.default_fps {
        config.default_fps = v;
    }
    if let Some(v) = cli.thickness {
        config.annotation.thickness = v;
    }
    Ok(config)
}

fn resolve_cascade(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let bundled_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));

    log::info!("Resolving cascade: {CASCADE_MODEL_NAME}");
    let path = model_resolver::resolve(
        &ModelLocation {
            name: CASCADE_MODEL_NAME,
            url: CASCADE_MODEL_URL,
            explicit,
            bundled_dir: bundled_dir.as_deref(),
        },
        Some(Box::new(download_progress)),
    )
    .map_err(|e| PipelineError::DetectorUnavailable(Box::new(e)))?;
    Ok(path)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face cascade... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face cascade... {downloaded} bytes");
    }
}
