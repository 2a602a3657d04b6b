use std::path::{Path, PathBuf};

use ffmpeg_next::Rational;

use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Default MJPEG quantizer: 2 (best) to 31 (worst).
pub const DEFAULT_QSCALE: u32 = 2;

/// libavcodec's `FF_QP2LAMBDA`.
const QP2LAMBDA: u32 = 118;

/// Encodes frames as Motion-JPEG inside an AVI container via ffmpeg-next.
///
/// Every frame is an independent JPEG, so the encoder never holds frames
/// back and any geometry the decoder produced can be written. The
/// container is AVI regardless of the output path's extension.
pub struct FfmpegWriter {
    output_path: Option<PathBuf>,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    time_base: Rational,
    qscale: u32,
    frame_count: usize,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            output_path: None,
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            time_base: Rational(0, 1),
            qscale: DEFAULT_QSCALE,
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    /// Sets the JPEG quantizer (clamped to 2..=31).
    pub fn with_qscale(mut self, qscale: u32) -> Self {
        self.qscale = qscale.clamp(2, 31);
        self
    }

    /// Number of frames accepted since the last `open`.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_some() {
            return Err("FfmpegWriter: already open".into());
        }
        if !metadata.has_valid_geometry() {
            return Err(format!(
                "cannot encode zero-sized frames ({}x{})",
                metadata.width, metadata.height
            )
            .into());
        }
        let rate = frame_rate_rational(metadata.fps)
            .ok_or_else(|| format!("unsupported frame rate: {}", metadata.fps))?;
        let time_base = rate.invert();

        ffmpeg_next::init()?;

        let mut octx = ffmpeg_next::format::output_as(&path, "avi")?;

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MJPEG)
            .ok_or("MJPEG encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;
        self.video_stream_index = ost.index();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUVJ420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(rate));
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::QSCALE);
        encoder_ctx.set_quality((self.qscale * QP2LAMBDA) as usize);

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);
        ost.set_rate(rate);
        ost.set_avg_frame_rate(rate);

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUVJ420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened MJPEG/AVI writer {}: {}x{} @ {}/{} fps",
            path.display(),
            metadata.width,
            metadata.height,
            rate.numerator(),
            rate.denominator()
        );

        self.width = metadata.width;
        self.height = metadata.height;
        self.time_base = time_base;
        self.output_path = Some(path.to_path_buf());
        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(scaler), Some(octx)) = (
            self.encoder.as_mut(),
            self.scaler.as_mut(),
            self.octx.as_mut(),
        ) else {
            return Err("FfmpegWriter: not opened".into());
        };

        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame {} is {}x{}, stream is {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * CHANNELS;
        let dst = rgb_frame.data_mut(0);
        let src = frame.data();

        for row in 0..self.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            dst[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        drain_packets(encoder, octx, self.time_base, self.video_stream_index)?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.scaler = None;
        let (Some(mut encoder), Some(mut octx)) = (self.encoder.take(), self.octx.take()) else {
            return Ok(());
        };

        encoder.send_eof()?;
        drain_packets(&mut encoder, &mut octx, self.time_base, self.video_stream_index)?;
        octx.write_trailer()?;

        if let Some(path) = self.output_path.take() {
            log::debug!("Finalized {} ({} frames)", path.display(), self.frame_count);
        }
        Ok(())
    }
}

/// Moves every packet the encoder has ready into the container.
fn drain_packets(
    encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
    octx: &mut ffmpeg_next::format::context::Output,
    encoder_time_base: Rational,
    stream_index: usize,
) -> Result<(), ffmpeg_next::Error> {
    let ost_time_base = octx
        .stream(stream_index)
        .ok_or(ffmpeg_next::Error::StreamNotFound)?
        .time_base();

    let mut encoded = ffmpeg_next::Packet::empty();
    loop {
        match encoder.receive_packet(&mut encoded) {
            Ok(()) => {
                encoded.set_stream(stream_index);
                encoded.rescale_ts(encoder_time_base, ost_time_base);
                encoded.write_interleaved(octx)?;
            }
            Err(ffmpeg_next::Error::Eof) => return Ok(()),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
                return Ok(())
            }
            Err(e) => return Err(e),
        }
    }
}

/// Exact rational for whole-number rates, nearest rational otherwise.
fn frame_rate_rational(fps: f64) -> Option<Rational> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }
    let rounded = fps.round();
    if (fps - rounded).abs() < 1e-6 && rounded <= i32::MAX as f64 {
        return Some(Rational(rounded as i32, 1));
    }
    let rate = Rational::from(fps);
    (rate.numerator() > 0 && rate.denominator() > 0).then_some(rate)
}
