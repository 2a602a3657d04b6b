use std::borrow::Cow;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::detection::domain::detection_params::{DetectionParams, InvalidParams};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::haar_cascade::{HaarCascade, IntegralImage, Verdict};
use crate::detection::infrastructure::rect_grouping::group_rectangles;
use crate::shared::constants::GROUPING_EPS;
use crate::shared::detection_rect::DetectionRect;

/// Pure-Rust multi-scale Haar cascade detector.
///
/// Instead of growing the window, the image is shrunk by successive powers
/// of `scale_factor` and scanned with the cascade's native window. Hits are
/// mapped back to frame coordinates and grouped with `min_neighbors`.
pub struct HaarCascadeDetector {
    cascade: HaarCascade,
    params: DetectionParams,
}

impl HaarCascadeDetector {
    pub fn new(cascade: HaarCascade, params: DetectionParams) -> Result<Self, InvalidParams> {
        params.validate()?;
        Ok(Self { cascade, params })
    }

    pub fn from_file(
        path: &Path,
        params: DetectionParams,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let cascade = HaarCascade::from_file(path)?;
        Ok(Self::new(cascade, params)?)
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Ungrouped window hits across every scale.
    fn raw_hits(&self, image: &GrayImage) -> Vec<DetectionRect> {
        let (img_w, img_h) = image.dimensions();
        let (win_w, win_h) = self.cascade.window_size();
        let min_size = self.params.min_size;

        let mut hits = Vec::new();
        let mut factor = 1.0f64;
        loop {
            let level = ScaleLevel {
                factor,
                scaled_w: (img_w as f64 / factor).round() as u32,
                scaled_h: (img_h as f64 / factor).round() as u32,
                det_w: (win_w as f64 * factor).round() as u32,
                det_h: (win_h as f64 * factor).round() as u32,
            };
            if level.scaled_w < win_w || level.scaled_h < win_h {
                break;
            }
            if level.det_w > img_w || level.det_h > img_h {
                break;
            }

            if level.det_w >= min_size && level.det_h >= min_size {
                let scaled: Cow<'_, GrayImage> = if factor == 1.0 {
                    Cow::Borrowed(image)
                } else {
                    Cow::Owned(imageops::resize(
                        image,
                        level.scaled_w,
                        level.scaled_h,
                        FilterType::Triangle,
                    ))
                };
                let integral = IntegralImage::new(&scaled);
                self.scan_level(&integral, &level, (img_w, img_h), &mut hits);
            }

            factor *= self.params.scale_factor;
        }
        hits
    }

    fn scan_level(
        &self,
        integral: &IntegralImage,
        level: &ScaleLevel,
        (img_w, img_h): (u32, u32),
        hits: &mut Vec<DetectionRect>,
    ) {
        let (win_w, win_h) = self.cascade.window_size();
        let step = if level.factor > 2.0 { 1 } else { 2 };

        for y in (0..=level.scaled_h - win_h).step_by(step as usize) {
            let mut x = 0;
            while x <= level.scaled_w - win_w {
                match self.cascade.classify(integral, x, y) {
                    Verdict::Face => {
                        // Rounding may push the last column a pixel past the edge.
                        let fx = ((x as f64 * level.factor).round() as u32).min(img_w - level.det_w);
                        let fy = ((y as f64 * level.factor).round() as u32).min(img_h - level.det_h);
                        hits.push(DetectionRect::new(
                            fx as i32,
                            fy as i32,
                            level.det_w as i32,
                            level.det_h as i32,
                        ));
                    }
                    Verdict::Rejected(0) => x += step,
                    _ => {}
                }
                x += step;
            }
        }
    }
}

/// One image pyramid level.
struct ScaleLevel {
    factor: f64,
    scaled_w: u32,
    scaled_h: u32,
    /// Window size mapped back to frame pixels.
    det_w: u32,
    det_h: u32,
}

impl FaceDetector for HaarCascadeDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<DetectionRect>, Box<dyn std::error::Error>> {
        let hits = self.raw_hits(image);
        let faces = group_rectangles(&hits, self.params.min_neighbors as i32, GROUPING_EPS);
        log::trace!("{} raw hits grouped into {} faces", hits.len(), faces.len());
        Ok(faces)
    }
}
