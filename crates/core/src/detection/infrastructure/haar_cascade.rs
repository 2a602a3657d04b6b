//! Boosted Haar cascades in OpenCV's `opencv-cascade-classifier` XML format.
//!
//! Only upright HAAR features with BOOST stages are supported, which covers
//! the stock frontal-face cascades shipped with OpenCV. Windows are scored on
//! integral images with the same variance normalisation OpenCV applies, so a
//! cascade trained there behaves the same here.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::GrayImage;
use thiserror::Error;

/// Subtracted from every stage threshold, matching OpenCV's loader.
const STAGE_THRESHOLD_EPS: f32 = 1e-5;

/// Windows whose normalised area/deviation ratio reaches this are too flat
/// to classify (standard deviation of 10 gray levels or less).
const FLAT_WINDOW_RATIO: f64 = 0.1;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cascade XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("cascade is missing <{0}>")]
    MissingElement(String),
    #[error("invalid value in <{element}>: {value:?}")]
    InvalidValue { element: String, value: String },
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TreeNode {
    /// Positive: index of the next node. Zero or negative: `-leaf`.
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Clone, Debug, PartialEq)]
struct WeakClassifier {
    nodes: Vec<TreeNode>,
    leaves: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
struct Stage {
    threshold: f64,
    classifiers: Vec<WeakClassifier>,
}

/// Outcome of running the cascade on one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Face,
    /// Rejected by the stage with this index.
    Rejected(usize),
    /// Not evaluated: the window's contrast is too low.
    Flat,
}

/// A parsed cascade ready for window evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn from_file(path: &Path) -> Result<Self, CascadeError> {
        let text = std::fs::read_to_string(path).map_err(|source| CascadeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cascade = Self::from_xml(&text)?;
        log::debug!(
            "Loaded cascade {}: {}x{} window, {} stages, {} features",
            path.display(),
            cascade.window_width,
            cascade.window_height,
            cascade.stages.len(),
            cascade.features.len()
        );
        Ok(cascade)
    }

    pub fn from_xml(text: &str) -> Result<Self, CascadeError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();

        let cascade = match element(root, "cascade") {
            Ok(node) => node,
            Err(missing) => {
                let legacy = root
                    .children()
                    .any(|c| c.attribute("type_id") == Some("opencv-haar-classifier"));
                return Err(if legacy {
                    CascadeError::Unsupported("legacy opencv-haar-classifier format".into())
                } else {
                    missing
                });
            }
        };

        let stage_type = text_of(element(cascade, "stageType")?);
        if stage_type != "BOOST" {
            return Err(CascadeError::Unsupported(format!("stage type {stage_type}")));
        }
        let feature_type = text_of(element(cascade, "featureType")?);
        if feature_type != "HAAR" {
            return Err(CascadeError::Unsupported(format!("feature type {feature_type}")));
        }

        let window_width: u32 = number(element(cascade, "width")?)?;
        let window_height: u32 = number(element(cascade, "height")?)?;
        if window_width < 3 || window_height < 3 {
            return Err(CascadeError::Unsupported(format!(
                "window {window_width}x{window_height} is too small"
            )));
        }

        let features = items(element(cascade, "features")?)
            .map(|node| parse_feature(node, window_width, window_height))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = items(element(cascade, "stages")?)
            .map(|node| parse_stage(node, features.len()))
            .collect::<Result<Vec<_>, _>>()?;

        if stages.is_empty() {
            return Err(CascadeError::Unsupported("cascade has no stages".into()));
        }

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    /// Detection window size the cascade was trained on.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs every stage on the window whose top-left corner is `(x, y)`.
    ///
    /// The window must fit inside the integral image.
    pub fn classify(&self, integral: &IntegralImage, x: u32, y: u32) -> Verdict {
        let norm_area = ((self.window_width - 2) * (self.window_height - 2)) as f64;
        let sum = integral.sum(x + 1, y + 1, self.window_width - 2, self.window_height - 2) as f64;
        let sq_sum =
            integral.sq_sum(x + 1, y + 1, self.window_width - 2, self.window_height - 2) as f64;

        let nf = norm_area * sq_sum - sum * sum;
        if nf <= 0.0 {
            return Verdict::Flat;
        }
        let nf = nf.sqrt();
        if norm_area / nf >= FLAT_WINDOW_RATIO {
            return Verdict::Flat;
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let score: f64 = stage
                .classifiers
                .iter()
                .map(|weak| self.weak_response(weak, integral, x, y, nf))
                .sum();
            if score < stage.threshold {
                return Verdict::Rejected(index);
            }
        }
        Verdict::Face
    }

    fn weak_response(
        &self,
        weak: &WeakClassifier,
        integral: &IntegralImage,
        x: u32,
        y: u32,
        nf: f64,
    ) -> f64 {
        let mut index = 0usize;
        loop {
            let node = &weak.nodes[index];
            let value = self.feature_value(node.feature, integral, x, y) / nf;
            let next = if value < node.threshold {
                node.left
            } else {
                node.right
            };
            if next <= 0 {
                return weak.leaves[next.unsigned_abs() as usize];
            }
            index = next as usize;
        }
    }

    fn feature_value(&self, feature: usize, integral: &IntegralImage, x: u32, y: u32) -> f64 {
        self.features[feature]
            .rects
            .iter()
            .map(|r| r.weight * integral.sum(x + r.x, y + r.y, r.width, r.height) as f64)
            .sum()
    }
}

/// Summed-area tables of pixel values and squared pixel values.
pub struct IntegralImage {
    stride: usize,
    sum: Vec<i64>,
    sq_sum: Vec<i64>,
}

impl IntegralImage {
    pub fn new(image: &GrayImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0i64; stride * (height + 1)];
        let mut sq_sum = vec![0i64; stride * (height + 1)];
        let pixels = image.as_raw();

        for y in 0..height {
            let mut row_sum = 0i64;
            let mut row_sq_sum = 0i64;
            for x in 0..width {
                let v = pixels[y * width + x] as i64;
                row_sum += v;
                row_sq_sum += v * v;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row_sum;
                sq_sum[at] = sq_sum[at - stride] + row_sq_sum;
            }
        }

        Self {
            stride,
            sum,
            sq_sum,
        }
    }

    pub fn sum(&self, x: u32, y: u32, width: u32, height: u32) -> i64 {
        self.area(&self.sum, x, y, width, height)
    }

    pub fn sq_sum(&self, x: u32, y: u32, width: u32, height: u32) -> i64 {
        self.area(&self.sq_sum, x, y, width, height)
    }

    fn area(&self, table: &[i64], x: u32, y: u32, width: u32, height: u32) -> i64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + width as usize, y0 + height as usize);
        table[y1 * self.stride + x1] - table[y0 * self.stride + x1] - table[y1 * self.stride + x0]
            + table[y0 * self.stride + x0]
    }
}

fn parse_feature(
    node: roxmltree::Node<'_, '_>,
    window_width: u32,
    window_height: u32,
) -> Result<HaarFeature, CascadeError> {
    if let Ok(tilted) = element(node, "tilted") {
        if text_of(tilted) != "0" {
            return Err(CascadeError::Unsupported("tilted features".into()));
        }
    }

    let rects = items(element(node, "rects")?)
        .map(|rect| {
            let raw = text_of(rect);
            let invalid = || CascadeError::InvalidValue {
                element: "rects".into(),
                value: raw.to_string(),
            };
            let fields: Vec<&str> = raw.split_whitespace().collect();
            let &[x, y, w, h, weight] = fields.as_slice() else {
                return Err(invalid());
            };
            let parsed = WeightedRect {
                x: x.parse().map_err(|_| invalid())?,
                y: y.parse().map_err(|_| invalid())?,
                width: w.parse().map_err(|_| invalid())?,
                height: h.parse().map_err(|_| invalid())?,
                weight: weight.parse().map_err(|_| invalid())?,
            };
            let fits = |start: u32, len: u32, limit: u32| {
                start.checked_add(len).is_some_and(|end| end <= limit)
            };
            if !fits(parsed.x, parsed.width, window_width)
                || !fits(parsed.y, parsed.height, window_height)
            {
                return Err(invalid());
            }
            Ok(parsed)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if rects.is_empty() {
        return Err(CascadeError::MissingElement("rects/_".into()));
    }
    Ok(HaarFeature { rects })
}

fn parse_stage(node: roxmltree::Node<'_, '_>, feature_count: usize) -> Result<Stage, CascadeError> {
    let threshold: f64 = number(element(node, "stageThreshold")?)?;
    let classifiers = items(element(node, "weakClassifiers")?)
        .map(|weak| parse_weak_classifier(weak, feature_count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold: threshold - STAGE_THRESHOLD_EPS as f64,
        classifiers,
    })
}

fn parse_weak_classifier(
    node: roxmltree::Node<'_, '_>,
    feature_count: usize,
) -> Result<WeakClassifier, CascadeError> {
    let internal = element(node, "internalNodes")?;
    let raw_nodes: Vec<f64> = numbers(internal)?;
    let leaves: Vec<f64> = numbers(element(node, "leafValues")?)?;

    let invalid = || CascadeError::InvalidValue {
        element: "internalNodes".into(),
        value: text_of(internal).to_string(),
    };
    if raw_nodes.is_empty() || raw_nodes.len() % 4 != 0 {
        return Err(invalid());
    }

    let node_count = raw_nodes.len() / 4;
    let nodes = raw_nodes
        .chunks_exact(4)
        .enumerate()
        .map(|(index, chunk)| {
            let node = TreeNode {
                left: chunk[0] as i32,
                right: chunk[1] as i32,
                feature: chunk[2] as usize,
                threshold: chunk[3],
            };
            // Children must point forward so every walk terminates.
            let child_ok = |child: i32| {
                if child > 0 {
                    (child as usize) > index && (child as usize) < node_count
                } else {
                    (child.unsigned_abs() as usize) < leaves.len()
                }
            };
            if chunk[2] < 0.0 || node.feature >= feature_count {
                return Err(invalid());
            }
            if !child_ok(node.left) || !child_ok(node.right) {
                return Err(invalid());
            }
            Ok(node)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WeakClassifier { nodes, leaves })
}

fn element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Result<roxmltree::Node<'a, 'input>, CascadeError> {
    node.children()
        .find(|c| c.is_element() && c.has_tag_name(name))
        .ok_or_else(|| CascadeError::MissingElement(name.to_string()))
}

/// `<_>` children, OpenCV's sequence item tag.
fn items<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && c.has_tag_name("_"))
}

fn text_of<'a>(node: roxmltree::Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("").trim()
}

fn number<T: FromStr>(node: roxmltree::Node<'_, '_>) -> Result<T, CascadeError> {
    let raw = text_of(node);
    raw.parse().map_err(|_| CascadeError::InvalidValue {
        element: node.tag_name().name().to_string(),
        value: raw.to_string(),
    })
}

fn numbers<T: FromStr>(node: roxmltree::Node<'_, '_>) -> Result<Vec<T>, CascadeError> {
    let raw = text_of(node);
    raw.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| CascadeError::InvalidValue {
                element: node.tag_name().name().to_string(),
                value: raw.to_string(),
            })
        })
        .collect()
}
