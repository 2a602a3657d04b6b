use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::infrastructure::box_annotator::BoxStyle;
use crate::detection::domain::detection_params::DetectionParams;
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::constants::{DEFAULT_FPS, OUTPUT_PREFIX};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything a pipeline run can be tuned with. Missing JSON fields take
/// their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection: DetectionParams,
    pub annotation: BoxStyle,
    /// Output frame rate when the input container reports none.
    pub default_fps: f64,
    pub output_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection: DetectionParams::default(),
            annotation: BoxStyle::default(),
            default_fps: DEFAULT_FPS,
            output_prefix: OUTPUT_PREFIX.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.detection
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        if !self.default_fps.is_finite() || self.default_fps <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "default fps must be positive, got {}",
                self.default_fps
            )));
        }
        if self.annotation.thickness == 0 {
            return Err(PipelineError::InvalidConfig(
                "box thickness must be at least 1".into(),
            ));
        }
        if self.output_prefix.contains(['/', '\\']) {
            return Err(PipelineError::InvalidConfig(format!(
                "output prefix must not contain path separators: {:?}",
                self.output_prefix
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_relative_eq!(config.default_fps, 24.0);
        assert_relative_eq!(config.detection.scale_factor, 1.1);
        assert_eq!(config.detection.min_neighbors, 5);
        assert_eq!(config.annotation.color, [0, 255, 0]);
        assert_eq!(config.annotation.thickness, 2);
        assert_eq!(config.output_prefix, "processed_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"detection": {"min_neighbors": 3}, "annotation": {"color": [255, 0, 0]}, "default_fps": 30}"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.detection.min_neighbors, 3);
        assert_relative_eq!(config.detection.scale_factor, 1.1);
        assert_eq!(config.annotation.color, [255, 0, 0]);
        assert_eq!(config.annotation.thickness, 2);
        assert_relative_eq!(config.default_fps, 30.0);
        assert_eq!(config.output_prefix, "processed_");
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = PipelineConfig::from_json_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_json_file_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            PipelineConfig {
                default_fps: 0.0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                default_fps: f64::NAN,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                detection: DetectionParams {
                    scale_factor: 1.0,
                    ..DetectionParams::default()
                },
                ..PipelineConfig::default()
            },
            PipelineConfig {
                annotation: BoxStyle {
                    thickness: 0,
                    ..BoxStyle::default()
                },
                ..PipelineConfig::default()
            },
            PipelineConfig {
                output_prefix: "../escape/".into(),
                ..PipelineConfig::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(PipelineError::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }
}
