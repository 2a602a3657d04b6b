use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR};

#[derive(Error, Debug, PartialEq)]
pub enum InvalidParams {
    #[error("scale factor must be a finite number greater than 1, got {0}")]
    ScaleFactor(f64),
}

/// Tuning knobs for the multi-scale cascade scan.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Ratio between successive window sizes.
    pub scale_factor: f64,
    /// Overlapping raw hits a region needs, beyond the first, to be kept.
    pub min_neighbors: u32,
    /// Smallest face side in pixels; 0 means the cascade's window size.
    pub min_size: u32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: 0,
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<(), InvalidParams> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(InvalidParams::ScaleFactor(self.scale_factor));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let params = DetectionParams::default();
        assert_relative_eq!(params.scale_factor, 1.1);
        assert_eq!(params.min_neighbors, 5);
        assert_eq!(params.min_size, 0);
        assert!(params.validate().is_ok());
    }

    #[rstest]
    #[case(1.0)]
    #[case(0.5)]
    #[case(-2.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_rejects_bad_scale_factor(#[case] scale_factor: f64) {
        let params = DetectionParams {
            scale_factor,
            ..DetectionParams::default()
        };
        assert!(matches!(params.validate(), Err(InvalidParams::ScaleFactor(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: DetectionParams = serde_json::from_str(r#"{"min_neighbors": 3}"#).unwrap();
        assert_eq!(params.min_neighbors, 3);
        assert_relative_eq!(params.scale_factor, 1.1);
    }
}
