//! Engine configuration.
//!
//! Every knob has a default, so an empty TOML document is a valid config.

use crate::core_modules::advice::{AdviceTarget, IntensityNormalization};
use crate::core_modules::component_extractor::RegionThresholds;
use crate::core_modules::composition::SubjectPolicy;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the `CompositionPipeline` and its async front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Saliency values strictly above this become foreground.
    pub binarize_threshold: f32,
    /// Longest side of the processing raster. Larger images are downsampled.
    pub processing_max_dimension: u32,
    /// Fixed size gates for regions. `None` derives them from the processing resolution.
    pub region_thresholds: Option<RegionThresholds>,
    pub advice_target: AdviceTarget,
    pub subject_policy: SubjectPolicy,
    pub intensity: IntensityNormalization,
    /// Minimum time between two analyses in streaming mode, in milliseconds.
    pub stream_min_interval_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            binarize_threshold: 0.01,
            processing_max_dimension: 800,
            region_thresholds: None,
            advice_target: AdviceTarget::Best,
            subject_policy: SubjectPolicy::ScanOrder,
            intensity: IntensityNormalization::default(),
            stream_min_interval_ms: 200,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| AnalysisError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.binarize_threshold) {
            return Err(AnalysisError::InvalidThreshold(self.binarize_threshold));
        }
        if self.processing_max_dimension == 0 {
            return Err(AnalysisError::invalid_config(
                "processing_max_dimension must be greater than zero",
            ));
        }
        if let IntensityNormalization::FixedPixels { reference } = self.intensity {
            if !(reference > 0.0 && reference.is_finite()) {
                return Err(AnalysisError::invalid_config(format!(
                    "intensity reference must be a positive distance, got {reference}"
                )));
            }
        }
        Ok(())
    }

    /// Region size gates for a processing raster of `width` x `height`.
    pub fn thresholds_for(&self, width: u32, height: u32) -> RegionThresholds {
        self.region_thresholds
            .unwrap_or_else(|| RegionThresholds::for_resolution(width, height))
    }

    pub fn stream_min_interval(&self) -> Duration {
        Duration::from_millis(self.stream_min_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(AnalysisConfig::from_toml_str("").unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn full_document_parses() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            binarize_threshold = 0.05
            processing_max_dimension = 512
            advice_target = "center"
            subject_policy = "largest_area"
            stream_min_interval_ms = 500

            [region_thresholds]
            min_width = 4
            min_height = 4
            min_pixel_count = 20

            [intensity]
            mode = "half_diagonal"
            "#,
        )
        .unwrap();
        assert_eq!(config.binarize_threshold, 0.05);
        assert_eq!(config.processing_max_dimension, 512);
        assert_eq!(config.advice_target, AdviceTarget::Center);
        assert_eq!(config.subject_policy, SubjectPolicy::LargestArea);
        assert_eq!(config.intensity, IntensityNormalization::HalfDiagonal);
        assert_eq!(config.stream_min_interval(), Duration::from_millis(500));
        assert_eq!(config.thresholds_for(1000, 1000).min_pixel_count, 20);
    }

    #[test]
    fn fixed_pixel_intensity_parses_with_reference() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [intensity]
            mode = "fixed_pixels"
            reference = 250.0
            "#,
        )
        .unwrap();
        assert_eq!(config.intensity, IntensityNormalization::FixedPixels { reference: 250.0 });
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("binarize_threshold = 2.0"),
            Err(AnalysisError::InvalidThreshold(_))
        ));
        assert!(AnalysisConfig::from_toml_str("processing_max_dimension = 0").is_err());
        assert!(AnalysisConfig::from_toml_str("advice_target = \"diagonal\"").is_err());
        assert!(
            AnalysisConfig::from_toml_str("[intensity]\nmode = \"fixed_pixels\"\nreference = 0.0")
                .is_err()
        );
    }

    #[test]
    fn thresholds_default_to_resolution_scaled() {
        let config = AnalysisConfig::default();
        assert_eq!(
            config.thresholds_for(300, 300),
            RegionThresholds::for_resolution(300, 300)
        );
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framing.toml");
        std::fs::write(&path, "binarize_threshold = 0.02\n").unwrap();
        assert_eq!(AnalysisConfig::load(&path).unwrap().binarize_threshold, 0.02);
        assert!(AnalysisConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
