// THEORY:
// The `pipeline` module is the top-level synchronous API of the engine. It
// strings the leaf modules together into one call:
//
//   stored image -> downsample -> oracle -> orient -> binarize -> extract
//                -> scale to original -> score -> advise
//
// Extraction runs at the "processing resolution" (longest side capped by the
// config) so its cost is bounded no matter how large the photo is. Everything
// handed back to the caller is in upright, original-image pixel coordinates.
//
// Malformed input is rejected before the pixel loops start. An image in which
// nothing stands out is not an error: the result simply carries no regions, no
// score and no advice.
//
// The pipeline holds no per-frame state, so a single instance can be shared
// across threads and called concurrently.

use crate::config::AnalysisConfig;
use crate::core_modules::advice::{Advice, AdviceGenerator};
use crate::core_modules::component_extractor::component_extractor;
use crate::core_modules::composition::{CompositionScore, composition_scorer};
use crate::core_modules::coordinate_mapper::{
    ScaleFactors, Scalable, processing_dimensions, scale_regions,
};
use crate::core_modules::mask::{BinaryMask, binarizer};
use crate::core_modules::region::{Region, Size};
use crate::error::{AnalysisError, Result};
use crate::oracle::{SaliencyOracle, SourceImage};
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// The outcome of analyzing one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Space every coordinate in this result lives in.
    pub image_size: Size,
    /// Upright size of the raster regions were extracted from.
    pub processing_size: Size,
    /// Retained regions in raster-scan discovery order.
    pub regions: Vec<Region>,
    pub score: Option<CompositionScore>,
    pub advice: Vec<Advice>,
}

impl AnalysisResult {
    pub fn is_subject_detected(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Projects regions and advice points onto another surface, such as a
    /// preview of a different size. Scores and intensities are unchanged.
    pub fn mapped_to(&self, display_size: Size) -> Result<AnalysisResult> {
        let factors = ScaleFactors::between(self.image_size, display_size)?;
        Ok(AnalysisResult {
            image_size: display_size,
            processing_size: self.processing_size,
            regions: self.regions.iter().map(|r| r.scaled_by(factors)).collect(),
            score: self.score.clone(),
            advice: self.advice.iter().map(|a| a.scaled_by(factors)).collect(),
        })
    }
}

/// An analysis result together with the mask it was extracted from.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub result: AnalysisResult,
    /// Upright mask at processing resolution.
    pub mask: BinaryMask,
}

/// The main, top-level struct for the composition engine.
pub struct CompositionPipeline {
    config: AnalysisConfig,
    oracle: Arc<dyn SaliencyOracle>,
    advisor: AdviceGenerator,
}

impl CompositionPipeline {
    pub fn new(config: AnalysisConfig, oracle: Arc<dyn SaliencyOracle>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            advisor: AdviceGenerator::new(config.intensity),
            config,
            oracle,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze_frame(&self, source: &SourceImage) -> Result<AnalysisResult> {
        self.analyze_frame_with_mask(source).map(|analysis| analysis.result)
    }

    /// Runs the full pipeline and also returns the binary mask.
    pub fn analyze_frame_with_mask(&self, source: &SourceImage) -> Result<FrameAnalysis> {
        let (width, height) = source.pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(AnalysisError::ZeroArea { width, height });
        }

        // Stage 1: Processing Resolution
        let (proc_width, proc_height) =
            processing_dimensions(width, height, self.config.processing_max_dimension);
        let processing = if (proc_width, proc_height) == (width, height) {
            Cow::Borrowed(&source.pixels)
        } else {
            Cow::Owned(imageops::resize(
                &source.pixels,
                proc_width,
                proc_height,
                FilterType::Triangle,
            ))
        };
        debug!(width, height, proc_width, proc_height, "prepared processing image");

        // Stage 2: Saliency
        let map = self.oracle.saliency(&processing)?;
        if (map.width(), map.height()) != (proc_width, proc_height) {
            return Err(AnalysisError::DimensionMismatch {
                expected_width: proc_width,
                expected_height: proc_height,
                actual_width: map.width(),
                actual_height: map.height(),
            });
        }
        let map = map.oriented(source.orientation);

        // Stage 3: Binarize and Extract
        let mask = binarizer::binarize(&map, self.config.binarize_threshold)?;
        let thresholds = self.config.thresholds_for(mask.width(), mask.height());
        let raw_regions = component_extractor::extract(&mask, &thresholds);
        debug!(
            foreground = mask.foreground_count(),
            regions = raw_regions.len(),
            ?thresholds,
            "extracted regions"
        );

        // Stage 4: Back to the Original Photo
        let processing_size = Size::from_dimensions(mask.width(), mask.height());
        let image_size = source.upright_size();
        let regions = scale_regions(&raw_regions, processing_size, image_size)?;

        // Stage 5: Score and Advise
        let score =
            composition_scorer::score_subjects(&regions, image_size, self.config.subject_policy)?;
        let advice = self.advisor.advise_subjects(
            &regions,
            self.config.subject_policy,
            self.config.advice_target,
            image_size,
        )?;

        info!(
            regions = regions.len(),
            overall_score = score.as_ref().map(|s| s.overall_score),
            best_rule = score.as_ref().map(|s| s.best_rule.label()),
            advice = advice.len(),
            "analysis complete"
        );

        Ok(FrameAnalysis {
            result: AnalysisResult {
                image_size,
                processing_size,
                regions,
                score,
                advice,
            },
            mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::composition::CompositionRule;
    use crate::core_modules::mask::{Orientation, SaliencyMap};
    use crate::core_modules::region::{Point, Rect};
    use crate::error::OracleError;
    use image::{Rgb, RgbImage};

    /// Treats pure red pixels as fully salient.
    fn red_oracle() -> Arc<dyn SaliencyOracle> {
        Arc::new(|image: &RgbImage| {
            let values = image
                .pixels()
                .map(|p| if p.0[0] > 200 && p.0[1] < 50 { 1.0 } else { 0.0 })
                .collect();
            SaliencyMap::from_values(image.width(), image.height(), values)
                .map_err(|e| OracleError::model(e.to_string()))
        })
    }

    fn photo(width: u32, height: u32, squares: &[(u32, u32, u32)]) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let inside = squares
                .iter()
                .any(|&(x0, y0, side)| x >= x0 && x < x0 + side && y >= y0 && y < y0 + side);
            if inside { Rgb([255, 0, 0]) } else { Rgb([20, 20, 20]) }
        })
    }

    fn pipeline(config: AnalysisConfig) -> CompositionPipeline {
        CompositionPipeline::new(config, red_oracle()).unwrap()
    }

    #[test]
    fn single_square_is_found_and_scored() {
        let source = SourceImage::new(photo(300, 300, &[(145, 145, 20)]));
        let result = pipeline(AnalysisConfig::default()).analyze_frame(&source).unwrap();

        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.regions[0].bounding_box, Rect::new(145.0, 145.0, 20.0, 20.0));
        assert_eq!(result.regions[0].centroid, Point::new(154.5, 154.5));
        let score = result.score.unwrap();
        assert_eq!(score.best_rule, CompositionRule::Center);
        assert_eq!(result.advice.len(), 1);
    }

    #[test]
    fn large_photos_are_processed_at_reduced_resolution() {
        let source = SourceImage::new(photo(1600, 1200, &[(400, 400, 200)]));
        let analysis = pipeline(AnalysisConfig::default())
            .analyze_frame_with_mask(&source)
            .unwrap();

        assert_eq!((analysis.mask.width(), analysis.mask.height()), (800, 600));
        assert_eq!(analysis.result.processing_size, Size::new(800.0, 600.0));
        assert_eq!(analysis.result.image_size, Size::new(1600.0, 1200.0));
        let region = &analysis.result.regions[0];
        assert!((region.centroid.x - 500.0).abs() < 4.0);
        assert!((region.centroid.y - 500.0).abs() < 4.0);
    }

    #[test]
    fn rotated_sources_report_upright_geometry() {
        // Stored landscape, displayed portrait after a clockwise quarter turn.
        let source = SourceImage::new(photo(400, 300, &[(0, 0, 40)]))
            .with_orientation(Orientation::Right);
        let analysis = pipeline(AnalysisConfig::default())
            .analyze_frame_with_mask(&source)
            .unwrap();

        assert_eq!(analysis.result.image_size, Size::new(300.0, 400.0));
        assert_eq!((analysis.mask.width(), analysis.mask.height()), (300, 400));
        // The stored top-left corner is the upright top-right corner.
        assert_eq!(analysis.result.regions[0].bounding_box, Rect::new(260.0, 0.0, 40.0, 40.0));
    }

    #[test]
    fn nothing_salient_is_not_an_error() {
        let source = SourceImage::new(photo(300, 300, &[]));
        let result = pipeline(AnalysisConfig::default()).analyze_frame(&source).unwrap();
        assert!(!result.is_subject_detected());
        assert!(result.score.is_none());
        assert!(result.advice.is_empty());
    }

    #[test]
    fn zero_area_is_rejected_before_the_oracle_runs() {
        let oracle: Arc<dyn SaliencyOracle> =
            Arc::new(|_: &RgbImage| -> std::result::Result<SaliencyMap, OracleError> {
                panic!("oracle must not be called")
            });
        let pipeline = CompositionPipeline::new(AnalysisConfig::default(), oracle).unwrap();
        let err = pipeline
            .analyze_frame(&SourceImage::new(RgbImage::new(0, 10)))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ZeroArea { width: 0, height: 10 }));
    }

    #[test]
    fn mismatched_saliency_dimensions_fail_fast() {
        let oracle: Arc<dyn SaliencyOracle> = Arc::new(|_: &RgbImage| {
            SaliencyMap::from_values(10, 10, vec![1.0; 100]).map_err(|e| OracleError::model(e.to_string()))
        });
        let pipeline = CompositionPipeline::new(AnalysisConfig::default(), oracle).unwrap();
        let err = pipeline
            .analyze_frame(&SourceImage::new(RgbImage::new(300, 200)))
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DimensionMismatch {
                expected_width: 300,
                expected_height: 200,
                actual_width: 10,
                actual_height: 10,
            }
        ));
    }

    #[test]
    fn oracle_failures_surface_as_typed_errors() {
        let oracle: Arc<dyn SaliencyOracle> =
            Arc::new(|_: &RgbImage| -> std::result::Result<SaliencyMap, OracleError> {
                Err(OracleError::model("model offline"))
            });
        let pipeline = CompositionPipeline::new(AnalysisConfig::default(), oracle).unwrap();
        let err = pipeline
            .analyze_frame(&SourceImage::new(RgbImage::new(30, 30)))
            .unwrap_err();
        assert!(err.is_oracle_failure());
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = AnalysisConfig {
            binarize_threshold: -0.5,
            ..AnalysisConfig::default()
        };
        assert!(CompositionPipeline::new(config, red_oracle()).is_err());
    }

    #[test]
    fn results_map_onto_display_space() {
        let source = SourceImage::new(photo(300, 300, &[(145, 145, 20)]));
        let result = pipeline(AnalysisConfig::default()).analyze_frame(&source).unwrap();
        let shown = result.mapped_to(Size::new(600.0, 150.0)).unwrap();

        assert_eq!(shown.image_size, Size::new(600.0, 150.0));
        assert_eq!(shown.regions[0].centroid, Point::new(309.0, 77.25));
        assert_eq!(shown.regions[0].pixel_count, result.regions[0].pixel_count);
        assert_eq!(shown.advice[0].target_point, Some(Point::new(300.0, 75.0)));
        assert_eq!(shown.score, result.score);
    }

    #[test]
    fn results_serialize_with_snake_case_tags() {
        let source = SourceImage::new(photo(300, 300, &[(145, 145, 20)]));
        let result = pipeline(AnalysisConfig::default()).analyze_frame(&source).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["regions"][0]["pixel_count"], 400);
        assert_eq!(json["score"]["best_rule"], "center");
        assert_eq!(json["advice"][0]["kind"], "move_to_center");
        assert_eq!(json["advice"][0]["direction"], "up_left");

        let back: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.regions, result.regions);
    }
}
