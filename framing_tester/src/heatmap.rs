//! Saliency oracles backed by files on disk instead of a model.

use anyhow::{Context, Result};
use framing_vision::{OracleError, SaliencyMap, SaliencyOracle};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};
use std::path::Path;

/// Serves a precomputed heatmap, resized to whatever raster it is asked about.
///
/// The heatmap must be stored in the same orientation as the photo it belongs to.
pub struct HeatmapOracle {
    heatmap: GrayImage,
}

impl HeatmapOracle {
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to open heatmap {}", path.display()))?;
        Ok(Self::from_image(image))
    }

    /// Uses the alpha channel when there is one, luminance otherwise.
    pub fn from_image(image: DynamicImage) -> Self {
        let heatmap = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                image::Luma([rgba.get_pixel(x, y).0[3]])
            })
        } else {
            image.to_luma8()
        };
        Self { heatmap }
    }
}

impl SaliencyOracle for HeatmapOracle {
    fn saliency(&self, image: &RgbImage) -> Result<SaliencyMap, OracleError> {
        let (width, height) = image.dimensions();
        let map = if self.heatmap.dimensions() == (width, height) {
            SaliencyMap::from_luma8(&self.heatmap)
        } else {
            SaliencyMap::from_luma8(&imageops::resize(
                &self.heatmap,
                width,
                height,
                FilterType::Triangle,
            ))
        };
        map.map_err(|e| OracleError::model(e.to_string()))
    }
}

/// Treats brightness as saliency. Stands in for a model when replaying frames
/// that are themselves heatmaps.
pub struct LuminanceOracle;

impl SaliencyOracle for LuminanceOracle {
    fn saliency(&self, image: &RgbImage) -> Result<SaliencyMap, OracleError> {
        let luma = DynamicImage::ImageRgb8(image.clone()).to_luma8();
        SaliencyMap::from_luma8(&luma).map_err(|e| OracleError::UnreadableImage(e.to_string()))
    }
}
