// THEORY:
// The saliency oracle is the one component the engine does not own. It is a
// black box (typically an ML model) that looks at a raster and says how
// visually dominant each pixel is. The engine only needs the contract below:
// it hands over the processing-resolution image exactly as stored, and gets
// back one value in [0, 1] per pixel of that same raster.
//
// Orientation is the engine's job, not the oracle's. A `SourceImage` carries
// the stored pixels plus the EXIF orientation needed to show them upright; the
// pipeline turns the oracle's answer upright before binarizing.

use crate::core_modules::mask::{Orientation, SaliencyMap};
use crate::core_modules::region::Size;
use crate::error::OracleError;
use image::RgbImage;

/// Produces a per-pixel saliency map for an image.
///
/// Implementations must return a map with the same dimensions as `image`.
/// They are shared across worker threads.
pub trait SaliencyOracle: Send + Sync {
    fn saliency(&self, image: &RgbImage) -> Result<SaliencyMap, OracleError>;
}

impl<F> SaliencyOracle for F
where
    F: Fn(&RgbImage) -> Result<SaliencyMap, OracleError> + Send + Sync,
{
    fn saliency(&self, image: &RgbImage) -> Result<SaliencyMap, OracleError> {
        self(image)
    }
}

/// A photo as stored, together with the transform that makes it upright.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub pixels: RgbImage,
    pub orientation: Orientation,
}

impl SourceImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self {
            pixels,
            orientation: Orientation::Up,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Dimensions of the photo once displayed upright.
    pub fn upright_size(&self) -> Size {
        let (width, height) = self
            .orientation
            .upright_dimensions(self.pixels.width(), self.pixels.height());
        Size::from_dimensions(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_oracles() {
        let oracle = |image: &RgbImage| {
            SaliencyMap::from_values(image.width(), image.height(), vec![0.5; (image.width() * image.height()) as usize])
                .map_err(|e| OracleError::model(e.to_string()))
        };
        let map = oracle.saliency(&RgbImage::new(4, 3)).unwrap();
        assert_eq!((map.width(), map.height()), (4, 3));
        assert_eq!(map.value(3, 2), 0.5);
    }

    #[test]
    fn quarter_turns_swap_the_upright_size() {
        let source = SourceImage::new(RgbImage::new(400, 300));
        assert_eq!(source.upright_size(), Size::new(400.0, 300.0));
        let turned = source.with_orientation(Orientation::Right);
        assert_eq!(turned.upright_size(), Size::new(300.0, 400.0));
    }
}
