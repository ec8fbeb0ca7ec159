// THEORY:
// The `mask` module is the bottom layer of the engine. It owns the two rasters
// that flow through the front half of the pipeline:
//
// 1.  **SaliencyMap**: the continuous heat values handed back by the external
//     saliency oracle, one `f32` in [0, 1] per pixel. It is re-oriented into the
//     upright frame of the photo before anything else looks at it.
// 2.  **BinaryMask**: the thresholded result, stored as a 3-channel black/white
//     visualization rather than a bit grid. Binarization is loose
//     (`value > threshold`) while the foreground test used by the extractor is
//     strict (every channel at or above `WHITE_CUTOFF`). Any grey produced by
//     resampling or lossy encoding of the visualization falls out as background.
//
// Both rasters are immutable once built and are owned by the single analysis
// call that created them.

use crate::error::{AnalysisError, Result};
use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum value every channel must reach for a mask pixel to count as foreground.
pub const WHITE_CUTOFF: u8 = 250;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

pub type SaliencyBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// The eight EXIF orientations a stored image can carry.
///
/// Each variant describes how the stored pixels must be transformed to appear
/// upright. `Up` needs no transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl Orientation {
    /// Maps an EXIF orientation tag (1..=8) onto a variant.
    pub fn from_exif(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(Self::Up),
            2 => Some(Self::UpMirrored),
            3 => Some(Self::Down),
            4 => Some(Self::DownMirrored),
            5 => Some(Self::LeftMirrored),
            6 => Some(Self::Right),
            7 => Some(Self::RightMirrored),
            8 => Some(Self::Left),
            _ => None,
        }
    }

    /// True when the upright image has its width and height swapped relative to storage.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::LeftMirrored | Self::Right | Self::RightMirrored | Self::Left
        )
    }

    /// Upright dimensions for a stored raster of `width` x `height`.
    pub fn upright_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Transforms a stored raster into its upright frame.
    pub fn apply<P>(self, buffer: &ImageBuffer<P, Vec<P::Subpixel>>) -> ImageBuffer<P, Vec<P::Subpixel>>
    where
        P: Pixel + 'static,
    {
        match self {
            Self::Up => buffer.clone(),
            Self::UpMirrored => imageops::flip_horizontal(buffer),
            Self::Down => imageops::rotate180(buffer),
            Self::DownMirrored => imageops::flip_vertical(buffer),
            Self::LeftMirrored => imageops::flip_horizontal(&imageops::rotate90(buffer)),
            Self::Right => imageops::rotate90(buffer),
            Self::RightMirrored => imageops::flip_horizontal(&imageops::rotate270(buffer)),
            Self::Left => imageops::rotate270(buffer),
        }
    }
}

/// Per-pixel saliency in [0, 1], row-major.
#[derive(Debug, Clone)]
pub struct SaliencyMap {
    buffer: SaliencyBuffer,
}

impl SaliencyMap {
    /// Wraps a row-major buffer of saliency values.
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::ZeroArea { width, height });
        }
        let expected = width as usize * height as usize;
        let actual = values.len();
        let buffer = ImageBuffer::from_raw(width, height, values)
            .ok_or(AnalysisError::BufferLength { expected, actual })?;
        Ok(Self { buffer })
    }

    /// Reads saliency from an 8-bit grayscale heatmap, mapping 0..=255 onto 0.0..=1.0.
    pub fn from_luma8(image: &GrayImage) -> Result<Self> {
        let values = image.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self::from_values(image.width(), image.height(), values)
    }

    /// Reads saliency from the alpha channel of an RGBA heatmap.
    pub fn from_alpha(image: &RgbaImage) -> Result<Self> {
        let values = image.pixels().map(|p| p.0[3] as f32 / 255.0).collect();
        Self::from_values(image.width(), image.height(), values)
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.buffer.get_pixel(x, y).0[0]
    }

    /// Returns the map transformed into the upright frame described by `orientation`.
    pub fn oriented(&self, orientation: Orientation) -> Self {
        Self {
            buffer: orientation.apply(&self.buffer),
        }
    }
}

/// A binarized saliency mask, kept as a black/white RGB visualization.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    image: RgbImage,
}

impl BinaryMask {
    /// Adopts an existing RGB raster, for example a mask read back from disk.
    pub fn from_rgb(image: RgbImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AnalysisError::ZeroArea {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(Self { image })
    }

    /// Builds a mask whose foreground is wherever `is_set(x, y)` holds.
    pub fn from_fn(width: u32, height: u32, is_set: impl Fn(u32, u32) -> bool) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(AnalysisError::ZeroArea { width, height });
        }
        let image = RgbImage::from_fn(width, height, |x, y| if is_set(x, y) { WHITE } else { BLACK });
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Strict foreground test: all three channels must reach `WHITE_CUTOFF`.
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        let Rgb([r, g, b]) = *self.image.get_pixel(x, y);
        r >= WHITE_CUTOFF && g >= WHITE_CUTOFF && b >= WHITE_CUTOFF
    }

    /// Number of pixels passing the strict foreground test.
    pub fn foreground_count(&self) -> usize {
        self.image
            .pixels()
            .filter(|p| p.0.iter().all(|&c| c >= WHITE_CUTOFF))
            .count()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Writes the visualization to disk; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        self.image.save(path)
    }
}

pub mod binarizer {
    use super::*;

    /// Thresholds a saliency map: a pixel becomes white when its value strictly
    /// exceeds `threshold`, black otherwise.
    ///
    /// A threshold that whitens or blackens the whole frame is not an error; the
    /// extractor copes with either extreme.
    pub fn binarize(map: &SaliencyMap, threshold: f32) -> Result<BinaryMask> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AnalysisError::InvalidThreshold(threshold));
        }
        BinaryMask::from_fn(map.width(), map.height(), |x, y| map.value(x, y) > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::binarizer::binarize;
    use super::*;

    fn gradient_map() -> SaliencyMap {
        // 4x1: 0.0, 0.01, 0.02, 1.0
        SaliencyMap::from_values(4, 1, vec![0.0, 0.01, 0.02, 1.0]).unwrap()
    }

    #[test]
    fn binarize_is_strictly_greater_than_threshold() {
        let mask = binarize(&gradient_map(), 0.01).unwrap();
        assert!(!mask.is_foreground(0, 0));
        assert!(!mask.is_foreground(1, 0));
        assert!(mask.is_foreground(2, 0));
        assert!(mask.is_foreground(3, 0));
        assert_eq!(mask.as_rgb().get_pixel(2, 0), &Rgb([255, 255, 255]));
        assert_eq!(mask.as_rgb().get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn extreme_thresholds_are_tolerated() {
        let all = binarize(&gradient_map(), 0.0).unwrap();
        assert_eq!(all.foreground_count(), 3);
        let none = binarize(&gradient_map(), 1.0).unwrap();
        assert_eq!(none.foreground_count(), 0);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(matches!(
            binarize(&gradient_map(), 1.5),
            Err(AnalysisError::InvalidThreshold(_))
        ));
        assert!(binarize(&gradient_map(), f32::NAN).is_err());
    }

    #[test]
    fn near_white_grey_is_not_foreground() {
        let mut image = RgbImage::new(3, 1);
        image.put_pixel(0, 0, Rgb([250, 250, 250]));
        image.put_pixel(1, 0, Rgb([249, 255, 255]));
        image.put_pixel(2, 0, Rgb([255, 255, 255]));
        let mask = BinaryMask::from_rgb(image).unwrap();
        assert!(mask.is_foreground(0, 0));
        assert!(!mask.is_foreground(1, 0));
        assert!(mask.is_foreground(2, 0));
        assert_eq!(mask.foreground_count(), 2);
    }

    #[test]
    fn zero_area_inputs_fail_fast() {
        assert!(matches!(
            SaliencyMap::from_values(0, 5, vec![]),
            Err(AnalysisError::ZeroArea { width: 0, height: 5 })
        ));
        assert!(BinaryMask::from_rgb(RgbImage::new(0, 0)).is_err());
    }

    #[test]
    fn short_saliency_buffer_is_rejected() {
        assert!(matches!(
            SaliencyMap::from_values(2, 2, vec![0.5; 3]),
            Err(AnalysisError::BufferLength { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn luma_and_alpha_heatmaps_normalize_to_unit_range() {
        let gray = GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        let map = SaliencyMap::from_luma8(&gray).unwrap();
        assert_eq!(map.value(0, 0), 0.0);
        assert_eq!(map.value(1, 0), 1.0);

        let rgba = RgbaImage::from_raw(1, 1, vec![0, 0, 0, 51]).unwrap();
        let map = SaliencyMap::from_alpha(&rgba).unwrap();
        assert!((map.value(0, 0) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn right_orientation_rotates_clockwise() {
        // Stored 3x2 with a hot pixel at the top-left corner.
        let mut values = vec![0.0; 6];
        values[0] = 1.0;
        let map = SaliencyMap::from_values(3, 2, values).unwrap();
        let upright = map.oriented(Orientation::Right);
        assert_eq!((upright.width(), upright.height()), (2, 3));
        // A clockwise quarter turn carries the top-left corner to the top-right.
        assert_eq!(upright.value(1, 0), 1.0);
        assert_eq!(upright.value(0, 0), 0.0);
    }

    #[test]
    fn mirrored_orientation_flips_horizontally() {
        let map = SaliencyMap::from_values(2, 1, vec![1.0, 0.0]).unwrap();
        let upright = map.oriented(Orientation::UpMirrored);
        assert_eq!(upright.value(0, 0), 0.0);
        assert_eq!(upright.value(1, 0), 1.0);
    }

    #[test]
    fn exif_tags_round_out_to_eight_variants() {
        let parsed: Vec<_> = (1..=8).filter_map(Orientation::from_exif).collect();
        assert_eq!(parsed.len(), 8);
        assert_eq!(Orientation::from_exif(0), None);
        assert_eq!(Orientation::from_exif(9), None);
        assert_eq!(Orientation::Right.upright_dimensions(30, 20), (20, 30));
        assert_eq!(Orientation::Down.upright_dimensions(30, 20), (30, 20));
    }

    #[test]
    fn mask_dump_reloads_as_the_same_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let mask = binarize(&gradient_map(), 0.01).unwrap();
        mask.save(&path).unwrap();

        let reloaded = BinaryMask::from_rgb(image::open(&path).unwrap().to_rgb8()).unwrap();
        assert_eq!(reloaded, mask);
    }
}
