// THEORY:
// The `CoordinateMapper` moves geometry between pixel spaces. Extraction runs
// on a reduced "processing resolution" to bound its cost, so every region it
// produces has to be projected back onto the original photo, and consumers may
// project the result again onto whatever surface they display it on.
//
// The mapping is a pure per-axis linear scale: x is multiplied by
// `to.width / from.width` and y by `to.height / from.height`. The two factors
// are independent; nothing assumes square pixels or that the source and
// destination share an aspect ratio.

use crate::core_modules::region::{Point, Rect, Region, Size};
use crate::error::{AnalysisError, Result};

/// Independent horizontal and vertical scale factors between two spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    /// Factors carrying coordinates from `from` into `to`. Fails when `from` has no extent.
    pub fn between(from: Size, to: Size) -> Result<Self> {
        if from.is_empty() || !from.width.is_finite() || !from.height.is_finite() {
            return Err(AnalysisError::InvalidScale {
                width: from.width,
                height: from.height,
            });
        }
        Ok(Self {
            x: to.width / from.width,
            y: to.height / from.height,
        })
    }
}

/// Geometry that can be carried from one pixel space into another.
pub trait Scalable: Sized {
    fn scaled_by(&self, factors: ScaleFactors) -> Self;

    fn scaled(&self, from: Size, to: Size) -> Result<Self> {
        Ok(self.scaled_by(ScaleFactors::between(from, to)?))
    }
}

impl Scalable for Point {
    fn scaled_by(&self, factors: ScaleFactors) -> Self {
        Point::new(self.x * factors.x, self.y * factors.y)
    }
}

impl Scalable for Size {
    fn scaled_by(&self, factors: ScaleFactors) -> Self {
        Size::new(self.width * factors.x, self.height * factors.y)
    }
}

impl Scalable for Rect {
    fn scaled_by(&self, factors: ScaleFactors) -> Self {
        Rect::new(
            self.x * factors.x,
            self.y * factors.y,
            self.width * factors.x,
            self.height * factors.y,
        )
    }
}

/// Scales the box and the centroid. `pixel_count` stays in extraction pixels.
impl Scalable for Region {
    fn scaled_by(&self, factors: ScaleFactors) -> Self {
        Region {
            id: self.id,
            bounding_box: self.bounding_box.scaled_by(factors),
            centroid: self.centroid.scaled_by(factors),
            pixel_count: self.pixel_count,
        }
    }
}

/// Scales every region in a list, preserving order.
pub fn scale_regions(regions: &[Region], from: Size, to: Size) -> Result<Vec<Region>> {
    let factors = ScaleFactors::between(from, to)?;
    Ok(regions.iter().map(|r| r.scaled_by(factors)).collect())
}

/// Dimensions of the processing raster for an image of `width` x `height`.
///
/// The longest side is capped at `max_dimension`, preserving the aspect ratio and
/// keeping both sides at least one pixel. Images already within the cap are
/// never upsampled.
pub fn processing_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension || max_dimension == 0 {
        return (width, height);
    }
    let ratio = max_dimension as f64 / longest as f64;
    let scale = |side: u32| ((side as f64 * ratio).round() as u32).clamp(1, max_dimension);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn axes_scale_independently() {
        let point = Point::new(100.0, 50.0);
        let scaled = point
            .scaled(Size::new(200.0, 100.0), Size::new(400.0, 1000.0))
            .unwrap();
        assert_eq!(scaled, Point::new(200.0, 500.0));
    }

    #[test]
    fn region_round_trip_restores_geometry() {
        let region = Region {
            id: 3,
            bounding_box: Rect::new(145.0, 145.0, 20.0, 20.0),
            centroid: Point::new(154.5, 154.5),
            pixel_count: 400,
        };
        let a = Size::new(300.0, 300.0);
        let b = Size::new(4032.0, 3024.0);
        let back = region.scaled(a, b).unwrap().scaled(b, a).unwrap();
        assert!(close(back.bounding_box.x, 145.0));
        assert!(close(back.bounding_box.height, 20.0));
        assert!(close(back.centroid.x, 154.5));
        assert!(close(back.centroid.y, 154.5));
        assert_eq!(back.pixel_count, 400);
        assert_eq!(back.id, 3);
    }

    #[test]
    fn zero_sized_source_is_rejected() {
        let err = Rect::default()
            .scaled(Size::new(0.0, 10.0), Size::new(10.0, 10.0))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidScale { .. }));
    }

    #[test]
    fn scale_regions_keeps_order() {
        let regions: Vec<Region> = (0..3)
            .map(|i| Region {
                id: i,
                bounding_box: Rect::new(i as f64, 0.0, 1.0, 1.0),
                centroid: Point::new(i as f64 + 0.5, 0.5),
                pixel_count: 1,
            })
            .collect();
        let scaled = scale_regions(&regions, Size::new(10.0, 10.0), Size::new(20.0, 30.0)).unwrap();
        let ids: Vec<u64> = scaled.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(scaled[2].centroid, Point::new(5.0, 1.5));
    }

    #[test]
    fn processing_dimensions_cap_the_longest_side() {
        assert_eq!(processing_dimensions(4032, 3024, 800), (800, 600));
        assert_eq!(processing_dimensions(3024, 4032, 800), (600, 800));
        assert_eq!(processing_dimensions(640, 480, 800), (640, 480));
        assert_eq!(processing_dimensions(10_000, 3, 800), (800, 1));
    }
}
