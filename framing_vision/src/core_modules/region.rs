// THEORY:
// The `region` module holds the spatial vocabulary of the engine. A `Region` is
// what the component extractor produces for every connected patch of salient
// pixels it keeps: the box that encloses it, its center of mass and its area.
//
// Key architectural principles:
// 1.  **Stateless Data Container**: A `Region` is created once, by a single
//     extraction call, and is never mutated afterwards. Rescaling produces a new
//     value rather than editing the old one.
// 2.  **Sub-pixel Geometry**: Everything downstream of the extractor lives in
//     floating point. Centroids are averages and rarely land on a pixel center,
//     and regions are routinely rescaled between the processing resolution and
//     the original image, so integer geometry would lose information.
// 3.  **Axis Independence**: `Size` carries width and height separately and
//     nothing here assumes square pixels or a shared aspect ratio.

use serde::{Deserialize, Serialize};

/// A position in some pixel space, with sub-pixel precision.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The extent of a pixel space. Width and height scale independently.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// True when either axis has no extent.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Half the length of the diagonal; the distance from the center to a corner.
    pub fn half_diagonal(&self) -> f64 {
        ((self.width / 2.0).powi(2) + (self.height / 2.0).powi(2)).sqrt()
    }
}

/// An axis-aligned rectangle given by its top-left corner and its extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the rectangle covering the inclusive pixel range `min..=max` on both axes.
    pub fn from_pixel_extents(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self::new(
            min_x as f64,
            min_y as f64,
            (max_x - min_x + 1) as f64,
            (max_y - min_y + 1) as f64,
        )
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A single connected patch of salient pixels, as found by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Position of this region in discovery order for the current frame only. Not persistent.
    pub id: u64,
    /// The rectangle enclosing every pixel of the region.
    pub bounding_box: Rect,
    /// The center of mass of the region's pixels. This is not the center of the bounding box.
    pub centroid: Point,
    /// The number of mask pixels that make up the region, measured at extraction resolution.
    pub pixel_count: usize,
}
