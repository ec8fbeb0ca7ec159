// THEORY:
// The `ComponentExtractor` is the engine of the spatial grouping layer. It turns
// a binary saliency mask into a short list of discrete subject regions using
// plain 4-connected component labeling.
//
// Key architectural principles & algorithm steps:
// 1.  **Raster Scan Seeding**: The mask is scanned row-major. Every unvisited
//     foreground pixel seeds a new component, so components are discovered in
//     the order their top-most, left-most pixel appears. That order is kept in
//     the output; it is not a ranking by size or saliency.
// 2.  **Iterative Region Growing**: Each seed is flood-filled with an explicit
//     worklist instead of recursion. A mask that is one giant white blob would
//     otherwise recurse once per pixel.
// 3.  **Single Visit**: A flat `visited` grid, local to one call, guarantees
//     every foreground pixel is claimed by exactly one component. Components that
//     fail the size thresholds stay marked so they are never rescanned, and they
//     are dropped outright rather than merged into a neighbour.
// 4.  **Data Aggregation**: While filling, the extractor keeps running min/max
//     extents and coordinate sums, giving the bounding box and the center of mass
//     without a second pass.
// 5.  **Stateless Utility**: Nothing survives between calls. Running it twice on
//     the same mask yields the same regions in the same order.

use crate::core_modules::mask::BinaryMask;
use crate::core_modules::region::{Point, Rect, Region};
use serde::{Deserialize, Serialize};

/// Size gates a component must clear, strictly, to be reported as a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionThresholds {
    pub min_width: u32,
    pub min_height: u32,
    pub min_pixel_count: usize,
}

impl RegionThresholds {
    /// Thresholds that scale with the mask resolution.
    ///
    /// Specks are ignored in proportion to the frame: a component must span more
    /// than 1/50 of the short side on both axes and cover more than 1/16000 of the
    /// area, with floors of 2 px and 10 px for tiny masks.
    pub fn for_resolution(width: u32, height: u32) -> Self {
        let side = (width.min(height) / 50).max(2);
        let area = width as usize * height as usize;
        Self {
            min_width: side,
            min_height: side,
            min_pixel_count: (area / 16_000).max(10),
        }
    }

    fn accepts(&self, component: &Component) -> bool {
        component.width() > self.min_width
            && component.height() > self.min_height
            && component.pixel_count > self.min_pixel_count
    }
}

/// Running statistics for a component while it is being filled.
struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    sum_x: u64,
    sum_y: u64,
    pixel_count: usize,
}

impl Component {
    fn seeded_at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            sum_x: 0,
            sum_y: 0,
            pixel_count: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.sum_x += x as u64;
        self.sum_y += y as u64;
        self.pixel_count += 1;
    }

    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    fn into_region(self, id: u64) -> Region {
        let count = self.pixel_count as f64;
        Region {
            id,
            bounding_box: Rect::from_pixel_extents(self.min_x, self.min_y, self.max_x, self.max_y),
            centroid: Point::new(self.sum_x as f64 / count, self.sum_y as f64 / count),
            pixel_count: self.pixel_count,
        }
    }
}

pub mod component_extractor {
    use super::*;
    use tracing::trace;

    /// Labels every 4-connected foreground component of `mask` and returns the
    /// ones that clear `thresholds`, in raster-scan discovery order.
    pub fn extract(mask: &BinaryMask, thresholds: &RegionThresholds) -> Vec<Region> {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let mut visited = vec![false; width * height];
        let mut worklist: Vec<(u32, u32)> = Vec::new();
        let mut regions: Vec<Region> = Vec::new();
        let mut rejected = 0usize;

        for y in 0..mask.height() {
            for x in 0..mask.width() {
                let index = y as usize * width + x as usize;
                if visited[index] || !mask.is_foreground(x, y) {
                    continue;
                }

                let component = grow_component(mask, x, y, &mut visited, &mut worklist);
                if thresholds.accepts(&component) {
                    regions.push(component.into_region(regions.len() as u64));
                } else {
                    rejected += 1;
                }
            }
        }

        trace!(
            retained = regions.len(),
            rejected,
            width,
            height,
            "component extraction finished"
        );
        regions
    }

    /// Flood-fills the component containing the seed pixel, marking it visited.
    /// The worklist is reused between components to avoid reallocating.
    fn grow_component(
        mask: &BinaryMask,
        seed_x: u32,
        seed_y: u32,
        visited: &mut [bool],
        worklist: &mut Vec<(u32, u32)>,
    ) -> Component {
        let width = mask.width();
        let height = mask.height();
        let mut component = Component::seeded_at(seed_x, seed_y);

        worklist.clear();
        worklist.push((seed_x, seed_y));
        visited[seed_y as usize * width as usize + seed_x as usize] = true;

        while let Some((x, y)) = worklist.pop() {
            component.add(x, y);

            // Check all 4 direct neighbors (not diagonals).
            let neighbors = [
                (x.checked_add(1).filter(|&nx| nx < width), Some(y)),
                (x.checked_sub(1), Some(y)),
                (Some(x), y.checked_add(1).filter(|&ny| ny < height)),
                (Some(x), y.checked_sub(1)),
            ];
            for (nx, ny) in neighbors {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                let index = ny as usize * width as usize + nx as usize;
                if !visited[index] && mask.is_foreground(nx, ny) {
                    visited[index] = true;
                    worklist.push((nx, ny));
                }
            }
        }

        component
    }
}
