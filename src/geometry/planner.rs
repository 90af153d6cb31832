//! Level 0 geometry planning.
//!
//! Pure functions that enumerate every crop a Level 0 client may request for an
//! image of a given size. Nothing here performs I/O.
//!
//! # Tile grid
//!
//! For each scale factor `sf`, a tile covers `tile_size * sf` source pixels and
//! is rendered `tile_size` pixels wide. Edges that do not divide evenly get one
//! remainder step, rendered proportionally narrower:
//!
//! ```text
//! width = 640, tile_size = 256, sf = 1
//!
//!   x:  0        256       512   640
//!       |--256---|--256----|-128-|
//! ```

use super::crop::{CropSpec, Region, Size};

/// Candidate scale factors, ascending.
pub const BASE_SCALING_FACTORS: [u32; 9] = [1, 2, 4, 8, 16, 32, 64, 128, 256];

/// Candidate widths for whole-image previews, ascending.
pub const BASE_SMALLER_SIZES: [u32; 10] = [16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 8192];

/// Scale factors that still produce at least one full tile along the shorter side.
///
/// Keeps each candidate `sf` with `sf <= min_dimension / tile_size`.
///
/// # Panics
///
/// Panics if `tile_size` is zero. Configuration validation rejects that earlier.
pub fn scaling_factors(min_dimension: u32, tile_size: u32) -> Vec<u32> {
    let limit = min_dimension / tile_size;
    BASE_SCALING_FACTORS
        .iter()
        .copied()
        .filter(|&sf| sf <= limit)
        .collect()
}

/// Preview widths strictly smaller than the image width.
pub fn downsize_levels(width: u32) -> Vec<u32> {
    BASE_SMALLER_SIZES
        .iter()
        .copied()
        .filter(|&s| s < width)
        .collect()
}

/// The single unscaled whole-image variant.
pub fn full_size_crop() -> CropSpec {
    CropSpec::full()
}

/// Whole-image previews, one per downsize level, width-constrained.
pub fn downsize_crops(width: u32) -> Vec<CropSpec> {
    downsize_levels(width)
        .into_iter()
        .map(|w| CropSpec::new(Region::Full, Size::width(w)))
        .collect()
}

/// One axis step: `(offset, length)` in source pixels.
type Step = (u32, u32);

/// Partition `[0, extent)` into steps of `crop_size` plus a trailing remainder.
fn axis_steps(extent: u32, crop_size: u32) -> Vec<Step> {
    let full = extent / crop_size;
    let remainder = extent % crop_size;

    let mut steps: Vec<Step> = (0..full).map(|i| (i * crop_size, crop_size)).collect();
    if remainder > 0 {
        steps.push((extent - remainder, remainder));
    }
    steps
}

/// Tiles for every applicable scale factor.
///
/// Order: scale factors ascending, then x-steps, then y-steps within each x-step.
/// Output width is `ceil(step_width / sf)`; height is left to the server.
pub fn default_tile_grid(width: u32, height: u32, tile_size: u32) -> Vec<CropSpec> {
    let mut crops = Vec::new();

    for sf in scaling_factors(width.min(height), tile_size) {
        let crop_size = tile_size * sf;
        let xs = axis_steps(width, crop_size);
        let ys = axis_steps(height, crop_size);

        for &(x, w) in &xs {
            let out_width = w.div_ceil(sf);
            for &(y, h) in &ys {
                crops.push(CropSpec::new(Region::rect(x, y, w, h), Size::width(out_width)));
            }
        }
    }

    crops
}
