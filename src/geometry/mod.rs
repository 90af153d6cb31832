//! Crop geometry for Level 0 tile sets.
//!
//! - [`CropSpec`]: a region plus output size, rendered as `{region}/{size}`
//! - [`planner`]: scale factors, preview widths and the tile grid for an image

mod crop;
pub mod planner;

pub use crop::{CropSpec, Region, Size};
pub use planner::{
    default_tile_grid, downsize_crops, downsize_levels, full_size_crop, scaling_factors,
    BASE_SCALING_FACTORS, BASE_SMALLER_SIZES,
};
