//! Crop specifications and their canonical IIIF encoding.
//!
//! A crop is the `{region}/{size}` part of an IIIF Image API request:
//!
//! ```text
//! {base}/{region}/{size}/{rotation}/{quality}.{format}
//!        ^^^^^^^^^^^^^^^
//! ```
//!
//! - region renders as `x,y,w,h` or the literal `full`
//! - size renders as `w,h` (either side may be empty) or the literal `full`
//!
//! All rendering goes through [`fmt::Display`] for [`Region`] and [`Size`], so
//! both the request URL and the on-disk path share one implementation.

use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Region
// =============================================================================

/// Source-image region of a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// The entire image
    Full,

    /// A pixel rectangle in full-resolution coordinates
    Rect { x: u32, y: u32, w: u32, h: u32 },
}

impl Region {
    /// Create a rectangular region.
    pub fn rect(x: u32, y: u32, w: u32, h: u32) -> Self {
        Region::Rect { x, y, w, h }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Full => f.write_str("full"),
            Region::Rect { x, y, w, h } => write!(f, "{},{},{},{}", x, y, w, h),
        }
    }
}

// =============================================================================
// Size
// =============================================================================

/// Output size of a crop.
///
/// A missing side is derived by the server from the region's aspect ratio.
/// With both sides missing the region is returned at full resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Size {
    /// Full resolution for the region.
    pub const FULL: Size = Size {
        width: None,
        height: None,
    };

    /// Fixed width, height derived by aspect ratio.
    pub fn width(width: u32) -> Self {
        Self {
            width: Some(width),
            height: None,
        }
    }

    /// Fixed height, width derived by aspect ratio.
    pub fn height(height: u32) -> Self {
        Self {
            width: None,
            height: Some(height),
        }
    }

    /// Exact output dimensions.
    pub fn exact(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn is_full(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full() {
            return f.write_str("full");
        }
        if let Some(w) = self.width {
            write!(f, "{}", w)?;
        }
        f.write_str(",")?;
        if let Some(h) = self.height {
            write!(f, "{}", h)?;
        }
        Ok(())
    }
}

// =============================================================================
// CropSpec
// =============================================================================

/// A region of the source image plus the size it should be rendered at.
///
/// # Example
///
/// ```
/// use iiif_level0::geometry::{CropSpec, Region, Size};
///
/// let crop = CropSpec::new(Region::rect(10, 40, 45, 60), Size::width(30));
/// assert_eq!(crop.to_string(), "10,40,45,60/30,");
/// assert_eq!(CropSpec::full().to_string(), "full/full");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropSpec {
    region: Region,
    size: Size,
}

impl CropSpec {
    pub fn new(region: Region, size: Size) -> Self {
        Self { region, size }
    }

    /// The unscaled whole-image variant (`full/full`).
    pub fn full() -> Self {
        Self::new(Region::Full, Size::FULL)
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Relative path of this crop: `{region}/{size}`.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.region.to_string()).join(self.size.to_string())
    }
}

impl fmt::Display for CropSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.size)
    }
}
