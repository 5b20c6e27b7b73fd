//! Bounding-box geometry across the three coordinate spaces.
//!
//! Annotation Space (pixels of the possibly-downscaled annotation image),
//! Original Space (pixels of the full-resolution scan) and Percentage Space
//! (IIIF `pct:` regions, 0-100 of the Original dimensions).

use anyhow::{anyhow, Result};

/// An absolute-pixel rectangle, x/y at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Projects an Annotation Space box into Original Space.
    ///
    /// The ratio relates the annotation image to the full scan (1.0 = no
    /// rescale); dividing every field by it recovers scan pixels.
    pub fn to_original(&self, ratio: f64) -> BoundingBox {
        BoundingBox {
            x: self.x / ratio,
            y: self.y / ratio,
            width: self.width / ratio,
            height: self.height / ratio,
        }
    }
}

/// A rectangle expressed as percentages (0-100) of the full image
/// dimensions, rounded to 2 decimals. Formats as an IIIF region token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PercentRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl std::fmt::Display for PercentRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pct:{},{},{},{}",
            self.x, self.y, self.width, self.height
        )
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Maps an Original Space box to Percentage Space.
///
/// Pure function; x and width scale against the full width, y and height
/// against the full height. Out-of-range input is not rejected here: values
/// past the image edge yield percentages above 100 and the remote API call
/// fails as a request error downstream.
pub fn to_percent_region(bbox: &BoundingBox, full_width: f64, full_height: f64) -> PercentRegion {
    PercentRegion {
        x: round2(bbox.x / full_width * 100.0),
        y: round2(bbox.y / full_height * 100.0),
        width: round2(bbox.width / full_width * 100.0),
        height: round2(bbox.height / full_height * 100.0),
    }
}

/// Validates the scan/annotation resolution ratio given on the command line.
/// Out-of-range ratios are a configuration error and abort before any
/// processing.
pub fn validate_ratio(ratio: f64) -> Result<f64> {
    if ratio <= 0.0 || ratio > 1.0 {
        return Err(anyhow!("ratio must be between 0 and 1.0, got {}", ratio));
    }
    Ok(ratio)
}
