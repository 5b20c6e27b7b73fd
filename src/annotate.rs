//! Bounding-box overlays and local thumbnail crops.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::ark::Ark;
use crate::geometry::BoundingBox;

/// Outline thickness of drawn boxes, in pixels.
const BOX_THICKNESS: u32 = 4;

/// Category colour used for overlays; unknown categories fall back to red.
pub fn color_for_category(category: &str) -> Rgba<u8> {
    match category {
        "Vignette" => Rgba([0x04, 0x92, 0xC2, 0xFF]),
        "Lettrine" => Rgba([0xFF, 0x69, 0xB4, 0xFF]),
        "Ornement" => Rgba([0x86, 0x01, 0xAF, 0xFF]),
        _ => Rgba([0xFF, 0x00, 0x00, 0xFF]),
    }
}

/// Clamps a float box to the pixel grid of an image of the given size.
fn pixel_rect(bbox: &BoundingBox, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x = (bbox.x.max(0.0) as u32).min(width.saturating_sub(1));
    let y = (bbox.y.max(0.0) as u32).min(height.saturating_sub(1));
    let w = (bbox.width.max(1.0) as u32).min(width - x);
    let h = (bbox.height.max(1.0) as u32).min(height - y);
    (x, y, w.max(1), h.max(1))
}

/// Draws a hollow rectangle for one detection on the working image, in the
/// category colour. Thickness comes from nesting hollow rects inward.
pub fn draw_bbox(img: &mut RgbaImage, bbox: &BoundingBox, category: &str) {
    let color = color_for_category(category);
    let (x, y, w, h) = pixel_rect(bbox, img.width(), img.height());
    for inset in 0..BOX_THICKNESS {
        if w <= 2 * inset || h <= 2 * inset {
            break;
        }
        let rect = Rect::at((x + inset) as i32, (y + inset) as i32)
            .of_size(w - 2 * inset, h - 2 * inset);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Crops one detection out of the source image and saves it under
/// `<thumbs>/<bare-ark>/<category>/<filename>`. Returns the saved path.
pub fn save_crop(
    source: &DynamicImage,
    bbox: &BoundingBox,
    thumbs_dir: &Path,
    ark: &Ark,
    category: &str,
    filename: &str,
) -> Result<PathBuf> {
    let category_dir = thumbs_dir.join(ark.bare()).join(category);
    std::fs::create_dir_all(&category_dir)
        .with_context(|| format!("Failed to create {}", category_dir.display()))?;

    let (x, y, w, h) = pixel_rect(bbox, source.width(), source.height());
    let thumbnail = source.crop_imm(x, y, w, h);

    let path = category_dir.join(filename);
    thumbnail
        .save(&path)
        .with_context(|| format!("Failed to save thumbnail: {}", path.display()))?;
    Ok(path)
}
