//! View-number extraction and output filename formatting.
//!
//! Two filename dialects coexist in the corpus:
//! - direct: `bpt6k858005x-0001.jpg` (the view trails the last `-`)
//! - embedded-token: `Ces_presentes_Heures_..._view_216_num_NP.jpg`
//!
//! Extraction returns the plain integer; zero-padding only happens when an
//! output filename is formatted.

use crate::ark::Ark;

/// Extracts the 1-based view number from a direct-dialect filename.
/// `bpt6k858005x-0001.jpg` yields 1. Returns None if the suffix after the
/// last `-` is not numeric.
pub fn extract_view_direct(file_name: &str) -> Option<u32> {
    let stem = file_name.rsplit('-').next()?;
    let digits = stem.split('.').next()?;
    digits.parse::<u32>().ok()
}

/// Extracts the 1-based view number from an embedded-token filename.
/// The number sits between the literal `view_` and the following `_`.
/// Returns None when the token is absent or the segment is not numeric.
pub fn extract_view_embedded(file_name: &str) -> Option<u32> {
    let after = file_name.split("view_").nth(1)?;
    let digits = after.split('_').next()?;
    digits.parse::<u32>().ok()
}

/// Splits a direct-dialect stem into its bare ARK and view number.
/// `bpt6k858005x-0001` yields `("bpt6k858005x", 1)`.
pub fn split_direct(stem: &str) -> Option<(&str, u32)> {
    let view = extract_view_direct(stem)?;
    let ark = &stem[..stem.rfind('-')?];
    Some((ark, view))
}

/// `<bare-ark>-<view:04>` stem used for per-page outputs.
pub fn page_basename(ark: &Ark, view: u32) -> String {
    format!("{}-{:04}", ark.bare(), view)
}

/// `<bare-ark>-<view:04>.<ext>` filename used for harvested page images.
pub fn page_filename(ark: &Ark, view: u32, ext: &str) -> String {
    format!("{}-{:04}.{}", ark.bare(), view, ext)
}

/// Output filename for one bounding-box crop: `<stem>-<category>_<id>.jpg`.
pub fn crop_filename(stem: &str, category: &str, bb_id: u64) -> String {
    format!("{}-{}_{}.jpg", stem, category, bb_id)
}

/// Cleans an annotation-tool export name down to its meaningful stem.
/// Roboflow exports mangle names like `Foo_view_216_num_NP_jpg.rf.<hash>.jpg`;
/// everything from `_jpg` onward is export noise. Falls back to stripping
/// the extension.
pub fn image_stem(file_name: &str) -> String {
    if let Some(pos) = file_name.find("_jpg") {
        return file_name[..pos].to_string();
    }
    match file_name.rfind('.') {
        Some(pos) => file_name[..pos].to_string(),
        None => file_name.to_string(),
    }
}
