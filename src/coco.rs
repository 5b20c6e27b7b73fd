//! COCO-style annotation input.
//!
//! Only the subset the pipeline consumes is modeled: image entries, box
//! annotations and the category lookup table. Bounding boxes arrive as
//! `[x, y, width, height]` in absolute annotation-tool pixels.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::geometry::BoundingBox;

#[derive(Debug, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// [x, y, width, height], absolute pixels
    pub bbox: [f64; 4],
}

#[derive(Debug, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CocoDataset {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

impl CocoDataset {
    /// Loads and parses the annotation file. Missing or malformed input is
    /// a startup error.
    pub fn load(path: &Path) -> Result<CocoDataset> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("COCO JSON file {} not found", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse COCO JSON: {}", path.display()))
    }

    /// Image id to file name mapping.
    pub fn image_files(&self) -> HashMap<u64, &str> {
        self.images
            .iter()
            .map(|img| (img.id, img.file_name.as_str()))
            .collect()
    }

    /// Resolves a category id to its name; unknown ids map to "Unknown".
    pub fn category_name(&self, category_id: u32) -> &str {
        self.categories
            .iter()
            .find(|cat| cat.id == category_id)
            .map(|cat| cat.name.as_str())
            .unwrap_or("Unknown")
    }
}

impl CocoAnnotation {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.bbox[0], self.bbox[1], self.bbox[2], self.bbox[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "images": [{"id": 0, "file_name": "bpt6k858005x-0001.jpg", "width": 800, "height": 1200}],
        "annotations": [{"id": 7, "image_id": 0, "category_id": 2, "bbox": [10.0, 20.0, 30.0, 40.0], "area": 1200.0}],
        "categories": [{"id": 1, "name": "Vignette"}, {"id": 2, "name": "Lettrine"}]
    }"#;

    #[test]
    fn test_load_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_annotations.coco.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let coco = CocoDataset::load(&path).unwrap();
        assert_eq!(coco.images.len(), 1);
        assert_eq!(coco.annotations.len(), 1);
        assert_eq!(coco.image_files()[&0], "bpt6k858005x-0001.jpg");
    }

    #[test]
    fn test_category_name_lookup() {
        let coco: CocoDataset = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(coco.category_name(2), "Lettrine");
        assert_eq!(coco.category_name(99), "Unknown");
    }

    #[test]
    fn test_bounding_box() {
        let coco: CocoDataset = serde_json::from_str(SAMPLE).unwrap();
        let bbox = coco.annotations[0].bounding_box();
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.height, 40.0);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        assert!(CocoDataset::load(&dir.path().join("nope.json")).is_err());
    }
}
