//! Tabular metadata catalogs.
//!
//! Two parallel outputs accumulate one row per detection: the general
//! catalog (`processed_data.csv`, comma-delimited) and the Panoptic import
//! catalog (`import_pano.csv`, semicolon-delimited, with Panoptic's
//! bracket-tagged column names). Rows are typed structs appended in
//! insertion order; flushing rewrites both files in full so a re-run over
//! unchanged input produces byte-identical catalogs.

use anyhow::{Context, Result};
use std::path::Path;

/// One row of the general catalog.
#[derive(Clone, Debug)]
pub struct CatalogRecord {
    pub ark: String,
    pub view: u32,
    pub image_filename: String,
    pub annotation_filename: String,
    pub category_name: String,
    pub gallica_url: String,
    pub iiif_url: String,
    pub confidence: f64,
}

/// One row of the Panoptic import catalog.
#[derive(Clone, Debug)]
pub struct PanoRecord {
    pub path: String,
    pub gallica_url: String,
    pub iiif_url: String,
    pub category_name: String,
    pub ark: String,
}

const CATALOG_COLUMNS: [&str; 8] = [
    "ARK",
    "Vue",
    "Image_filename",
    "Annotation_filename",
    "Category_name",
    "Gallica",
    "IIIF",
    "Confidence",
];

const PANO_COLUMNS: [&str; 5] = ["path", "Gallica[url]", "IIIF[url]", "Classe[tag]", "ARK[text]"];

/// In-memory accumulator for both catalogs.
#[derive(Debug, Default)]
pub struct Catalogs {
    records: Vec<CatalogRecord>,
    pano_records: Vec<PanoRecord>,
}

impl Catalogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: CatalogRecord) {
        self.records.push(record);
    }

    pub fn push_pano(&mut self, record: PanoRecord) {
        self.pano_records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serializes both catalogs under the given directory, overwriting any
    /// previous run's files. Column order is fixed.
    pub fn flush(&self, dir: &Path) -> Result<()> {
        self.flush_catalog(&dir.join("processed_data.csv"))?;
        self.flush_pano(&dir.join("import_pano.csv"))?;
        Ok(())
    }

    fn flush_catalog(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .from_path(path)
            .with_context(|| format!("Failed to create catalog: {}", path.display()))?;
        writer.write_record(CATALOG_COLUMNS)?;
        for r in &self.records {
            writer.write_record([
                r.ark.as_str(),
                &r.view.to_string(),
                &r.image_filename,
                &r.annotation_filename,
                &r.category_name,
                &r.gallica_url,
                &r.iiif_url,
                &r.confidence.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn flush_pano(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_path(path)
            .with_context(|| format!("Failed to create Panoptic import: {}", path.display()))?;
        writer.write_record(PANO_COLUMNS)?;
        for r in &self.pano_records {
            writer.write_record([
                r.path.as_str(),
                &r.gallica_url,
                &r.iiif_url,
                &r.category_name,
                &r.ark,
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
