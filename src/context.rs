//! Per-run accounting.
//!
//! The original scripts kept counters and the seen-ARK set in module-level
//! globals; here they travel in one context value handed to each pipeline
//! stage, so a stage's effect on the run totals is explicit.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

use crate::ark::Ark;
use crate::logging::log;

/// Mutable state shared across one batch run. Everything in here is
/// monotonic: counters only increment, the ARK set only grows.
#[derive(Debug, Default)]
pub struct RunContext {
    /// Deduplicated ARKs successfully resolved during the run.
    pub seen_arks: BTreeSet<Ark>,
    /// Images whose title had no entry in the reference table.
    pub arks_not_found: u64,
    /// Source image files referenced by annotations but absent on disk.
    pub images_not_found: u64,
    /// Images copied to the output tree (first annotation seen).
    pub images_with_annotations: u64,
    /// Filenames from which no view number could be extracted.
    pub views_not_found: u64,
    /// Successful IIIF image downloads.
    pub iiif_ok: u64,
    /// Failed IIIF requests (transport or non-success status).
    pub iiif_error: u64,
    /// Pagination queries that yielded no usable view count.
    pub pagination_not_found: u64,
    /// Images the detection model failed on (request or parse error).
    pub inference_errors: u64,
    /// Images in which the detection model found at least one object.
    pub images_inferred: u64,
    /// Total detections processed.
    pub objects_detected: u64,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully resolved ARK for end-of-run reporting.
    pub fn mark_seen(&mut self, ark: &Ark) {
        self.seen_arks.insert(ark.clone());
    }

    /// Writes the deduplicated ARK list, one bare identifier per line.
    /// Rewritten from scratch each run; the set ordering makes the output
    /// independent of processing order.
    pub fn write_processed_arks(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to write ARK list: {}", path.display()))?;
        for ark in &self.seen_arks {
            writer.write_record([ark.full().as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Logs the end-of-run summary. Every terminal-per-item failure class
    /// gets its own line so skipped work is accountable.
    pub fn log_summary(&self) {
        log("----------------------------------------");
        log(&format!("Processed ARKs: {}", self.seen_arks.len()));
        if self.arks_not_found > 0 {
            log(&format!("Titles with no ARK identified: {}", self.arks_not_found));
        }
        if self.images_not_found > 0 {
            log(&format!("Image files not found: {}", self.images_not_found));
        }
        if self.views_not_found > 0 {
            log(&format!("Filenames with no view number: {}", self.views_not_found));
        }
        if self.inference_errors > 0 {
            log(&format!("Images the model failed on: {}", self.inference_errors));
        }
        if self.pagination_not_found > 0 {
            log(&format!(
                "ARKs skipped for Pagination API errors: {}",
                self.pagination_not_found
            ));
        }
        log(&format!("IIIF images downloaded: {}", self.iiif_ok));
        if self.iiif_error > 0 {
            log(&format!("## Warning! IIIF errors: {} ##", self.iiif_error));
        }
        log("----------------------------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mark_seen_deduplicates() {
        let mut ctx = RunContext::new();
        ctx.mark_seen(&Ark::parse("btv1b1234"));
        ctx.mark_seen(&Ark::parse("ark:/12148/btv1b1234"));
        assert_eq!(ctx.seen_arks.len(), 1);
    }

    #[test]
    fn test_write_processed_arks_sorted_and_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed_arks_list.csv");

        let mut ctx = RunContext::new();
        ctx.mark_seen(&Ark::parse("btv1b9999"));
        ctx.mark_seen(&Ark::parse("bpt6k858005x"));
        ctx.write_processed_arks(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, "ark:/12148/bpt6k858005x\nark:/12148/btv1b9999\n");

        // A second run over the same input produces identical bytes
        ctx.write_processed_arks(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }
}
