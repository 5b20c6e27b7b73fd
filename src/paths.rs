//! Output directory layout.
//!
//! Everything the annotation pipeline produces lands under one `output/`
//! root: annotated page images at the top level, local crops in `thumbs/`,
//! remote-fetched crops in `IIIF_thumbs/`, per-page supervision files in
//! `SV/`, plus the error logs and catalogs.

use std::path::{Path, PathBuf};

/// The output tree for one run. All accessors are pure path joins; only
/// `ensure` touches the filesystem.
#[derive(Clone, Debug)]
pub struct OutputTree {
    root: PathBuf,
}

impl OutputTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local bounding-box crops: `<root>/thumbs/`
    pub fn thumbs_dir(&self) -> PathBuf {
        self.root.join("thumbs")
    }

    /// Remote-fetched full-resolution crops: `<root>/IIIF_thumbs/`
    pub fn iiif_thumbs_dir(&self) -> PathBuf {
        self.root.join("IIIF_thumbs")
    }

    /// Per-page supervision JSON files: `<root>/SV/`
    pub fn sv_dir(&self) -> PathBuf {
        self.root.join("SV")
    }

    /// Run log directory: `<root>/logs/`
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Titles with no ARK in the reference table, one per line.
    pub fn ark_errors_file(&self) -> PathBuf {
        self.root.join("arks_errors.txt")
    }

    /// Failing IIIF URLs, one per line.
    pub fn iiif_errors_file(&self) -> PathBuf {
        self.root.join("iiif_errors.log")
    }

    /// Deduplicated list of ARKs seen during the run.
    pub fn processed_arks_file(&self) -> PathBuf {
        self.root.join("processed_arks_list.csv")
    }

    /// Creates the root and its fixed subdirectories. Idempotent.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.thumbs_dir())?;
        std::fs::create_dir_all(self.iiif_thumbs_dir())?;
        std::fs::create_dir_all(self.sv_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_creates_tree() {
        let dir = tempdir().unwrap();
        let tree = OutputTree::new(dir.path().join("output"));
        tree.ensure().unwrap();
        assert!(tree.thumbs_dir().is_dir());
        assert!(tree.iiif_thumbs_dir().is_dir());
        assert!(tree.sv_dir().is_dir());
        assert!(tree.logs_dir().is_dir());
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let tree = OutputTree::new(dir.path().join("output"));
        tree.ensure().unwrap();
        tree.ensure().unwrap();
        assert!(tree.root().is_dir());
    }
}
