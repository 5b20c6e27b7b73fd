//! Per-page supervision-format detection logs.
//!
//! One JSON-array file per (ARK, view) under `SV/<bare-ark>/`, written as a
//! streaming append: the file opens with `[`, each detection adds one object
//! plus a trailing comma, and a single end-of-run pass swaps the final comma
//! for the closing bracket. An Open file is deliberately not valid JSON; the
//! finalize pass must run exactly once per batch.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::ark::Ark;
use crate::logging::log;
use crate::view;

/// One detection in supervision format. Coordinates are corner-based pixels
/// relative to the listed file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SvRecord {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub class_id: u32,
    pub confidence: f64,
    pub tracker_id: String,
    pub class_name: String,
    pub file: String,
    pub model: String,
    pub comment: String,
}

impl SvRecord {
    /// Standard per-record provenance note.
    pub fn comment_for(ark: &Ark, view: u32, ratio: f64) -> String {
        format!(
            "Supervision format for ARK: {}, vue: {:04}; x,y,w,h in pixels, relatively to the listed file ({} ratio with the original image)",
            ark.bare(),
            view,
            ratio
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SvState {
    Open,
    Finalized,
}

/// Streaming writer for the supervision files of one run.
///
/// Tracks every file it touched and its Open/Finalized state, so the
/// finalize pass can assert it visits each file exactly once.
pub struct SvWriter {
    sv_dir: PathBuf,
    states: HashMap<PathBuf, SvState>,
}

impl SvWriter {
    pub fn new(sv_dir: impl Into<PathBuf>) -> Self {
        Self {
            sv_dir: sv_dir.into(),
            states: HashMap::new(),
        }
    }

    fn page_path(&self, ark: &Ark, view: u32) -> PathBuf {
        self.sv_dir
            .join(ark.bare())
            .join(format!("{}.json", view::page_basename(ark, view)))
    }

    /// Appends one detection to the page file, creating it on first use.
    ///
    /// A file that already exists on disk but was not created by this run is
    /// stale Open state from an interrupted batch; it is reset rather than
    /// appended to, so one array never mixes two runs' data.
    pub fn append(&mut self, ark: &Ark, view: u32, record: &SvRecord) -> Result<()> {
        let path = self.page_path(ark, view);

        match self.states.get(&path) {
            None => {
                if path.exists() {
                    log(&format!(
                        "Resetting stale supervision file from a previous run: {}",
                        path.display()
                    ));
                    std::fs::remove_file(&path).with_context(|| {
                        format!("Failed to reset stale file: {}", path.display())
                    })?;
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut file = std::fs::File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                file.write_all(b"[\n")?;
                self.states.insert(path.clone(), SvState::Open);
            }
            Some(SvState::Open) => {}
            Some(SvState::Finalized) => {
                bail!(
                    "Supervision file already finalized, cannot append: {}",
                    path.display()
                );
            }
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let json = serde_json::to_string(record)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b",\n")?;
        Ok(())
    }

    /// Number of files opened during this run.
    pub fn open_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == SvState::Open)
            .count()
    }

    /// Walks the supervision tree and closes every file opened by this run,
    /// replacing the trailing separator with the closing bracket in process.
    ///
    /// Errors if any of this run's files was already finalized (the pass ran
    /// twice). Valid files from earlier completed runs are left untouched.
    pub fn finalize_all(&mut self) -> Result<usize> {
        let mut finalized = 0;
        for entry in WalkDir::new(&self.sv_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.states.get(path) {
                Some(SvState::Open) => {
                    finalize_file(path)?;
                    self.states.insert(path.to_path_buf(), SvState::Finalized);
                    finalized += 1;
                }
                Some(SvState::Finalized) => {
                    bail!(
                        "Finalize pass ran twice on {}; supervision files must be closed exactly once per run",
                        path.display()
                    );
                }
                // Not ours: a finalized file from a previous completed run
                None => {}
            }
        }
        Ok(finalized)
    }
}

/// Replaces the trailing `,` of an Open supervision file with `]`.
/// Fails loudly on a file that is already valid JSON, rather than silently
/// corrupting it.
fn finalize_file(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let trimmed = contents.trim_end();
    if trimmed.ends_with(']') {
        return Err(anyhow!("Already finalized: {}", path.display()));
    }
    let body = trimmed
        .strip_suffix(',')
        .ok_or_else(|| anyhow!("Malformed supervision file (no trailing separator): {}", path.display()))?;
    std::fs::write(path, format!("{}\n]\n", body))
        .with_context(|| format!("Failed to rewrite {}", path.display()))?;
    Ok(())
}
