//! The title-to-ARK reference table.
//!
//! Loaded once at startup from a `#`-delimited file, one document per row:
//! `<title>#<full-ark>`. Lookup is exact-match on the normalized title key;
//! a miss is terminal for that image and is recorded in an append-only
//! error log.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::ark::{title_key, Ark};
use crate::logging::log;

/// Immutable, process-lifetime mapping from title key to ARK.
pub struct ArkTable {
    entries: HashMap<String, Ark>,
}

impl ArkTable {
    /// Loads the reference table. A missing file is fatal; malformed rows
    /// (fewer than two fields, or an empty field) are skipped with a warning.
    pub fn load(path: &Path) -> Result<ArkTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'#')
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open ARK database: {}", path.display()))?;

        let mut entries = HashMap::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Failed to read row {} of {}", idx + 1, path.display())
            })?;
            let (title, ark) = match (record.get(0), record.get(1)) {
                (Some(t), Some(a)) if !t.is_empty() && !a.is_empty() => (t, a),
                _ => {
                    log(&format!(
                        "Skipping malformed row {} in {}",
                        idx + 1,
                        path.display()
                    ));
                    continue;
                }
            };
            entries.insert(title_key(title), Ark::parse(ark));
        }

        log(&format!("Loaded {} ARK entries from {}", entries.len(), path.display()));
        Ok(ArkTable { entries })
    }

    /// Resolves a raw title or filename to its ARK. Normalizes the input to
    /// a title key and looks it up; None means no entry exists.
    pub fn resolve(&self, title: &str) -> Option<&Ark> {
        self.entries.get(&title_key(title))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Records a title with no ARK in the error log, one line per failure.
/// Duplicates are allowed; line order follows processing order.
pub fn append_missing_title(errors_file: &Path, title: &str) -> Result<()> {
    if let Some(parent) = errors_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(errors_file)
        .with_context(|| format!("Failed to open error log: {}", errors_file.display()))?;
    writeln!(file, "{}", title)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_table(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("arks_database.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_and_resolve() {
        let dir = tempdir().unwrap();
        let path = write_table(
            dir.path(),
            "Heures Royales#ark:/12148/btv1b1234\nCes presentes Heures#ark:/12148/bpt6k858005x\n",
        );

        let table = ArkTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);

        // Lookup goes through the same normalization as the table keys
        let ark = table.resolve("Heures Royales_view_1").unwrap();
        assert_eq!(ark.full(), "ark:/12148/btv1b1234");
    }

    #[test]
    fn test_resolve_miss() {
        let dir = tempdir().unwrap();
        let path = write_table(dir.path(), "Heures Royales#ark:/12148/btv1b1234\n");
        let table = ArkTable::load(&path).unwrap();
        assert!(table.resolve("Unknown Title").is_none());
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let dir = tempdir().unwrap();
        let path = write_table(
            dir.path(),
            "Heures Royales#ark:/12148/btv1b1234\nno_delimiter_row\n#ark:/12148/orphan\n",
        );
        let table = ArkTable::load(&path).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        assert!(ArkTable::load(&dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn test_append_missing_title() {
        let dir = tempdir().unwrap();
        let errors = dir.path().join("arks_errors.txt");
        append_missing_title(&errors, "Lost Title").unwrap();
        append_missing_title(&errors, "Lost Title").unwrap();

        let contents = std::fs::read_to_string(&errors).unwrap();
        assert_eq!(contents, "Lost Title\nLost Title\n");
    }
}
