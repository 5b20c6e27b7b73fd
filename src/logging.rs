//! Timestamped run logging.
//!
//! Every message goes to stdout; once a run has an output tree, messages are
//! also appended to `logs/gallica_extract.log` under it.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Points the file side of the logger at `<logs_dir>/gallica_extract.log`.
/// Messages logged before this call only reach stdout.
pub fn init(logs_dir: &Path) {
    let _ = LOG_FILE.set(logs_dir.join("gallica_extract.log"));
}

/// Logs a message to the console and, when initialized, to the log file.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    if let Some(path) = LOG_FILE.get() {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = file.write_all(line.as_bytes());
        }
    }
}
