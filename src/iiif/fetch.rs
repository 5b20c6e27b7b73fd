//! Idempotent image fetching.
//!
//! The destination file is checked before any request goes out, so a re-run
//! over a populated output tree issues no network traffic for work already
//! done. Failures are counted and optionally logged with the offending URL;
//! they never abort the batch.

use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::context::RunContext;
use crate::logging::log;

/// Blocking HTTP GET seam. The production implementation wraps reqwest;
/// tests substitute a recording fake.
pub trait HttpGet {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed transport with a fixed timeout and User-Agent.
pub struct ReqwestGet {
    client: reqwest::blocking::Client,
}

impl ReqwestGet {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpGet for ReqwestGet {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "gallica-extract")
            .send()
            .with_context(|| format!("Request failed: {}", url))?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} for {}", response.status(), url));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Result of one fetch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Image retrieved, decoded and persisted.
    Downloaded,
    /// Destination already on disk; no request was issued.
    AlreadyExists,
    /// Transport or decode failure; counted, batch continues.
    Failed,
}

/// Fetches one IIIF image to `dest`, creating the parent directory on
/// demand. The body is decoded as an image before saving so a truncated or
/// HTML error response never lands on disk as a .jpg.
pub fn fetch_image(
    http: &dyn HttpGet,
    url: &str,
    dest: &Path,
    error_log: Option<&Path>,
    ctx: &mut RunContext,
) -> FetchOutcome {
    if dest.exists() {
        log(&format!("IIIF image already exists: {}", dest.display()));
        return FetchOutcome::AlreadyExists;
    }

    if let Some(parent) = dest.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log(&format!("# Failed to create {}: {} #", parent.display(), e));
            ctx.iiif_error += 1;
            return FetchOutcome::Failed;
        }
    }

    log(&format!("Downloading image with the IIIF API: {}", url));
    match http.get_bytes(url).and_then(|bytes| {
        let img = image::load_from_memory(&bytes).context("Response is not a decodable image")?;
        img.save(dest).with_context(|| format!("Failed to save {}", dest.display()))?;
        Ok(())
    }) {
        Ok(()) => {
            log(&format!("IIIF image saved in: {}", dest.display()));
            ctx.iiif_ok += 1;
            FetchOutcome::Downloaded
        }
        Err(e) => {
            log(&format!("# Failed to download IIIF image: {} #", e));
            if let Some(path) = error_log {
                append_failing_url(path, url);
            }
            ctx.iiif_error += 1;
            FetchOutcome::Failed
        }
    }
}

/// Appends a failing URL to the IIIF error log, one per line.
fn append_failing_url(error_log: &Path, url: &str) {
    if let Some(parent) = error_log.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match OpenOptions::new().create(true).append(true).open(error_log) {
        Ok(mut file) => {
            let _ = writeln!(file, "{}", url);
        }
        Err(e) => log(&format!("# Could not open {}: {} #", error_log.display(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// Records every URL requested; serves a 1x1 PNG or an error.
    struct SpyHttp {
        calls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl SpyHttp {
        fn ok() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl HttpGet for SpyHttp {
        fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.borrow_mut().push(url.to_string());
            if self.fail {
                return Err(anyhow!("HTTP 503 for {}", url));
            }
            let img = image::RgbImage::new(1, 1);
            let mut bytes = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
            Ok(bytes)
        }
    }

    #[test]
    fn test_fetch_downloads_and_counts() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("bpt6k858005x/bpt6k858005x-0001.jpg");
        let http = SpyHttp::ok();
        let mut ctx = RunContext::new();

        let outcome = fetch_image(&http, "http://example/img", &dest, None, &mut ctx);
        assert_eq!(outcome, FetchOutcome::Downloaded);
        assert!(dest.exists());
        assert_eq!(ctx.iiif_ok, 1);
        assert_eq!(http.call_count(), 1);
    }

    #[test]
    fn test_fetch_skips_existing_without_request() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("already.jpg");
        std::fs::write(&dest, b"present").unwrap();
        let http = SpyHttp::ok();
        let mut ctx = RunContext::new();

        let outcome = fetch_image(&http, "http://example/img", &dest, None, &mut ctx);
        assert_eq!(outcome, FetchOutcome::AlreadyExists);
        // No request issued, no counter moved
        assert_eq!(http.call_count(), 0);
        assert_eq!(ctx.iiif_ok, 0);
        assert_eq!(ctx.iiif_error, 0);
        // File untouched
        assert_eq!(std::fs::read(&dest).unwrap(), b"present");
    }

    #[test]
    fn test_fetch_failure_counted_and_logged() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing.jpg");
        let error_log = dir.path().join("iiif_errors.log");
        let http = SpyHttp::failing();
        let mut ctx = RunContext::new();

        let outcome = fetch_image(&http, "http://example/bad", &dest, Some(&error_log), &mut ctx);
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(!dest.exists());
        assert_eq!(ctx.iiif_error, 1);
        let logged = std::fs::read_to_string(&error_log).unwrap();
        assert_eq!(logged, "http://example/bad\n");
    }

    #[test]
    fn test_undecodable_body_is_a_failure() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("bogus.jpg");

        struct HtmlHttp;
        impl HttpGet for HtmlHttp {
            fn get_bytes(&self, _url: &str) -> Result<Vec<u8>> {
                Ok(b"<html>not an image</html>".to_vec())
            }
        }

        let mut ctx = RunContext::new();
        let outcome = fetch_image(&HtmlHttp, "http://example/html", &dest, None, &mut ctx);
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(!dest.exists());
        assert_eq!(ctx.iiif_error, 1);
    }
}
