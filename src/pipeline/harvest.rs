//! Identifier-only harvest pipeline.
//!
//! Takes a plain list of ARKs, asks the Pagination service how many views
//! each document has, and fetches every page image over the IIIF API. No
//! local annotations are involved; re-runs skip pages already on disk.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::ark::Ark;
use crate::config::Config;
use crate::context::RunContext;
use crate::geometry::validate_ratio;
use crate::iiif::{self, ReqwestGet, SizeToken};
use crate::logging::log;
use crate::view;

pub struct HarvestArgs {
    /// Text file with one ARK per line; blank lines are skipped.
    pub arks_file: PathBuf,
    /// Download size relative to the full scan (1.0 = maximum size).
    pub ratio: f64,
    /// Output root.
    pub output: PathBuf,
}

pub fn run(config: &Config, args: &HarvestArgs) -> Result<()> {
    let ratio = validate_ratio(args.ratio)?;
    let size = SizeToken::from_ratio(ratio).to_string();
    log(&format!("Using IIIF size: {}", size));

    let contents = std::fs::read_to_string(&args.arks_file)
        .with_context(|| format!("ARKs file {} not found", args.arks_file.display()))?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let error_log = args.output.join("iiif_errors.log");

    let http = ReqwestGet::new(config.http_timeout_secs)?;
    let mut ctx = RunContext::new();
    let mut arks = 0u64;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        arks += 1;
        let ark = Ark::parse(line);

        let n = iiif::page_count(&http, &config.pagination_url, &ark, &mut ctx);
        if n == 0 {
            continue;
        }
        log(&format!("Processing ARK: {} with {} images", ark, n));
        ctx.mark_seen(&ark);

        for view_number in 1..=n {
            let url = iiif::full_image_url(&config.iiif_base_url, &ark, view_number, &size);
            let dest = args
                .output
                .join(ark.bare())
                .join(view::page_filename(&ark, view_number, "jpg"));
            iiif::fetch_image(&http, &url, &dest, Some(&error_log), &mut ctx);
        }
    }

    log(&format!("ARKs processed: {}", arks));
    ctx.log_summary();
    Ok(())
}
