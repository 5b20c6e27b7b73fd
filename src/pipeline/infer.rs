//! Remote-detection pipeline.
//!
//! Runs the detection model over a folder of page images (organised in
//! subfolders named after their bare ARK) and produces the same catalog,
//! supervision and IIIF-crop outputs as the annotation pipeline. The model
//! itself is behind the `Detector` seam; this module owns everything that
//! happens around it.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::annotate;
use crate::ark::Ark;
use crate::catalog::{CatalogRecord, Catalogs, PanoRecord};
use crate::config::Config;
use crate::context::RunContext;
use crate::detect::Detector;
use crate::geometry::to_percent_region;
use crate::iiif::{self, ReqwestGet};
use crate::logging::{self, log};
use crate::paths::OutputTree;
use crate::supervision::{SvRecord, SvWriter};
use crate::view;

pub struct InferArgs {
    /// Folder (or folder of folders) of images; each subfolder is named
    /// after the bare ARK of the document it holds.
    pub images_dir: PathBuf,
    /// Model name, recorded in all outputs.
    pub model: String,
    /// Save a copy of each image with its detections drawn on.
    pub save_annotated: bool,
    /// Fetch full-resolution crops over the IIIF API.
    pub download_iiif: bool,
    /// Output root.
    pub output: PathBuf,
}

/// Image extensions accepted by the scan.
fn is_image_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png")
}

pub fn run(config: &Config, args: &InferArgs, detector: &dyn Detector) -> Result<()> {
    if !args.images_dir.is_dir() {
        return Err(anyhow!(
            "You must provide a folder of images: {}",
            args.images_dir.display()
        ));
    }

    // Sorted scan so outputs are independent of filesystem order
    let mut data_files: Vec<PathBuf> = WalkDir::new(&args.images_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(is_image_file))
        .map(|e| e.into_path())
        .collect();
    data_files.sort();

    log(&format!("{} file(s) found in {}", data_files.len(), args.images_dir.display()));
    if data_files.is_empty() {
        return Ok(());
    }

    let out = OutputTree::new(&args.output);
    out.ensure().context("Failed to create output tree")?;
    logging::init(&out.logs_dir());
    log(&format!("Inferring with model: {}", args.model));

    let http: Option<ReqwestGet> = if args.download_iiif {
        Some(ReqwestGet::new(config.http_timeout_secs)?)
    } else {
        None
    };

    let mut ctx = RunContext::new();
    let mut catalogs = Catalogs::new();
    let mut sv = SvWriter::new(out.sv_dir());

    for path in &data_files {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        log(&format!("Processing image: {}", file_name));

        let detections = match detector.detect(path) {
            Ok(detections) => detections,
            Err(e) => {
                log(&format!("# Inference failed for {}: {} #", file_name, e));
                ctx.inference_errors += 1;
                continue;
            }
        };
        if detections.is_empty() {
            log("No object found in the image, skipping...");
            continue;
        }
        log(&format!("Objects found: {}", detections.len()));
        ctx.images_inferred += 1;
        ctx.objects_detected += detections.len() as u64;

        // The folder name is the bare ARK identifier
        let Some(bare) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        else {
            log(&format!("# Cannot derive an ARK for {}, skipping... #", file_name));
            ctx.arks_not_found += 1;
            continue;
        };
        let ark = Ark::parse(bare);

        let Some(view_number) = view::extract_view_direct(&file_name) else {
            log(&format!(
                "# Error: cannot extract the view number from the file name {} #",
                file_name
            ));
            ctx.views_not_found += 1;
            continue;
        };

        ctx.mark_seen(&ark);

        let origin = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                log(&format!("# Image file {} unreadable: {}, skipping... #", file_name, e));
                ctx.images_not_found += 1;
                continue;
            }
        };
        let (width, height) = (origin.width() as f64, origin.height() as f64);

        if args.save_annotated {
            let mut annotated = origin.to_rgba8();
            for detection in &detections {
                annotate::draw_bbox(&mut annotated, &detection.bbox, &detection.class_name);
            }
            let annotated_path = path.with_file_name(format!(
                "{}_annotated.jpg",
                view::image_stem(&file_name)
            ));
            DynamicImage::ImageRgba8(annotated)
                .to_rgb8()
                .save(&annotated_path)
                .with_context(|| format!("Failed to save {}", annotated_path.display()))?;
            log(&format!("Annotated image written in: {}", annotated_path.display()));
        }

        let stem = view::image_stem(&file_name);

        for (i, detection) in detections.iter().enumerate() {
            // The model ran on the full-resolution page: already in
            // Original Space, ratio 1.0
            let region = to_percent_region(&detection.bbox, width, height);
            let iiif_url = iiif::region_url(
                &config.iiif_base_url,
                &ark,
                view_number,
                &region,
                &config.iiif_size,
            );
            let out_file = view::crop_filename(&stem, &detection.class_name, i as u64);

            catalogs.push(CatalogRecord {
                ark: ark.full(),
                view: view_number,
                image_filename: file_name.clone(),
                annotation_filename: format!("{}/{}", ark.bare(), out_file),
                category_name: detection.class_name.clone(),
                gallica_url: ark.catalog_url(&config.catalog_base_url, view_number),
                iiif_url: iiif_url.clone(),
                confidence: detection.confidence,
            });
            catalogs.push_pano(PanoRecord {
                path: out_file.clone(),
                gallica_url: ark.catalog_url(&config.catalog_base_url, view_number),
                iiif_url: iiif_url.clone(),
                category_name: detection.class_name.clone(),
                ark: ark.full(),
            });

            sv.append(
                &ark,
                view_number,
                &SvRecord {
                    x_min: detection.bbox.x,
                    y_min: detection.bbox.y,
                    x_max: detection.bbox.x + detection.bbox.width,
                    y_max: detection.bbox.y + detection.bbox.height,
                    class_id: detection.class_id,
                    confidence: detection.confidence,
                    tracker_id: String::new(),
                    class_name: detection.class_name.clone(),
                    file: file_name.clone(),
                    model: args.model.clone(),
                    comment: SvRecord::comment_for(&ark, view_number, 1.0),
                },
            )?;

            if let Some(http) = &http {
                let iiif_out_file = view::crop_filename(
                    &view::page_basename(&ark, view_number),
                    &detection.class_name,
                    i as u64,
                );
                let dest = out.iiif_thumbs_dir().join(ark.bare()).join(iiif_out_file);
                iiif::fetch_image(http, &iiif_url, &dest, Some(&out.iiif_errors_file()), &mut ctx);
            }
        }
    }

    catalogs.flush(out.root())?;
    let finalized = sv.finalize_all()?;
    ctx.write_processed_arks(&out.processed_arks_file())?;

    log(&format!(
        "{} image(s) contain an object (inferred with model {})",
        ctx.images_inferred, args.model
    ));
    log(&format!("{} object(s) found in total", ctx.objects_detected));
    log(&format!("Supervision files written: {}", finalized));
    ctx.log_summary();
    Ok(())
}
