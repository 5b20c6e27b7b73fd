//! COCO-annotation pipeline.
//!
//! Walks every annotation of a COCO export: establishes the page identity
//! (ARK + view) from the image filename, overlays the box on a working copy
//! of the page, saves a local crop, records catalog and supervision
//! metadata, and optionally fetches the full-resolution crop over IIIF.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::PathBuf;

use crate::annotate;
use crate::ark::{looks_like_ark, Ark};
use crate::catalog::{CatalogRecord, Catalogs, PanoRecord};
use crate::coco::CocoDataset;
use crate::config::Config;
use crate::context::RunContext;
use crate::geometry::{to_percent_region, validate_ratio};
use crate::iiif::{self, ReqwestGet};
use crate::logging::{self, log};
use crate::paths::OutputTree;
use crate::reference::{append_missing_title, ArkTable};
use crate::supervision::{SvRecord, SvWriter};
use crate::view;

/// Annotation source recorded in the supervision files.
const MODEL: &str = "snooptypo/2";

pub struct BoxesArgs {
    /// COCO folder holding `_annotations.coco.json` and the images.
    pub data_dir: PathBuf,
    /// Annotation-to-scan resolution ratio (1.0 = annotated at full size).
    pub ratio: f64,
    /// Fetch full-resolution crops over the IIIF API.
    pub download_iiif: bool,
    /// Path to the title-to-ARK reference table.
    pub arks_database: PathBuf,
    /// Output root.
    pub output: PathBuf,
}

pub fn run(config: &Config, args: &BoxesArgs) -> Result<()> {
    let ratio = validate_ratio(args.ratio)?;

    // Startup validation: missing inputs abort before any processing
    let coco_path = args.data_dir.join("_annotations.coco.json");
    let table = ArkTable::load(&args.arks_database)?;
    let coco = CocoDataset::load(&coco_path)?;

    let out = OutputTree::new(&args.output);
    out.ensure().context("Failed to create output tree")?;
    logging::init(&out.logs_dir());

    let http: Option<ReqwestGet> = if args.download_iiif {
        Some(ReqwestGet::new(config.http_timeout_secs)?)
    } else {
        None
    };

    let mut ctx = RunContext::new();
    let mut catalogs = Catalogs::new();
    let mut sv = SvWriter::new(out.sv_dir());

    let image_files = coco.image_files();

    for annotation in &coco.annotations {
        let Some(image_file) = image_files.get(&annotation.image_id).copied() else {
            log(&format!(
                "# Image ID {} not found in COCO JSON, skipping... #",
                annotation.image_id
            ));
            continue;
        };

        let image_path = args.data_dir.join(image_file);
        if !image_path.exists() {
            log(&format!(
                "# Image file {} not found, skipping... #",
                image_path.display()
            ));
            ctx.images_not_found += 1;
            continue;
        }

        let stem = view::image_stem(image_file);
        log(&format!("Processing image: {}", stem));

        // Copy the page into the output tree on its first annotation
        let copied_path = out.root().join(format!("{}.jpg", stem));
        if !copied_path.exists() {
            std::fs::copy(&image_path, &copied_path)
                .with_context(|| format!("Failed to copy {}", image_path.display()))?;
            ctx.images_with_annotations += 1;
        }

        // Establish identity: direct parse for ARK-named files, reference
        // table for titled exports
        let (ark, view_number) = if looks_like_ark(&stem) {
            match view::split_direct(&stem) {
                Some((bare, v)) => (Ark::parse(bare), Some(v)),
                None => (Ark::parse(&stem), None),
            }
        } else {
            let Some(ark) = table.resolve(&stem) else {
                log(&format!("# ARK not found for title {} #", stem));
                append_missing_title(&out.ark_errors_file(), &stem)?;
                ctx.arks_not_found += 1;
                continue;
            };
            (ark.clone(), view::extract_view_embedded(&stem))
        };

        let Some(view_number) = view_number else {
            log(&format!(
                "# Warning! Cannot extract view number from filename {}, skipping... #",
                stem
            ));
            ctx.views_not_found += 1;
            continue;
        };

        ctx.mark_seen(&ark);

        let bbox = annotation.bounding_box();
        let category = coco.category_name(annotation.category_id).to_string();

        // Accumulate the overlay on the working copy
        let mut working = image::open(&copied_path)
            .with_context(|| format!("Failed to open {}", copied_path.display()))?
            .to_rgba8();
        annotate::draw_bbox(&mut working, &bbox, &category);
        DynamicImage::ImageRgba8(working)
            .to_rgb8()
            .save(&copied_path)
            .with_context(|| format!("Failed to save {}", copied_path.display()))?;

        // The untouched source supplies the crop and the page dimensions
        let origin = image::open(&image_path)
            .with_context(|| format!("Failed to open {}", image_path.display()))?;
        let (width, height) = (origin.width() as f64, origin.height() as f64);

        // Project to Original Space before mapping to percentages
        let origin_bbox = bbox.to_original(ratio);
        let region = to_percent_region(&origin_bbox, width / ratio, height / ratio);
        let iiif_url =
            iiif::region_url(&config.iiif_base_url, &ark, view_number, &region, &config.iiif_size);

        let out_file = view::crop_filename(&stem, &category, annotation.id);

        catalogs.push(CatalogRecord {
            ark: ark.full(),
            view: view_number,
            image_filename: image_file.to_string(),
            annotation_filename: format!("{}/{}", ark.bare(), out_file),
            category_name: category.clone(),
            gallica_url: ark.catalog_url(&config.catalog_base_url, view_number),
            iiif_url: iiif_url.clone(),
            confidence: 1.0,
        });
        catalogs.push_pano(PanoRecord {
            path: out_file.clone(),
            gallica_url: ark.catalog_url(&config.catalog_base_url, view_number),
            iiif_url: iiif_url.clone(),
            category_name: category.clone(),
            ark: ark.full(),
        });

        sv.append(
            &ark,
            view_number,
            &SvRecord {
                x_min: bbox.x,
                y_min: bbox.y,
                x_max: bbox.x + bbox.width,
                y_max: bbox.y + bbox.height,
                class_id: annotation.category_id,
                confidence: 1.0,
                tracker_id: String::new(),
                class_name: category.clone(),
                file: image_file.to_string(),
                model: MODEL.to_string(),
                comment: SvRecord::comment_for(&ark, view_number, ratio),
            },
        )?;

        annotate::save_crop(&origin, &bbox, &out.thumbs_dir(), &ark, &category, &out_file)?;

        if let Some(http) = &http {
            let iiif_out_file =
                view::crop_filename(&view::page_basename(&ark, view_number), &category, annotation.id);
            let dest = out.iiif_thumbs_dir().join(ark.bare()).join(iiif_out_file);
            iiif::fetch_image(http, &iiif_url, &dest, Some(&out.iiif_errors_file()), &mut ctx);
        }
    }

    catalogs.flush(out.root())?;
    let finalized = sv.finalize_all()?;
    ctx.write_processed_arks(&out.processed_arks_file())?;

    log(&format!(
        "Number of annotations in the dataset: {}",
        coco.annotations.len()
    ));
    log(&format!("Number of images in the dataset: {}", coco.images.len()));
    log(&format!(
        "Number of images with annotations: {}",
        ctx.images_with_annotations
    ));
    log(&format!("Supervision files written: {}", finalized));
    log(&format!("Catalog rows written: {}", catalogs.len()));
    log(&format!("ARK reference table entries: {}", table.len()));
    ctx.log_summary();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const COCO: &str = r#"{
        "images": [
            {"id": 0, "file_name": "bpt6k858005x-0001.jpg"},
            {"id": 1, "file_name": "Heures_Royales_view_2_num_NP_jpg.rf.abc.jpg"},
            {"id": 2, "file_name": "unknown_title_view_1_num_NP_jpg.rf.def.jpg"}
        ],
        "annotations": [
            {"id": 10, "image_id": 0, "category_id": 1, "bbox": [20.0, 30.0, 40.0, 50.0]},
            {"id": 11, "image_id": 0, "category_id": 2, "bbox": [5.0, 5.0, 10.0, 10.0]},
            {"id": 12, "image_id": 1, "category_id": 1, "bbox": [10.0, 10.0, 30.0, 30.0]},
            {"id": 13, "image_id": 2, "category_id": 1, "bbox": [0.0, 0.0, 5.0, 5.0]}
        ],
        "categories": [{"id": 1, "name": "Vignette"}, {"id": 2, "name": "Lettrine"}]
    }"#;

    fn write_image(path: &std::path::Path) {
        image::RgbImage::from_pixel(200, 300, image::Rgb([200, 200, 200]))
            .save(path)
            .unwrap();
    }

    fn setup(root: &std::path::Path) -> BoxesArgs {
        let data_dir = root.join("coco");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("_annotations.coco.json"), COCO).unwrap();
        write_image(&data_dir.join("bpt6k858005x-0001.jpg"));
        write_image(&data_dir.join("Heures_Royales_view_2_num_NP_jpg.rf.abc.jpg"));
        write_image(&data_dir.join("unknown_title_view_1_num_NP_jpg.rf.def.jpg"));

        let arks_database = root.join("arks_database.csv");
        std::fs::write(&arks_database, "Heures Royales#ark:/12148/btv1b5555\n").unwrap();

        BoxesArgs {
            data_dir,
            ratio: 1.0,
            download_iiif: false,
            arks_database,
            output: root.join("output"),
        }
    }

    #[test]
    fn test_run_produces_catalogs_crops_and_supervision() {
        let root = tempdir().unwrap();
        let args = setup(root.path());
        run(&Config::default(), &args).unwrap();

        let out = args.output;
        // Catalog rows: the unknown title is skipped, the rest survive
        let catalog = std::fs::read_to_string(out.join("processed_data.csv")).unwrap();
        assert_eq!(catalog.lines().count(), 4); // header + 3 rows
        assert!(catalog.contains("ark:/12148/bpt6k858005x,1,"));
        assert!(catalog.contains("ark:/12148/btv1b5555,2,"));
        assert!(catalog.contains("pct:"));

        // Supervision file per page, finalized to valid JSON
        let sv: Vec<SvRecord> = serde_json::from_str(
            &std::fs::read_to_string(out.join("SV/bpt6k858005x/bpt6k858005x-0001.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sv.len(), 2);
        assert_eq!(sv[0].x_max, 60.0);

        // Local crops organised by ARK then category
        assert!(out
            .join("thumbs/bpt6k858005x/Vignette/bpt6k858005x-0001-Vignette_10.jpg")
            .exists());
        assert!(out
            .join("thumbs/btv1b5555/Vignette/Heures_Royales_view_2_num_NP-Vignette_12.jpg")
            .exists());

        // The miss landed in the error log and the seen-set excludes it
        let errors = std::fs::read_to_string(out.join("arks_errors.txt")).unwrap();
        assert_eq!(errors, "unknown_title_view_1_num_NP\n");
        let arks = std::fs::read_to_string(out.join("processed_arks_list.csv")).unwrap();
        assert_eq!(arks, "ark:/12148/bpt6k858005x\nark:/12148/btv1b5555\n");
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let root = tempdir().unwrap();
        let args = setup(root.path());
        run(&Config::default(), &args).unwrap();
        let first = std::fs::read(args.output.join("processed_data.csv")).unwrap();
        let first_pano = std::fs::read(args.output.join("import_pano.csv")).unwrap();

        run(&Config::default(), &args).unwrap();
        assert_eq!(std::fs::read(args.output.join("processed_data.csv")).unwrap(), first);
        assert_eq!(std::fs::read(args.output.join("import_pano.csv")).unwrap(), first_pano);
    }

    #[test]
    fn test_missing_coco_is_fatal() {
        let root = tempdir().unwrap();
        let mut args = setup(root.path());
        args.data_dir = root.path().join("empty");
        std::fs::create_dir_all(&args.data_dir).unwrap();
        assert!(run(&Config::default(), &args).is_err());
    }

    #[test]
    fn test_bad_ratio_is_fatal() {
        let root = tempdir().unwrap();
        let mut args = setup(root.path());
        args.ratio = 0.0;
        assert!(run(&Config::default(), &args).is_err());
    }
}
