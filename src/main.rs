//! gallica-extract
//!
//! Batch tooling around Gallica's IIIF APIs for scanned historical
//! documents: overlays and crops object-detection annotations (COCO
//! exports), maps images back to their ARK identifiers, emits CSV catalogs
//! and per-page supervision records, and harvests page images directly from
//! the IIIF Image API.
//!
//! Usage:
//!   gallica-extract boxes <data_dir> <ratio> [-i]
//!   gallica-extract harvest <arks_file> <ratio>
//!   gallica-extract infer <images_dir> <model> [-s] [-i]

mod annotate;
mod ark;
mod catalog;
mod coco;
mod config;
mod context;
mod detect;
mod geometry;
mod iiif;
mod logging;
mod paths;
mod pipeline;
mod reference;
mod supervision;
mod view;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::Config;
use detect::RoboflowDetector;
use pipeline::{BoxesArgs, HarvestArgs, InferArgs};

#[derive(Parser)]
#[command(name = "gallica-extract", version, about = "Extract and catalog object detections from Gallica documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract bounding boxes from a COCO export: overlays, crops, catalogs
    Boxes {
        /// Path to the COCO folder (holds _annotations.coco.json + images)
        data_dir: PathBuf,
        /// Image dimension ratio compared to the original scan (0 < r <= 1)
        ratio: f64,
        /// Download full-resolution crops via the IIIF API
        #[arg(short = 'i', long = "iiif")]
        iiif: bool,
        /// Title-to-ARK reference table
        #[arg(long, default_value = "arks_database.csv")]
        arks_database: PathBuf,
        /// Output directory
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },
    /// Download every page image of the listed ARKs via the IIIF API
    Harvest {
        /// Text file with one ARK per line
        arks_file: PathBuf,
        /// Image dimension ratio for the downloads (0 < r <= 1)
        ratio: f64,
        /// Output directory
        #[arg(long, default_value = "IIIF_images")]
        output: PathBuf,
    },
    /// Run the detection model over a folder of images
    Infer {
        /// Folder of images, one subfolder per bare ARK
        images_dir: PathBuf,
        /// Detection model name (e.g. "snooptypo/2")
        model: String,
        /// Save annotated copies next to the input images
        #[arg(short = 's', long = "save")]
        save: bool,
        /// Download full-resolution crops via the IIIF API
        #[arg(short = 'i', long = "iiif")]
        iiif: bool,
        /// Output directory
        #[arg(long, default_value = "JSON")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Command::Boxes {
            data_dir,
            ratio,
            iiif,
            arks_database,
            output,
        } => pipeline::boxes::run(
            &config,
            &BoxesArgs {
                data_dir,
                ratio,
                download_iiif: iiif,
                arks_database,
                output,
            },
        ),
        Command::Harvest { arks_file, ratio, output } => pipeline::harvest::run(
            &config,
            &HarvestArgs {
                arks_file,
                ratio,
                output,
            },
        ),
        Command::Infer {
            images_dir,
            model,
            save,
            iiif,
            output,
        } => {
            let detector =
                RoboflowDetector::new(&config.detect_base_url, &model, config.http_timeout_secs)?;
            pipeline::infer::run(
                &config,
                &InferArgs {
                    images_dir,
                    model,
                    save_annotated: save,
                    download_iiif: iiif,
                    output,
                },
                &detector,
            )
        }
    }
}
