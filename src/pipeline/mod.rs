//! The three batch entry paths.
//!
//! - `boxes`: COCO annotations to overlays, crops and metadata
//! - `harvest`: ARK list to full page images over IIIF
//! - `infer`: detection model over an image folder, same outputs as `boxes`

pub mod boxes;
pub mod harvest;
pub mod infer;

pub use boxes::BoxesArgs;
pub use harvest::HarvestArgs;
pub use infer::InferArgs;
