//! IIIF Image API integration.
//!
//! This module provides:
//! - deterministic request-URL construction (region and size tokens)
//! - idempotent image fetching with error accounting
//! - the Pagination service query for per-document view counts

pub mod fetch;
pub mod pagination;
pub mod url;

pub use fetch::{fetch_image, ReqwestGet};
pub use pagination::page_count;
pub use url::{full_image_url, region_url, SizeToken};
