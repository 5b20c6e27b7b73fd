//! Tool configuration.
//!
//! Loads settings from config.json at startup: remote API endpoints, the
//! default IIIF size token, and the HTTP timeout. Every field has a default
//! so the file is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::logging::log;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the IIIF Image API (v3), up to and including the
    /// namespace segment. The bare ARK is appended to it.
    #[serde(default = "default_iiif_base_url")]
    pub iiif_base_url: String,
    /// Base URL of the Gallica catalog, used for user-facing page links.
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    /// Pagination service endpoint returning the per-document view count.
    #[serde(default = "default_pagination_url")]
    pub pagination_url: String,
    /// Hosted detection API base URL (the model name is appended).
    #[serde(default = "default_detect_base_url")]
    pub detect_base_url: String,
    /// IIIF size token for fetched crops ("max" or "pct:n").
    #[serde(default = "default_iiif_size")]
    pub iiif_size: String,
    /// Timeout applied to every remote call, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_iiif_base_url() -> String {
    "https://openapi.bnf.fr/iiif/image/v3/ark:/12148".to_string()
}

fn default_catalog_base_url() -> String {
    "https://gallica.bnf.fr".to_string()
}

fn default_pagination_url() -> String {
    "https://gallica.bnf.fr/services/Pagination".to_string()
}

fn default_detect_base_url() -> String {
    "https://detect.roboflow.com".to_string()
}

fn default_iiif_size() -> String {
    "max".to_string()
}

fn default_http_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iiif_base_url: default_iiif_base_url(),
            catalog_base_url: default_catalog_base_url(),
            pagination_url: default_pagination_url(),
            detect_base_url: default_detect_base_url(),
            iiif_size: default_iiif_size(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads config.json from next to the executable, then from the current
    /// directory. A missing or unparseable file falls back to defaults with
    /// a warning.
    pub fn load() -> Config {
        let candidates = [
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|p| p.join("config.json"))),
            Some(Path::new("config.json").to_path_buf()),
        ];

        for path in candidates.into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => {
                        log(&format!("Config loaded from {}", path.display()));
                        return config;
                    }
                    Err(e) => {
                        log(&format!(
                            "Failed to parse {}: {}. Using defaults.",
                            path.display(),
                            e
                        ));
                    }
                },
                Err(e) => {
                    log(&format!(
                        "Failed to read {}: {}. Using defaults.",
                        path.display(),
                        e
                    ));
                }
            }
        }

        Config::default()
    }
}
