//! Object-detection model integration.
//!
//! The pipeline only depends on the `Detector` trait; the production
//! implementation talks to the Roboflow hosted inference API (one POST per
//! image, base64-encoded body). The API reports center-based boxes, which
//! are converted to top-left pixel coordinates here so the rest of the tool
//! sees a single convention.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::geometry::BoundingBox;

/// One detected object, box in top-left absolute pixels of the input image.
#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub class_name: String,
    pub confidence: f64,
}

/// Seam for the external detection model.
pub trait Detector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>>;
}

#[derive(Debug, Deserialize)]
struct InferencePrediction {
    /// Center x, in pixels of the submitted image.
    x: f64,
    /// Center y, in pixels of the submitted image.
    y: f64,
    width: f64,
    height: f64,
    confidence: f64,
    class: String,
    #[serde(default)]
    class_id: u32,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    predictions: Vec<InferencePrediction>,
}

/// Hosted inference client. The API key comes from the ROBOFLOW_API_KEY
/// environment variable; a missing key is a startup error, not a per-image
/// one.
pub struct RoboflowDetector {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl RoboflowDetector {
    pub fn new(detect_base: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var("ROBOFLOW_API_KEY")
            .context("ROBOFLOW_API_KEY environment variable is not set")?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            endpoint: format!("{}/{}", detect_base.trim_end_matches('/'), model),
            api_key,
            client,
        })
    }
}

impl Detector for RoboflowDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>> {
        let bytes = std::fs::read(image_path)
            .with_context(|| format!("Failed to read image: {}", image_path.display()))?;
        let body = BASE64.encode(bytes);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("api_key", self.api_key.as_str())])
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .with_context(|| format!("Inference request failed for {}", image_path.display()))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Inference API returned HTTP {} for {}",
                response.status(),
                image_path.display()
            ));
        }

        let raw = response
            .bytes()
            .context("Failed to read inference response")?;
        parse_response(&raw)
    }
}

/// Decodes an inference response body into detections.
fn parse_response(bytes: &[u8]) -> Result<Vec<Detection>> {
    let parsed: InferenceResponse =
        serde_json::from_slice(bytes).context("Failed to parse inference response")?;
    Ok(parsed.predictions.into_iter().map(Detection::from).collect())
}

impl From<InferencePrediction> for Detection {
    fn from(p: InferencePrediction) -> Self {
        Detection {
            bbox: BoundingBox::new(
                p.x - p.width / 2.0,
                p.y - p.height / 2.0,
                p.width,
                p.height,
            ),
            class_id: p.class_id,
            class_name: p.class,
            confidence: p.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_converts_center_to_top_left() {
        let json = r#"{
            "predictions": [
                {"x": 100.0, "y": 200.0, "width": 40.0, "height": 60.0,
                 "confidence": 0.91, "class": "Lettrine", "class_id": 2}
            ]
        }"#;
        let response: InferenceResponse = serde_json::from_str(json).unwrap();
        let detection = Detection::from(response.predictions.into_iter().next().unwrap());

        assert_eq!(detection.bbox.x, 80.0);
        assert_eq!(detection.bbox.y, 170.0);
        assert_eq!(detection.bbox.width, 40.0);
        assert_eq!(detection.bbox.height, 60.0);
        assert_eq!(detection.class_name, "Lettrine");
        assert_eq!(detection.confidence, 0.91);
    }

    #[test]
    fn test_parse_response_body() {
        let body = br#"{
            "predictions": [
                {"x": 50.0, "y": 50.0, "width": 20.0, "height": 10.0,
                 "confidence": 0.8, "class": "Ornement", "class_id": 3}
            ]
        }"#;
        let detections = parse_response(body).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox.x, 40.0);
        assert_eq!(detections[0].class_name, "Ornement");
    }

    #[test]
    fn test_parse_response_rejects_non_json() {
        assert!(parse_response(b"<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_missing_class_id_defaults_to_zero() {
        let json = r#"{
            "predictions": [
                {"x": 10.0, "y": 10.0, "width": 4.0, "height": 4.0,
                 "confidence": 0.5, "class": "Vignette"}
            ]
        }"#;
        let response: InferenceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.predictions[0].class_id, 0);
    }
}
