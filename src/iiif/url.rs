//! IIIF request-URL construction.
//!
//! All requests follow the template
//! `<base>/<bare-ark>/f<view>/<region>/<size>/0/default.jpg` where the
//! region token is `full` or a `pct:` rectangle and the size token is `max`
//! or `pct:n`. URLs are pure functions of their inputs.

use crate::ark::Ark;
use crate::geometry::PercentRegion;

/// IIIF size token for fetched images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeToken {
    /// Full available resolution.
    Max,
    /// A percentage of the full resolution (1-100).
    Pct(u32),
}

impl SizeToken {
    /// Derives the size token from the scan/annotation ratio: 1.0 means the
    /// maximum size, anything below scales down proportionally.
    pub fn from_ratio(ratio: f64) -> SizeToken {
        if ratio >= 1.0 {
            SizeToken::Max
        } else {
            SizeToken::Pct((ratio * 100.0) as u32)
        }
    }
}

impl std::fmt::Display for SizeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeToken::Max => f.write_str("max"),
            SizeToken::Pct(n) => write!(f, "pct:{}", n),
        }
    }
}

/// URL for one full page image of a document.
pub fn full_image_url(base: &str, ark: &Ark, view: u32, size: &str) -> String {
    format!("{}/{}/f{}/full/{}/0/default.jpg", base, ark.bare(), view, size)
}

/// URL for a percentage-region crop of one page.
pub fn region_url(base: &str, ark: &Ark, view: u32, region: &PercentRegion, size: &str) -> String {
    format!("{}/{}/f{}/{}/{}/0/default.jpg", base, ark.bare(), view, region, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://openapi.bnf.fr/iiif/image/v3/ark:/12148";

    #[test]
    fn test_full_image_url() {
        let ark = Ark::parse("ark:/12148/bpt6k858005x");
        assert_eq!(
            full_image_url(BASE, &ark, 12, "max"),
            "https://openapi.bnf.fr/iiif/image/v3/ark:/12148/bpt6k858005x/f12/full/max/0/default.jpg"
        );
    }

    #[test]
    fn test_region_url() {
        let ark = Ark::parse("bpt6k858005x");
        let region = PercentRegion {
            x: 10.0,
            y: 10.0,
            width: 5.0,
            height: 3.0,
        };
        assert_eq!(
            region_url(BASE, &ark, 1, &region, "max"),
            "https://openapi.bnf.fr/iiif/image/v3/ark:/12148/bpt6k858005x/f1/pct:10,10,5,3/max/0/default.jpg"
        );
    }

    #[test]
    fn test_size_token_from_ratio() {
        assert_eq!(SizeToken::from_ratio(1.0), SizeToken::Max);
        assert_eq!(SizeToken::from_ratio(0.7), SizeToken::Pct(70));
        assert_eq!(SizeToken::from_ratio(0.7).to_string(), "pct:70");
        assert_eq!(SizeToken::Max.to_string(), "max");
    }

    #[test]
    fn test_urls_are_deterministic() {
        let ark = Ark::parse("btv1b1234");
        let a = full_image_url(BASE, &ark, 3, "pct:70");
        let b = full_image_url(BASE, &ark, 3, "pct:70");
        assert_eq!(a, b);
    }
}
