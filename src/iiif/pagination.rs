//! Gallica Pagination service.
//!
//! `GET <pagination>?ark=<bare>&format=xml` returns an XML document whose
//! `<nbVueImages>` element carries the number of views. Anything short of a
//! well-formed response with a numeric count yields 0 and bumps the
//! not-found counter; pagination errors never propagate.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::ark::Ark;
use crate::context::RunContext;
use crate::iiif::fetch::HttpGet;
use crate::logging::log;

/// Returns the number of views of a document, or 0 when the count cannot be
/// determined.
pub fn page_count(
    http: &dyn HttpGet,
    pagination_base: &str,
    ark: &Ark,
    ctx: &mut RunContext,
) -> u32 {
    let url = format!("{}?ark={}&format=xml", pagination_base, ark.bare());

    let body = match http.get_bytes(&url) {
        Ok(bytes) => bytes,
        Err(e) => {
            log(&format!(
                "# Failed to retrieve pagination info for ARK {}: {} #",
                ark.bare(),
                e
            ));
            ctx.pagination_not_found += 1;
            return 0;
        }
    };

    match parse_view_count(&body) {
        Some(n) => n,
        None => {
            log(&format!(
                "# Warning: <nbVueImages> element not found or invalid in the pagination response for ARK {} #",
                ark.bare()
            ));
            ctx.pagination_not_found += 1;
            0
        }
    }
}

/// Extracts the numeric content of the first `<nbVueImages>` element.
fn parse_view_count(xml: &[u8]) -> Option<u32> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut in_count = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"nbVueImages" => in_count = true,
            Ok(Event::Text(t)) if in_count => {
                return t.unescape().ok()?.trim().parse::<u32>().ok();
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"nbVueImages" => in_count = false,
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedHttp(Result<Vec<u8>, String>);

    impl HttpGet for FixedHttp {
        fn get_bytes(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
            match &self.0 {
                Ok(bytes) => Ok(bytes.clone()),
                Err(msg) => Err(anyhow!("{}", msg)),
            }
        }
    }

    const SAMPLE_XML: &[u8] = b"<?xml version=\"1.0\"?>\
        <livre><structure><nbVueImages>216</nbVueImages></structure></livre>";

    #[test]
    fn test_page_count_parses_element() {
        let http = FixedHttp(Ok(SAMPLE_XML.to_vec()));
        let mut ctx = RunContext::new();
        let ark = Ark::parse("bpt6k858005x");
        assert_eq!(page_count(&http, "https://example/Pagination", &ark, &mut ctx), 216);
        assert_eq!(ctx.pagination_not_found, 0);
    }

    #[test]
    fn test_page_count_missing_element_yields_zero() {
        let http = FixedHttp(Ok(b"<livre><structure/></livre>".to_vec()));
        let mut ctx = RunContext::new();
        let ark = Ark::parse("bpt6k858005x");
        assert_eq!(page_count(&http, "https://example/Pagination", &ark, &mut ctx), 0);
        assert_eq!(ctx.pagination_not_found, 1);
    }

    #[test]
    fn test_page_count_non_numeric_yields_zero() {
        let http = FixedHttp(Ok(
            b"<livre><nbVueImages>beaucoup</nbVueImages></livre>".to_vec(),
        ));
        let mut ctx = RunContext::new();
        let ark = Ark::parse("bpt6k858005x");
        assert_eq!(page_count(&http, "https://example/Pagination", &ark, &mut ctx), 0);
        assert_eq!(ctx.pagination_not_found, 1);
    }

    #[test]
    fn test_page_count_transport_error_yields_zero() {
        let http = FixedHttp(Err("connection refused".to_string()));
        let mut ctx = RunContext::new();
        let ark = Ark::parse("bpt6k858005x");
        assert_eq!(page_count(&http, "https://example/Pagination", &ark, &mut ctx), 0);
        assert_eq!(ctx.pagination_not_found, 1);
    }
}
