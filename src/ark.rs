//! ARK identifiers and title normalization.
//!
//! An ARK (Archival Resource Key) names one scanned Gallica document. It
//! circulates in two forms: the full form with the `ark:/12148/` namespace
//! (user-facing links) and the bare form (path segments, API parameters).

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Namespace prefix of every full ARK handled by this tool.
pub const ARK_NAMESPACE: &str = "ark:/12148/";

/// Maximum length of a normalized title key, in characters.
const TITLE_KEY_MAX_CHARS: usize = 30;

/// A Gallica document identifier, stored in bare form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ark {
    bare: String,
}

impl Ark {
    /// Parses an identifier given in either full or bare form.
    /// The namespace strip is a pure string transform, not a lookup.
    pub fn parse(s: &str) -> Ark {
        let s = s.trim();
        let bare = if s.starts_with("ark:") {
            s.replace(ARK_NAMESPACE, "")
        } else {
            s.to_string()
        };
        Ark { bare }
    }

    /// The bare identifier, namespace stripped.
    pub fn bare(&self) -> &str {
        &self.bare
    }

    /// The full identifier with the `ark:/12148/` namespace.
    pub fn full(&self) -> String {
        format!("{}{}", ARK_NAMESPACE, self.bare)
    }

    /// Gallica catalog link for one view of this document.
    /// The view number is not zero-padded in URLs.
    pub fn catalog_url(&self, catalog_base: &str, view: u32) -> String {
        format!("{}/{}/f{}.item", catalog_base, self.full(), view)
    }
}

impl std::fmt::Display for Ark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full())
    }
}

/// Returns true if an image stem already carries a bare ARK, in which case
/// the reference-table lookup is skipped entirely.
pub fn looks_like_ark(stem: &str) -> bool {
    stem.starts_with("bpt") || stem.starts_with("btv")
}

/// Normalizes a document title or filename into a reference-table key.
///
/// The key is lowercase, ASCII-folded, underscore-delimited and truncated to
/// 30 characters. Two titles differing only in accents, casing, spacing or
/// trailing punctuation map to the same key. Never used as an output
/// identifier, only for lookup.
pub fn title_key(title: &str) -> String {
    // Drop the "_view..." suffix the annotation exports carry
    let title = match title.find("_view") {
        Some(pos) => &title[..pos],
        None => title,
    };

    let underscored = title.replace(' ', "_");

    // Keep alphanumerics and underscores, then decompose and drop accents
    let kept: String = underscored
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let folded: String = kept.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let collapsed = folded.replace("__", "_");

    // Truncate on a char boundary, not a byte offset
    let mut truncated: String = collapsed.chars().take(TITLE_KEY_MAX_CHARS).collect();
    if truncated.ends_with('_') {
        truncated.pop();
    }

    truncated.to_lowercase()
}
