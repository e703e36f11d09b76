//! Scheme extraction and `data:` URI inspection on normalized values.

use crate::normalizer::Normalizer;
use crate::policy::Policy;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;

/// Nested `data:` URIs are followed this many levels below the outer one.
pub const MAX_DATA_URI_DEPTH: usize = 1;

const MARKUP_MEDIA_HINTS: &[&str] = &["html", "text", "svg", "xml"];

const DANGEROUS_MARKERS: &[&str] = &[
    "<script",
    "</script",
    "<svg",
    "javascript:",
    "vbscript:",
    "data:text/html",
    "data:image/svg+xml",
    "onerror=",
    "onload=",
    "expression(",
    "url(javascript:",
];

// Padding is optional in the wild; browsers accept both.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

lazy_static! {
    static ref INLINE_HANDLER: Regex =
        Regex::new(r#"(?:^|[\s/"'<])on[a-z]+\s*="#).expect("static handler pattern");
}

/// Scheme of a normalized value: the text before the first `:`, filtered to
/// `[A-Za-z0-9+.-]` and lowercased. `None` when there is no colon, the colon
/// is the first character, or nothing survives the filter.
pub fn extract_scheme(normalized: &str) -> Option<String> {
    let colon = normalized.find(':')?;
    if colon == 0 {
        return None;
    }
    let scheme: String = normalized[..colon]
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if scheme.is_empty() {
        None
    } else {
        Some(scheme)
    }
}

/// Dangerous scheme directly behind a leading `//`, as in `//javascript:x`.
pub fn protocol_relative_scheme<'p>(normalized: &str, policy: &'p Policy) -> Option<&'p str> {
    let rest = normalized.strip_prefix("//")?;
    policy
        .dangerous_schemes()
        .find(|scheme| rest.strip_prefix(scheme).is_some_and(|tail| tail.starts_with(':')))
}

/// The pieces of `data:[<mediatype>][;base64],<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUriParts {
    /// Lowercased media type; `text/plain` when omitted.
    pub media_type: String,
    pub is_base64: bool,
    pub payload: String,
}

impl DataUriParts {
    /// Splits a `data:` URI. Returns `None` when the scheme is not `data` or
    /// the mandatory comma is missing.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let colon = value.find(':')?;
        if !value[..colon].trim().eq_ignore_ascii_case("data") {
            return None;
        }
        let after = &value[colon + 1..];
        let comma = after.find(',')?;
        let meta = after[..comma].to_lowercase();
        let media_type = meta.split(';').next().unwrap_or_default().trim().to_string();
        Some(Self {
            media_type: if media_type.is_empty() {
                "text/plain".to_string()
            } else {
                media_type
            },
            is_base64: meta.split(';').skip(1).any(|param| param.trim() == "base64"),
            payload: after[comma + 1..].to_string(),
        })
    }

    /// Whether the media type can be rendered as markup or script.
    pub fn is_markup_like(&self) -> bool {
        MARKUP_MEDIA_HINTS.iter().any(|hint| self.media_type.contains(hint))
    }

    /// Payload text. Base64 that fails to decode yields an empty string.
    ///
    /// A `#fragment` after Base64 data is dropped first, as browsers do.
    pub fn decode_payload(&self) -> String {
        if self.is_base64 {
            let data = self.payload.split('#').next().unwrap_or_default();
            let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
            match LENIENT_BASE64.decode(compact.as_bytes()) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    log::trace!("data URI payload is not valid base64: {}", e);
                    String::new()
                }
            }
        } else {
            percent_decode_str(&self.payload).decode_utf8_lossy().into_owned()
        }
    }
}

/// Whether a normalized string contains a known script-execution marker.
pub fn looks_dangerous(normalized: &str) -> bool {
    DANGEROUS_MARKERS.iter().any(|marker| normalized.contains(marker))
        || INLINE_HANDLER.is_match(normalized)
}

/// Whether a `data:` URI would execute script when rendered.
///
/// `value` must be the case-preserved normalized form (see
/// [`NormalizedValue::case_preserved`](crate::normalizer::NormalizedValue::case_preserved)),
/// since base64 payloads are case-sensitive.
pub fn data_uri_is_executable(value: &str, normalizer: &Normalizer<'_>) -> bool {
    executable_at_depth(value, normalizer, 0)
}

fn executable_at_depth(value: &str, normalizer: &Normalizer<'_>, depth: usize) -> bool {
    let Some(parts) = DataUriParts::parse(value) else {
        log::trace!("not a well-formed data URI: {:.60}", value);
        return false;
    };
    if !parts.is_markup_like() {
        return false;
    }

    let inner = normalizer.canonicalize(&parts.decode_payload());
    if looks_dangerous(inner.as_str()) {
        return true;
    }

    depth < MAX_DATA_URI_DEPTH
        && inner.scheme().as_deref() == Some("data")
        && executable_at_depth(inner.case_preserved(), normalizer, depth + 1)
}
