//! Canonicalization of attribute values before they are compared against policy.
//!
//! Each pass runs the same fixed sequence of steps:
//!
//! 1. strip ASCII C0 controls and DEL
//! 2. strip zero-width and bidi control characters
//! 3. unescape HTML character references (attribute-value rules)
//! 4. percent-decode, repeated until stable or `bound` rounds have run
//! 5. Unicode NFKC normalization
//! 6. trim and collapse whitespace runs to a single space
//! 7. lowercase
//!
//! Passes repeat until the value stops changing, so that a value produced by
//! one decoding layer (`%26lt;` becomes `&lt;`) is fed back through the
//! earlier steps. After [`MAX_CANONICAL_PASSES`] passes the loop only keeps
//! going while each pass makes the value shorter. Every entity or percent
//! layer removed shortens it, so arbitrarily deep layering still settles.

use percent_encoding::percent_decode_str;
use unicode_normalization::UnicodeNormalization;

/// Passes allowed before the loop requires each further pass to shrink the value.
pub const MAX_CANONICAL_PASSES: usize = 32;

/// HTML character reference decoding, supplied by the parser.
pub trait EntityDecoder: Send + Sync {
    /// Decodes character references in `input`.
    ///
    /// With `strict` set, attribute-value rules apply: legacy references
    /// without a trailing `;` are only decoded when not followed by an
    /// alphanumeric or `=`. Input that cannot be decoded is returned unchanged.
    fn unescape_entities(&self, input: &str, strict: bool) -> String;
}

impl<T: EntityDecoder + ?Sized> EntityDecoder for &T {
    fn unescape_entities(&self, input: &str, strict: bool) -> String {
        (**self).unescape_entities(input, strict)
    }
}

/// A normalized value in its two comparable forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedValue {
    folded: String,
    cased: String,
}

impl NormalizedValue {
    /// Canonical lowercase form used for every policy comparison.
    pub fn as_str(&self) -> &str {
        &self.folded
    }

    /// Same pipeline without the lowercase step. Base64 payloads are
    /// case-sensitive and must be decoded from this form.
    pub fn case_preserved(&self) -> &str {
        &self.cased
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    pub fn scheme(&self) -> Option<String> {
        crate::scheme::extract_scheme(&self.folded)
    }

    pub fn into_string(self) -> String {
        self.folded
    }
}

/// Runs the decoding pipeline with a fixed percent-decode bound.
pub struct Normalizer<'a> {
    decoder: &'a dyn EntityDecoder,
    bound: usize,
}

impl<'a> Normalizer<'a> {
    /// A `bound` of zero is raised to one.
    pub fn new(decoder: &'a dyn EntityDecoder, bound: usize) -> Self {
        Self {
            decoder,
            bound: bound.max(1),
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.canonicalize(raw).into_string()
    }

    pub fn canonicalize(&self, raw: &str) -> NormalizedValue {
        let cased = self.settle(raw, false);
        let folded = self.settle(&cased, true);
        NormalizedValue { folded, cased }
    }

    fn settle(&self, raw: &str, fold: bool) -> String {
        let mut current = self.pass(raw, fold);
        let mut passes = 1;
        loop {
            let next = self.pass(&current, fold);
            if next == current {
                return current;
            }
            passes += 1;
            if passes > MAX_CANONICAL_PASSES && next.chars().count() >= current.chars().count() {
                log::debug!(
                    "normalization stopped shrinking after {} passes ({} chars)",
                    passes,
                    next.chars().count()
                );
                return next;
            }
            current = next;
        }
    }

    fn pass(&self, input: &str, fold: bool) -> String {
        let stripped = strip_invisible(input);
        let unescaped = self.decoder.unescape_entities(&stripped, true);
        let decoded = percent_decode_rounds(&unescaped, self.bound);
        let composed: String = decoded.nfkc().collect();
        let collapsed = collapse_whitespace(&composed);
        if fold {
            collapsed.to_lowercase()
        } else {
            collapsed
        }
    }
}

/// Removes C0 controls, DEL, zero-width characters and bidi controls.
pub fn strip_invisible(input: &str) -> String {
    input.chars().filter(|c| !is_invisible(*c)).collect()
}

fn is_invisible(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{001F}'
        | '\u{007F}'
        | '\u{200B}'..='\u{200F}'
        | '\u{2060}'
        | '\u{FEFF}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2066}'..='\u{2069}')
}

/// Percent-decodes up to `bound` times, stopping early once a round changes nothing.
///
/// Invalid UTF-8 produced by a round is replaced with U+FFFD rather than
/// aborting, so a single malformed escape cannot shield the rest of the value.
pub fn percent_decode_rounds(input: &str, bound: usize) -> String {
    let mut current = input.to_string();
    for _ in 0..bound {
        if !current.contains('%') {
            break;
        }
        let decoded = percent_decode_str(&current).decode_utf8_lossy().into_owned();
        if decoded == current {
            break;
        }
        current = decoded;
    }
    current
}

/// Trims and replaces each run of Unicode whitespace with one ASCII space.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
