//! Turning raw fuzz or corpus input into HTML documents to clean.
//!
//! Input that already looks like markup is used as is. Anything else is
//! treated as an attribute payload and wrapped into a small document that
//! puts it where a sanitizer has to make a URL decision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Where a non-markup payload is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadShape {
    /// Use the input verbatim
    Raw,
    /// `<img src="...">`
    #[default]
    ImgSrc,
    /// `<a href="...">x</a>`
    AnchorHref,
    /// `<form action="..."><button>go</button></form>`
    FormAction,
    /// `<svg><a xlink:href="...">x</a></svg>`
    SvgXlinkHref,
    /// `<img srcset="... 1x">`
    ImgSrcset,
}

impl PayloadShape {
    /// Shapes used by the multi-candidate suite, in order.
    pub const CANDIDATES: [PayloadShape; 5] = [
        PayloadShape::AnchorHref,
        PayloadShape::ImgSrc,
        PayloadShape::FormAction,
        PayloadShape::SvgXlinkHref,
        PayloadShape::ImgSrcset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PayloadShape::Raw => "raw",
            PayloadShape::ImgSrc => "img-src",
            PayloadShape::AnchorHref => "anchor-href",
            PayloadShape::FormAction => "form-action",
            PayloadShape::SvgXlinkHref => "svg-xlink-href",
            PayloadShape::ImgSrcset => "img-srcset",
        }
    }

    /// Embeds `payload` in this shape's document. The payload is inserted
    /// unescaped, so a `"` in it can close the attribute.
    pub fn wrap(self, payload: &str) -> String {
        match self {
            PayloadShape::Raw => payload.to_string(),
            PayloadShape::ImgSrc => format!("<img src=\"{}\">", payload),
            PayloadShape::AnchorHref => format!("<a href=\"{}\">x</a>", payload),
            PayloadShape::FormAction => {
                format!("<form action=\"{}\"><button>go</button></form>", payload)
            }
            PayloadShape::SvgXlinkHref => format!("<svg><a xlink:href=\"{}\">x</a></svg>", payload),
            PayloadShape::ImgSrcset => format!("<img srcset=\"{} 1x\">", payload),
        }
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PayloadShape {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        [PayloadShape::Raw]
            .into_iter()
            .chain(PayloadShape::CANDIDATES)
            .find(|shape| shape.name() == wanted)
            .ok_or_else(|| HarnessError::Config(format!("unknown payload shape: {}", s)))
    }
}

/// True if the input should be treated as a document rather than a payload.
pub fn looks_like_markup(raw: &str) -> bool {
    raw.trim().starts_with('<')
}

/// The document for `raw`: the input itself when it looks like markup,
/// otherwise `raw` wrapped in `default`.
pub fn shape_payload(raw: &str, default: PayloadShape) -> String {
    if looks_like_markup(raw) {
        raw.to_string()
    } else {
        default.wrap(raw)
    }
}

/// One document per candidate shape. Double quotes in the payload become
/// single quotes so every candidate keeps the payload inside its attribute.
pub fn candidate_documents(payload: &str) -> Vec<String> {
    let attribute_safe = payload.replace('"', "'");
    PayloadShape::CANDIDATES
        .iter()
        .map(|shape| shape.wrap(&attribute_safe))
        .collect()
}
