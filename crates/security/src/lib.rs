//! Citadel Security Crate
//!
//! Decides whether sanitized HTML can still execute script. A sanitized
//! document is parsed into a [`SanitizedNode`] tree, every attribute value is
//! canonicalized by the [`Normalizer`], and the [`Classifier`] checks tags,
//! event handlers, URL schemes, `data:` payloads and inline styles against a
//! [`Policy`]. The result is a [`Verdict`]: hard findings plus softer leads.
//!
//! The crate performs no I/O. Character reference decoding is supplied by the
//! caller through [`EntityDecoder`], normally the HTML parser.

pub mod classifier;
pub mod error;
pub mod node;
pub mod normalizer;
pub mod policy;
pub mod scheme;
pub mod verdict;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::{classify, looks_url_like, Classifier};
pub use error::{SecurityError, SecurityResult};
pub use node::SanitizedNode;
pub use normalizer::{EntityDecoder, NormalizedValue, Normalizer};
pub use policy::{Policy, PolicyBuilder, PolicyPreset, DEFAULT_MAX_DECODE_ROUNDS};
pub use scheme::{data_uri_is_executable, extract_scheme, looks_dangerous, DataUriParts};
pub use verdict::{Evidence, Finding, Lead, LeadKind, Location, ReasonCode, Verdict};
