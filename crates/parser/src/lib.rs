//! Citadel's HTML parser for sanitizer auditing
//!
//! Parses HTML into the [`SanitizedNode`] trees the classifier walks,
//! decodes character references the way a browser does, and wraps ammonia
//! as the allow-list sanitizer under test.

use std::sync::Arc;

pub mod config;
pub mod entities;
pub mod error;
pub mod html;
pub mod metrics;
pub mod sanitizer;

use citadel_security::{EntityDecoder, SanitizedNode};
use error::ParserResult;

/// Re-export common types
pub use config::ParserConfig;
pub use entities::unescape_entities;
pub use error::ParserError;
pub use html::{parse_fragment, parse_html, parse_html_from_reader};
pub use metrics::{DocumentMetrics, ParseTimer};
pub use sanitizer::{AllowPolicy, AllowPreset, Sanitizer};

/// Trait for parsers in the Citadel sanitizer audit
pub trait Parser {
    /// Type of the parser output
    type Output;

    /// Parse content with the given configuration
    fn parse(&self, content: &str) -> ParserResult<Self::Output>;

    /// Get parser metrics
    fn metrics(&self) -> &DocumentMetrics;
}

/// HTML parser producing [`SanitizedNode`] trees. Also the entity decoder
/// handed to the classifier.
#[derive(Debug, Clone, Default)]
pub struct HtmlParser {
    config: ParserConfig,
    metrics: Arc<DocumentMetrics>,
}

impl HtmlParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(DocumentMetrics::new()),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a complete document
    pub fn parse_document(&self, html: &str) -> ParserResult<SanitizedNode> {
        parse_html(html, &self.config, &self.metrics)
    }

    /// Parse a fragment in `<body>` context
    pub fn parse_fragment(&self, html: &str) -> ParserResult<SanitizedNode> {
        parse_fragment(html, &self.config, &self.metrics)
    }
}

impl Parser for HtmlParser {
    type Output = SanitizedNode;

    fn parse(&self, content: &str) -> ParserResult<SanitizedNode> {
        self.parse_document(content)
    }

    fn metrics(&self) -> &DocumentMetrics {
        &self.metrics
    }
}

impl EntityDecoder for HtmlParser {
    fn unescape_entities(&self, input: &str, strict: bool) -> String {
        entities::unescape_entities(input, strict)
    }
}
