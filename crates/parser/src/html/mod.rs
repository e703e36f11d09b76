//! HTML parsing into [`SanitizedNode`] trees.

pub mod converter;

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_document, parse_fragment as html5ever_fragment, QualName};
use markup5ever_rcdom::RcDom;

use citadel_security::SanitizedNode;
use std::io::Cursor;

use crate::config::ParserConfig;
use crate::error::{ParserError, ParserResult};
use crate::metrics::{DocumentMetrics, ParseTimer};

fn check_size(html: &str, config: &ParserConfig) -> ParserResult<()> {
    if html.len() > config.max_input_bytes {
        return Err(ParserError::InputTooLarge {
            len: html.len(),
            limit: config.max_input_bytes,
        });
    }
    Ok(())
}

/// Parse a full HTML document
pub fn parse_html(
    html: &str,
    config: &ParserConfig,
    metrics: &DocumentMetrics,
) -> ParserResult<SanitizedNode> {
    check_size(html, config)?;
    let timer = ParseTimer::new();

    let dom = parse_document(RcDom::default(), config.parse_opts()).one(html);
    let root = converter::rcdom_to_sanitized(&dom.document, config, metrics);
    metrics.increment_documents();

    tracing::debug!("parsed document: {} nodes in {}us", root.node_count(), timer.elapsed_us());
    Ok(root)
}

/// Parse an HTML fragment in a `<body>` context, the way sanitizers see their input
pub fn parse_fragment(
    html: &str,
    config: &ParserConfig,
    metrics: &DocumentMetrics,
) -> ParserResult<SanitizedNode> {
    check_size(html, config)?;
    let timer = ParseTimer::new();

    let dom = fragment_dom(html, config);
    let root = converter::rcdom_to_sanitized(&dom.document, config, metrics);
    metrics.increment_documents();

    tracing::debug!("parsed fragment: {} nodes in {}us", root.node_count(), timer.elapsed_us());
    Ok(root)
}

pub(crate) fn fragment_dom(html: &str, config: &ParserConfig) -> RcDom {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    html5ever_fragment(RcDom::default(), config.parse_opts(), context, Vec::new()).one(html)
}

/// Parses an HTML document from a reader
pub fn parse_html_from_reader<R: std::io::Read>(
    mut input: R,
    config: &ParserConfig,
    metrics: &DocumentMetrics,
) -> ParserResult<SanitizedNode> {
    // Read input into a buffer first
    let mut buffer = Vec::new();
    if let Err(e) = input.read_to_end(&mut buffer) {
        return Err(ParserError::IoError(e.to_string()));
    }
    if buffer.len() > config.max_input_bytes {
        return Err(ParserError::InputTooLarge {
            len: buffer.len(),
            limit: config.max_input_bytes,
        });
    }
    let mut cursor = Cursor::new(buffer);

    let dom = parse_document(RcDom::default(), config.parse_opts())
        .from_utf8()
        .read_from(&mut cursor)
        .map_err(|e| ParserError::HtmlParseError(e.to_string()))?;

    metrics.increment_documents();
    Ok(converter::rcdom_to_sanitized(&dom.document, config, metrics))
}
