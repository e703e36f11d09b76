//! Character reference decoding through the html5ever tokenizer.
//!
//! Rather than carrying a second copy of the entity table, the input is
//! wrapped in a tiny fragment and handed to the real parser. Attribute mode
//! places it inside a double-quoted attribute value, so legacy references
//! followed by an alphanumeric or `=` stay undecoded exactly as in a browser.
//! Text mode places it in body text.

use markup5ever_rcdom::{Handle, NodeData};

use crate::config::ParserConfig;
use crate::html::fragment_dom;

/// Decodes HTML character references in `input`.
///
/// With `strict` set, attribute-value rules apply. Text mode cannot
/// represent NUL, which the tree builder drops. Input the parser cannot round
/// trip is returned unchanged.
pub fn unescape_entities(input: &str, strict: bool) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let decoded = if strict {
        unescape_attribute(input)
    } else {
        unescape_text(input)
    };
    decoded.unwrap_or_else(|| {
        tracing::debug!("entity decoding fell back to raw input ({} bytes)", input.len());
        input.to_string()
    })
}

fn unescape_attribute(input: &str) -> Option<String> {
    let wrapped = format!("<a x=\"{}\">", input.replace('"', "&#34;"));
    let dom = fragment_dom(&wrapped, &ParserConfig::default());
    let anchor = first_element(&dom.document)?;
    let value = match anchor.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == "x")
            .map(|attr| attr.value.to_string()),
        _ => None,
    };
    value
}

fn unescape_text(input: &str) -> Option<String> {
    let wrapped = input.replace('<', "&lt;");
    let dom = fragment_dom(&wrapped, &ParserConfig::default());
    let mut out = String::with_capacity(input.len());
    collect_text(&dom.document, &mut out);
    Some(out)
}

/// First element below the fragment's `html` wrapper.
fn first_element(document: &Handle) -> Option<Handle> {
    let html = document.children.borrow().first().cloned()?;
    let children = html.children.borrow();
    children
        .iter()
        .find(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
}

fn collect_text(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
            _ => collect_text(child, out),
        }
    }
}
