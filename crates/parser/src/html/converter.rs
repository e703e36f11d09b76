//! Converter from the html5ever reference DOM to [`SanitizedNode`] trees
//!
//! Only elements are kept. Text, comments and doctypes carry nothing the
//! classifier inspects. Template contents are converted as children of their
//! `<template>` element so that nothing parked there goes unseen.

use citadel_security::SanitizedNode;
use markup5ever::{Attribute, QualName};
use markup5ever_rcdom::{Handle, NodeData};

use crate::config::ParserConfig;
use crate::metrics::DocumentMetrics;

/// Convert an rcdom document or fragment into a `#document` rooted tree
pub fn rcdom_to_sanitized(
    document: &Handle,
    config: &ParserConfig,
    metrics: &DocumentMetrics,
) -> SanitizedNode {
    let mut root = SanitizedNode::document();
    append_children(document, &mut root, 1, config, metrics);
    root
}

fn append_children(
    handle: &Handle,
    parent: &mut SanitizedNode,
    depth: usize,
    config: &ParserConfig,
    metrics: &DocumentMetrics,
) {
    for child in handle.children.borrow().iter() {
        append_node(child, parent, depth, config, metrics);
    }
}

fn append_node(
    handle: &Handle,
    parent: &mut SanitizedNode,
    depth: usize,
    config: &ParserConfig,
    metrics: &DocumentMetrics,
) {
    match handle.data {
        NodeData::Element {
            ref name,
            ref attrs,
            ref template_contents,
            ..
        } => {
            let mut node = convert_element(name, &attrs.borrow(), metrics);
            if depth >= config.max_nesting_depth() {
                // Prevent deep recursion: keep every descendant, one level down
                tracing::warn!("Maximum DOM depth {} reached, flattening subtree", depth);
                flatten_descendants(handle, &mut node, metrics);
            } else {
                append_children(handle, &mut node, depth + 1, config, metrics);
                if let Some(contents) = template_contents.borrow().as_ref() {
                    append_children(contents, &mut node, depth + 1, config, metrics);
                }
            }
            parent.push_child(node);
        }
        NodeData::Document => append_children(handle, parent, depth, config, metrics),
        _ => {}
    }
}

/// Appends every element below `handle` directly to `node`, in document order.
fn flatten_descendants(handle: &Handle, node: &mut SanitizedNode, metrics: &DocumentMetrics) {
    let mut stack: Vec<Handle> = child_handles(handle);
    stack.reverse();
    while let Some(current) = stack.pop() {
        if let NodeData::Element {
            ref name, ref attrs, ..
        } = current.data
        {
            node.push_child(convert_element(name, &attrs.borrow(), metrics));
            metrics.increment_flattened();
        }
        let mut children = child_handles(&current);
        children.reverse();
        stack.extend(children);
    }
}

/// Children of a node, followed by template contents when it has any.
fn child_handles(handle: &Handle) -> Vec<Handle> {
    let mut children: Vec<Handle> = handle.children.borrow().iter().cloned().collect();
    if let NodeData::Element {
        ref template_contents,
        ..
    } = handle.data
    {
        if let Some(contents) = template_contents.borrow().as_ref() {
            children.extend(contents.children.borrow().iter().cloned());
        }
    }
    children
}

fn convert_element(name: &QualName, attrs: &[Attribute], metrics: &DocumentMetrics) -> SanitizedNode {
    metrics.increment_elements();
    metrics.add_attributes(attrs.len());

    let mut node = SanitizedNode::new(name.local.to_string());
    for attr in attrs {
        node.set_attribute(attribute_name(&attr.name), attr.value.to_string());
    }
    node
}

/// `prefix:local` for namespaced attributes such as `xlink:href`.
fn attribute_name(name: &QualName) -> String {
    match name.prefix {
        Some(ref prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}
