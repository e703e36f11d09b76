//! Owned element tree handed to the classifier.
//!
//! Parsers convert whatever tree they build into a [`SanitizedNode`] so the
//! classification rules never depend on a particular DOM implementation.

use std::fmt::Write as _;

/// An element of a sanitized document.
///
/// Attribute names compare case-insensitively. Setting an attribute that
/// already exists replaces its value in place, so the first occurrence keeps
/// its position and the last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SanitizedNode {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<SanitizedNode>,
}

impl SanitizedNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Root node used for whole documents and fragments.
    pub fn document() -> Self {
        Self::new("#document")
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: SanitizedNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn push_child(&mut self, child: SanitizedNode) {
        self.children.push(child);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[SanitizedNode] {
        &self.children
    }

    /// Pre-order traversal starting with `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Number of nodes in the tree, including `self`.
    pub fn node_count(&self) -> usize {
        self.descendants().count()
    }

    /// Indented dump of tags and attributes, one line each.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            let _ = writeln!(out, "{}TAG: {}", indent, node.tag);
            for (name, value) in node.attributes() {
                let _ = writeln!(out, "{}  {} = {:?}", indent, name, value);
            }
            for child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

/// Iterator returned by [`SanitizedNode::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a SanitizedNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SanitizedNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
