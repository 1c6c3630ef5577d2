use std::borrow::Cow;

use serde::{Serialize, Serializer};

use super::OpaqueExtra;
use crate::xml::{self, Element, Node, ParseError};

/// The XHTML content of a `THE-VALUE` or `THE-ORIGINAL-VALUE` element.
///
/// Holds the parsed nodes for display and editing, and the markup exactly as
/// it was written. The markup is re-emitted untouched until the nodes are
/// edited through [`XhtmlContent::nodes_mut`] or [`XhtmlContent::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XhtmlContent {
    pub(crate) extra: OpaqueExtra,
    nodes: Vec<Node>,
    source: Option<String>,
}

impl XhtmlContent {
    /// Parses a markup fragment such as `<xhtml:div>text</xhtml:div>`.
    ///
    /// Unprefixed elements are in the XHTML namespace, and the `xhtml`
    /// prefix is bound to it.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the markup is not well formed.
    pub fn parse(markup: &str) -> Result<Self, ParseError> {
        Ok(Self {
            extra: OpaqueExtra::default(),
            nodes: xml::parse_fragment(markup)?,
            source: Some(markup.to_owned()),
        })
    }

    pub(crate) const fn from_parts(
        extra: OpaqueExtra,
        nodes: Vec<Node>,
        source: Option<String>,
    ) -> Self {
        Self {
            extra,
            nodes,
            source,
        }
    }

    /// The parsed content.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable access to the parsed content.
    ///
    /// The content will be re-serialized from the nodes, which normalizes
    /// whitespace inside tags.
    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        self.source = None;
        &mut self.nodes
    }

    /// Replaces the content with new markup.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the markup is not well formed. The content
    /// is unchanged on error.
    pub fn replace(&mut self, markup: &str) -> Result<(), ParseError> {
        self.nodes = xml::parse_fragment(markup)?;
        self.source = Some(markup.to_owned());
        Ok(())
    }

    /// Whether the content has been edited since it was read.
    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.source.is_none()
    }

    pub(crate) fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The serialized markup.
    #[must_use]
    pub fn markup(&self) -> Cow<'_, str> {
        self.source
            .as_deref()
            .map_or_else(|| Cow::Owned(xml::render_nodes(&self.nodes)), Cow::Borrowed)
    }

    /// The plain text of the content, for search and display.
    ///
    /// Runs of whitespace are collapsed to a single space.
    #[must_use]
    pub fn text(&self) -> String {
        let mut raw = String::new();
        for node in &self.nodes {
            collect_text(node, &mut raw);
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Relative paths of files the content refers to.
    #[must_use]
    pub fn links(&self) -> Vec<String> {
        let mut links = Vec::new();
        for node in &self.nodes {
            if let Node::Element(element) = node {
                collect_links(element, &mut links);
            }
        }
        links
    }
}

/// Block elements separate words even without whitespace between them.
fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => {
            for child in element.children() {
                collect_text(child, out);
            }
            if matches!(
                element.local_name(),
                "p" | "div" | "br" | "li" | "tr" | "td" | "th" | "h1" | "h2" | "h3" | "h4" | "h5"
                    | "h6"
            ) {
                out.push(' ');
            }
        }
        other => other.collect_text(out),
    }
}

/// Collects `object@data`, `img@src` and `a@href` values that point at a
/// file next to the document.
pub(crate) fn collect_links(element: &Element, out: &mut Vec<String>) {
    element.walk(&mut |element| {
        let attribute = match element.local_name() {
            "object" => "data",
            "img" => "src",
            "a" => "href",
            _ => return,
        };
        if let Some(value) = element.attribute(attribute) {
            let value = value.value();
            if is_relative_link(&value) && !out.iter().any(|link| *link == value) {
                out.push(value.into_owned());
            }
        }
    });
}

fn is_relative_link(link: &str) -> bool {
    !(link.is_empty()
        || link.starts_with('#')
        || link.starts_with('/')
        || link.starts_with('\\')
        || link.contains("://")
        || link.starts_with("mailto:")
        || link.starts_with("data:"))
}

impl Serialize for XhtmlContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.markup())
    }
}
