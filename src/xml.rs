//! Order-preserving XML tree.
//!
//! The tree is the substrate for both the typed ReqIF model and the opaque
//! passthrough of anything the model does not recognise. It keeps element
//! and attribute order, namespace prefixes as written, attribute quote
//! characters and the escaped form of every text run, so that rendering a
//! parsed tree reproduces its source.
//!
//! Whitespace-only text between structural elements is dropped on parse and
//! regenerated from the detected [`Layout`] on render. Subtrees that carry
//! significant whitespace (XHTML content, tool extensions, anything marked
//! `xml:space="preserve"`) are kept verbatim.

mod node;
mod parse;
mod render;

pub use node::{
    Attribute, Element, Layout, LineEnding, Node, QName, Quote, Text, XmlTree, XHTML_NAMESPACE,
    XML_NAMESPACE,
};
pub(crate) use node::NamespaceScope;
pub use parse::{parse, parse_fragment, parse_with, ParseError, ParseOptions};
pub use render::{render, render_nodes, render_to_string};
