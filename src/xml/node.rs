use std::{borrow::Cow, fmt};

use quick_xml::escape::{escape, partial_escape, unescape};

/// Namespace URI of XHTML content embedded in ReqIF attribute values.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Namespace URI bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A possibly prefixed XML name, exactly as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    prefix: Option<String>,
    local: String,
}

impl QName {
    /// An unprefixed name.
    #[must_use]
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    /// A name with the given namespace prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    /// Splits a qualified name at its first colon.
    #[must_use]
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, local)) => Self::with_prefix(prefix, local),
            None => Self::new(qualified),
        }
    }

    /// The prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The local part of the name.
    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// If this attribute name declares a namespace, the prefix it binds.
    ///
    /// `xmlns` binds the default namespace (`Some(None)`), `xmlns:p` binds `p`.
    #[must_use]
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        match (self.prefix.as_deref(), self.local.as_str()) {
            (None, "xmlns") => Some(None),
            (Some("xmlns"), prefix) => Some(Some(prefix)),
            _ => None,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// The quote character delimiting an attribute value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Quote {
    /// `"value"`
    #[default]
    Double,
    /// `'value'`
    Single,
}

impl Quote {
    /// The delimiter character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
        }
    }
}

/// An attribute with its value stored escaped, as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: QName,
    raw: String,
    quote: Quote,
}

impl Attribute {
    /// Creates an attribute from an unescaped value.
    #[must_use]
    pub fn new(name: QName, value: &str) -> Self {
        Self {
            name,
            raw: escape(value).into_owned(),
            quote: Quote::Double,
        }
    }

    pub(crate) const fn from_raw(name: QName, raw: String, quote: Quote) -> Self {
        Self { name, raw, quote }
    }

    /// The attribute name.
    #[must_use]
    pub const fn name(&self) -> &QName {
        &self.name
    }

    /// The value exactly as written, entity references included.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The quote character used in the source.
    #[must_use]
    pub const fn quote(&self) -> Quote {
        self.quote
    }

    /// The unescaped value.
    #[must_use]
    pub fn value(&self) -> Cow<'_, str> {
        unescape_lossless(&self.raw)
    }
}

/// A run of character data, stored escaped as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    raw: String,
}

impl Text {
    /// Creates a text node from an unescaped string.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self {
            raw: partial_escape(value).into_owned(),
        }
    }

    pub(crate) const fn from_raw(raw: String) -> Self {
        Self { raw }
    }

    pub(crate) fn push_raw(&mut self, raw: &str) {
        self.raw.push_str(raw);
    }

    /// The text exactly as written.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The unescaped text.
    #[must_use]
    pub fn value(&self) -> Cow<'_, str> {
        unescape_lossless(&self.raw)
    }

    /// Whether the run consists only of XML whitespace.
    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        self.raw
            .bytes()
            .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
    }
}

/// Raw values are validated at parse time, so unescaping cannot fail for
/// parsed content; hand-built values fall back to their raw text.
fn unescape_lossless(raw: &str) -> Cow<'_, str> {
    unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element.
    Element(Element),
    /// Character data.
    Text(Text),
    /// The content of a `<![CDATA[...]]>` section.
    CData(String),
    /// The content of a `<!--...-->` comment.
    Comment(String),
    /// The content of a `<?...?>` processing instruction.
    ProcessingInstruction(String),
    /// A complete `<!DOCTYPE ...>` declaration.
    DocType(String),
}

impl Node {
    /// The element, if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Whether this node carries character data.
    #[must_use]
    pub const fn is_text_like(&self) -> bool {
        matches!(self, Self::Text(_) | Self::CData(_))
    }

    pub(crate) fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(&text.value()),
            Self::CData(data) => out.push_str(data),
            Self::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
            Self::Comment(_) | Self::ProcessingInstruction(_) | Self::DocType(_) => {}
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Self::Text(text)
    }
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: QName,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    self_closing: bool,
    preserve: bool,
    verbatim: Option<String>,
}

impl Element {
    /// Creates an empty element. Empty elements render as `<NAME/>`.
    #[must_use]
    pub const fn new(name: QName) -> Self {
        Self {
            name,
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
            preserve: false,
            verbatim: None,
        }
    }

    /// The element name as written.
    #[must_use]
    pub const fn name(&self) -> &QName {
        &self.name
    }

    /// The local part of the element name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.local()
    }

    /// The namespace URI the name resolved to, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The first unprefixed attribute with the given name.
    #[must_use]
    pub fn attribute(&self, local: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.prefix().is_none() && a.name.local() == local)
    }

    /// Sets an attribute, replacing an existing one with the same name.
    pub fn set_attribute(&mut self, name: QName, value: &str) {
        let attribute = Attribute::new(name, value);
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            *existing = attribute;
        } else {
            self.attributes.push(attribute);
        }
    }

    /// Appends an attribute.
    pub fn push_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Child nodes in document order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable access to the children.
    ///
    /// This discards any verbatim source captured at parse time, so the
    /// element is re-rendered from its nodes.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        self.verbatim = None;
        &mut self.children
    }

    /// Appends a child node.
    pub fn push(&mut self, node: impl Into<Node>) {
        self.children_mut().push(node.into());
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// The first child element with the given local name.
    #[must_use]
    pub fn child(&self, local: &str) -> Option<&Self> {
        self.elements().find(|e| e.local_name() == local)
    }

    /// The unescaped character data of the whole subtree.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Whether an empty element renders as `<NAME/>` rather than
    /// `<NAME></NAME>`.
    #[must_use]
    pub const fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// Chooses between `<NAME/>` and `<NAME></NAME>` for an empty element.
    pub const fn set_self_closing(&mut self, self_closing: bool) {
        self.self_closing = self_closing;
    }

    /// Whether all whitespace below this element is significant.
    #[must_use]
    pub const fn preserves_whitespace(&self) -> bool {
        self.preserve
    }

    /// Marks the subtree as whitespace-significant; it is rendered without
    /// added indentation.
    pub const fn set_preserves_whitespace(&mut self, preserve: bool) {
        self.preserve = preserve;
    }

    /// The inner source captured at parse time, while the children remain
    /// untouched.
    #[must_use]
    pub fn verbatim(&self) -> Option<&str> {
        self.verbatim.as_deref()
    }

    pub(crate) fn set_verbatim(&mut self, verbatim: Option<String>) {
        self.verbatim = verbatim;
    }

    pub(crate) fn set_namespace(&mut self, namespace: Option<String>) {
        self.namespace = namespace;
    }

    /// Drops whitespace-only text from purely structural content.
    pub(crate) fn drop_structural_whitespace(&mut self) {
        let has_elements = self.children.iter().any(|c| matches!(c, Node::Element(_)));
        let only_whitespace = self.children.iter().all(|c| match c {
            Node::Text(text) => text.is_whitespace(),
            Node::CData(_) => false,
            _ => true,
        });
        if has_elements && only_whitespace {
            self.children.retain(|c| !matches!(c, Node::Text(_)));
        }
    }

    /// Calls `visit` on this element and every descendant element, in
    /// document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in self.elements() {
            child.walk(visit);
        }
    }

    fn resolve_namespaces(&mut self, scope: &mut NamespaceScope) {
        let mark = scope.declare(&self.attributes);
        self.namespace = scope.lookup(self.name.prefix());
        for child in &mut self.children {
            if let Node::Element(element) = child {
                element.resolve_namespaces(scope);
            }
        }
        scope.truncate(mark);
    }
}

/// Prefix bindings in effect at a point in the tree.
#[derive(Debug, Default)]
pub(crate) struct NamespaceScope {
    bindings: Vec<(Option<String>, String)>,
}

impl NamespaceScope {
    /// Pushes the declarations among `attributes`, returning the mark to
    /// truncate back to when the element closes.
    pub(crate) fn declare(&mut self, attributes: &[Attribute]) -> usize {
        let mark = self.bindings.len();
        for attribute in attributes {
            if let Some(prefix) = attribute.name.declared_prefix() {
                self.bindings
                    .push((prefix.map(str::to_owned), attribute.value().into_owned()));
            }
        }
        mark
    }

    pub(crate) fn lookup(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_owned());
        }
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    pub(crate) fn truncate(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }
}

/// Line ending used when regenerating structural whitespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The line ending characters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Indentation detected from a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// One level of indentation, or `None` for documents written without
    /// any whitespace between elements.
    pub indent: Option<String>,
    /// The line ending.
    pub line_ending: LineEnding,
}

impl Layout {
    /// Structural content written without whitespace.
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            indent: None,
            line_ending: LineEnding::Lf,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            indent: Some("  ".to_owned()),
            line_ending: LineEnding::Lf,
        }
    }
}

/// A complete XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTree {
    pub(crate) bom: bool,
    pub(crate) declaration: Option<String>,
    pub(crate) declaration_newline: bool,
    pub(crate) prolog: Vec<Node>,
    pub(crate) root: Element,
    pub(crate) epilog: Vec<Node>,
    pub(crate) layout: Layout,
    pub(crate) trailing_newline: bool,
}

impl XmlTree {
    /// A document with a standard UTF-8 declaration around `root`.
    #[must_use]
    pub fn new(root: Element) -> Self {
        let mut tree = Self {
            bom: false,
            declaration: Some(r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_owned()),
            declaration_newline: true,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
            layout: Layout::default(),
            trailing_newline: true,
        };
        tree.resolve_namespaces();
        tree
    }

    /// The root element.
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// Mutable access to the root element.
    pub const fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// The detected layout.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The XML declaration as written.
    #[must_use]
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    /// Comments, processing instructions and doctype before the root.
    #[must_use]
    pub fn prolog(&self) -> &[Node] {
        &self.prolog
    }

    /// Comments and processing instructions after the root.
    #[must_use]
    pub fn epilog(&self) -> &[Node] {
        &self.epilog
    }

    /// Recomputes the namespace URI of every element from the prefix
    /// declarations in scope.
    pub fn resolve_namespaces(&mut self) {
        self.root.resolve_namespaces(&mut NamespaceScope::default());
    }

    /// Everything but the root's content: declaration, prolog, epilog and
    /// layout, around an empty element with the root's name.
    pub(crate) fn shell(&self) -> Self {
        Self {
            bom: self.bom,
            declaration: self.declaration.clone(),
            declaration_newline: self.declaration_newline,
            prolog: self.prolog.clone(),
            root: Element::new(self.root.name.clone()),
            epilog: self.epilog.clone(),
            layout: self.layout.clone(),
            trailing_newline: self.trailing_newline,
        }
    }

    pub(crate) fn set_root(&mut self, root: Element) {
        self.root = root;
        self.resolve_namespaces();
    }
}
