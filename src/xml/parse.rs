use quick_xml::{
    Reader,
    escape::unescape,
    events::{BytesStart, Event},
};

use super::node::{
    Attribute, Element, Layout, LineEnding, NamespaceScope, Node, QName, Quote, Text,
    XHTML_NAMESPACE, XmlTree,
};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Options controlling which subtrees keep all their whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Local names of elements whose content is whitespace-significant.
    ///
    /// XHTML-namespace elements and elements carrying `xml:space="preserve"`
    /// are always whitespace-significant.
    pub preserve_whitespace_in: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            preserve_whitespace_in: vec![
                "THE-VALUE".to_owned(),
                "THE-ORIGINAL-VALUE".to_owned(),
                "REQ-IF-TOOL-EXTENSION".to_owned(),
            ],
        }
    }
}

/// Malformed XML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column} (byte {offset}): `{snippet}`")]
pub struct ParseError {
    /// Byte offset into the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
    /// What went wrong.
    pub message: String,
    /// The source line around the offset.
    pub snippet: String,
}

impl ParseError {
    fn at(text: &str, offset: usize, base: usize, message: impl Into<String>) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        let line_end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
        let snippet = text[line_start..line_end].trim().chars().take(80).collect();
        Self {
            offset: offset + base,
            line,
            column,
            message: message.into(),
            snippet,
        }
    }
}

/// Parses a document with the default [`ParseOptions`].
///
/// # Errors
///
/// Returns a [`ParseError`] if the input is not well-formed UTF-8 XML.
pub fn parse(bytes: &[u8]) -> Result<XmlTree, ParseError> {
    parse_with(bytes, &ParseOptions::default())
}

/// Parses a document.
///
/// # Errors
///
/// Returns a [`ParseError`] if the input is not well-formed XML, is not
/// valid UTF-8, or declares an encoding other than UTF-8.
pub fn parse_with(bytes: &[u8], options: &ParseOptions) -> Result<XmlTree, ParseError> {
    let (bom, body) = bytes
        .strip_prefix(BOM)
        .map_or((false, bytes), |rest| (true, rest));
    let base = if bom { BOM.len() } else { 0 };

    let text = std::str::from_utf8(body).map_err(|error| {
        let valid = std::str::from_utf8(&body[..error.valid_up_to()]).unwrap_or_default();
        ParseError::at(valid, valid.len(), base, "invalid UTF-8")
    })?;

    let mut builder = Builder::new(text, base, options);
    builder.run()?;
    builder.finish(bom)
}

/// Parses a sequence of nodes, such as the body of an XHTML value.
///
/// The `xhtml` prefix and the default namespace are bound to XHTML while
/// parsing. All whitespace is kept.
///
/// # Errors
///
/// Returns a [`ParseError`] if the fragment is not well-formed.
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, ParseError> {
    const OPEN: &str = r#"<fragment xmlns="http://www.w3.org/1999/xhtml" xmlns:xhtml="http://www.w3.org/1999/xhtml">"#;
    let wrapped = format!("{OPEN}{markup}</fragment>");
    let options = ParseOptions {
        preserve_whitespace_in: vec!["fragment".to_owned()],
    };
    let mut builder = Builder::new(&wrapped, 0, &options);
    builder.run().map_err(|mut error| {
        error.offset = error.offset.saturating_sub(OPEN.len());
        error
    })?;
    let tree = builder.finish(false)?;
    let mut root = tree.root;
    Ok(std::mem::take(root.children_mut()))
}

struct Frame {
    element: Element,
    preserve: bool,
    verbatim_root: bool,
    content_start: usize,
    scope_mark: usize,
}

struct Builder<'a> {
    text: &'a str,
    base: usize,
    options: &'a ParseOptions,
    stack: Vec<Frame>,
    scope: NamespaceScope,
    declaration: Option<String>,
    declaration_newline: bool,
    prolog: Vec<Node>,
    root: Option<Element>,
    epilog: Vec<Node>,
    layout: Option<Layout>,
}

impl<'a> Builder<'a> {
    fn new(text: &'a str, base: usize, options: &'a ParseOptions) -> Self {
        Self {
            text,
            base,
            options,
            stack: Vec::new(),
            scope: NamespaceScope::default(),
            declaration: None,
            declaration_newline: false,
            prolog: Vec::new(),
            root: None,
            epilog: Vec::new(),
            layout: None,
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.text, offset, self.base, message)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        self.text.get(start..end).unwrap_or_default()
    }

    fn run(&mut self) -> Result<(), ParseError> {
        let mut reader = Reader::from_str(self.text);
        loop {
            let start = position(reader.buffer_position());
            let event = reader
                .read_event()
                .map_err(|e| self.error(position(reader.error_position()), e.to_string()))?;
            let end = position(reader.buffer_position());

            match event {
                Event::Decl(decl) => {
                    if let Some(encoding) = decl.encoding() {
                        let encoding = encoding.map_err(|e| self.error(start, e.to_string()))?;
                        let encoding = String::from_utf8_lossy(&encoding);
                        if !is_utf8(&encoding) {
                            return Err(self.error(
                                start,
                                format!("unsupported encoding {encoding:?}, only UTF-8 is supported"),
                            ));
                        }
                    }
                    self.declaration = Some(self.slice(start, end).to_owned());
                    self.declaration_newline = self.text[end..].starts_with(['\r', '\n']);
                }
                Event::Start(tag) => {
                    let frame = self.open(&tag, start, end)?;
                    self.stack.push(frame);
                }
                Event::Empty(tag) => {
                    let mut frame = self.open(&tag, start, end)?;
                    frame.element.set_self_closing(true);
                    self.scope.truncate(frame.scope_mark);
                    self.attach(Node::Element(frame.element), start)?;
                }
                Event::End(_) => self.close(start)?,
                Event::Text(text) => {
                    let raw = std::str::from_utf8(&text)
                        .map_err(|_| self.error(start, "invalid UTF-8 in text"))?;
                    self.push_text(raw, start)?;
                }
                Event::GeneralRef(_) => {
                    let raw = self.slice(start, end);
                    if unescape(raw).is_err() {
                        return Err(self.error(start, format!("undefined entity reference {raw}")));
                    }
                    self.push_text(raw, start)?;
                }
                Event::CData(_) => {
                    let inner = self.slice(start + "<![CDATA[".len(), end.saturating_sub(3));
                    self.attach(Node::CData(inner.to_owned()), start)?;
                }
                Event::Comment(_) => {
                    let inner = self.slice(start + "<!--".len(), end.saturating_sub(3));
                    self.attach(Node::Comment(inner.to_owned()), start)?;
                }
                Event::PI(_) => {
                    let inner = self.slice(start + 2, end.saturating_sub(2));
                    self.attach(Node::ProcessingInstruction(inner.to_owned()), start)?;
                }
                Event::DocType(_) => {
                    if self.root.is_some() || !self.stack.is_empty() {
                        return Err(self.error(start, "DOCTYPE after the root element"));
                    }
                    self.prolog.push(Node::DocType(self.slice(start, end).to_owned()));
                }
                Event::Eof => break,
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        if let Some(frame) = self.stack.last() {
            return Err(self.error(
                self.text.len(),
                format!("unclosed element <{}>", frame.element.name()),
            ));
        }
        Ok(())
    }

    fn open(&mut self, tag: &BytesStart<'_>, start: usize, end: usize) -> Result<Frame, ParseError> {
        let qualified = tag.name();
        let name = std::str::from_utf8(qualified.as_ref())
            .map_err(|_| self.error(start, "invalid UTF-8 in element name"))?;
        let mut element = Element::new(QName::parse(name));

        let quotes = scan_quotes(tag);
        for (index, attribute) in tag.attributes().enumerate() {
            let attribute = attribute.map_err(|e| self.error(start, e.to_string()))?;
            let key = std::str::from_utf8(attribute.key.as_ref())
                .map_err(|_| self.error(start, "invalid UTF-8 in attribute name"))?;
            let raw = std::str::from_utf8(&attribute.value)
                .map_err(|_| self.error(start, "invalid UTF-8 in attribute value"))?;
            if let Err(error) = unescape(raw) {
                return Err(self.error(start, format!("attribute {key}: {error}")));
            }
            let quote = quotes.get(index).copied().unwrap_or_default();
            element.push_attribute(Attribute::from_raw(QName::parse(key), raw.to_owned(), quote));
        }

        let scope_mark = self.scope.declare(element.attributes());
        let namespace = self.scope.lookup(element.name().prefix());

        let parent_preserve = self.stack.last().is_some_and(|frame| frame.preserve);
        let wants_preserve = namespace.as_deref() == Some(XHTML_NAMESPACE)
            || self
                .options
                .preserve_whitespace_in
                .iter()
                .any(|local| local == element.local_name())
            || element.attributes().iter().any(|a| {
                a.name().prefix() == Some("xml") && a.name().local() == "space" && a.value() == "preserve"
            });
        let preserve = parent_preserve || wants_preserve;
        let verbatim_root = preserve && !parent_preserve;

        element.set_namespace(namespace);
        element.set_preserves_whitespace(verbatim_root);
        element.set_self_closing(false);

        if self.layout.is_none() && self.stack.len() == 1 {
            self.layout = Some(detect_layout(&self.stack[0].element));
        }

        Ok(Frame {
            element,
            preserve,
            verbatim_root,
            content_start: end,
            scope_mark,
        })
    }

    fn close(&mut self, start: usize) -> Result<(), ParseError> {
        let Some(frame) = self.stack.pop() else {
            return Err(self.error(start, "end tag without matching start tag"));
        };
        let Frame {
            mut element,
            preserve,
            verbatim_root,
            content_start,
            scope_mark,
        } = frame;

        if verbatim_root && !element.children().is_empty() {
            element.set_verbatim(Some(self.slice(content_start, start).to_owned()));
        }
        if !preserve {
            element.drop_structural_whitespace();
        }
        self.scope.truncate(scope_mark);
        self.attach(Node::Element(element), start)
    }

    fn push_text(&mut self, raw: &str, start: usize) -> Result<(), ParseError> {
        if self.stack.is_empty() {
            if raw.bytes().all(|b| b.is_ascii_whitespace()) {
                return Ok(());
            }
            return Err(self.error(start, "text outside the root element"));
        }
        let Some(frame) = self.stack.last_mut() else {
            return Ok(());
        };
        // verbatim source is only captured once a frame closes
        let children = frame.element.children_mut();
        if let Some(Node::Text(text)) = children.last_mut() {
            text.push_raw(raw);
        } else {
            children.push(Node::Text(Text::from_raw(raw.to_owned())));
        }
        Ok(())
    }

    fn attach(&mut self, node: Node, start: usize) -> Result<(), ParseError> {
        if let Some(frame) = self.stack.last_mut() {
            frame.element.children_mut().push(node);
            return Ok(());
        }
        match node {
            Node::Element(element) => {
                if self.root.is_some() {
                    return Err(self.error(start, "more than one root element"));
                }
                self.root = Some(element);
            }
            Node::Text(_) | Node::CData(_) => {
                return Err(self.error(start, "character data outside the root element"));
            }
            other if self.root.is_none() => self.prolog.push(other),
            other => self.epilog.push(other),
        }
        Ok(())
    }

    fn finish(self, bom: bool) -> Result<XmlTree, ParseError> {
        let Some(root) = self.root else {
            return Err(self.error(self.text.len(), "no root element"));
        };
        let layout = match self.layout {
            Some(layout) => layout,
            None => Layout {
                line_ending: if self.text.contains("\r\n") {
                    LineEnding::CrLf
                } else {
                    LineEnding::Lf
                },
                ..Layout::default()
            },
        };
        Ok(XmlTree {
            bom,
            declaration: self.declaration,
            declaration_newline: self.declaration_newline,
            prolog: self.prolog,
            root,
            epilog: self.epilog,
            layout,
            trailing_newline: self.text.ends_with('\n'),
        })
    }
}

fn position(offset: u64) -> usize {
    usize::try_from(offset).unwrap_or(usize::MAX)
}

fn is_utf8(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}

/// Opening quote characters of each attribute value in a start tag, in
/// order. Quotes never appear in names, so every quote outside a value
/// opens the next one.
fn scan_quotes(tag: &BytesStart<'_>) -> Vec<Quote> {
    let mut quotes = Vec::new();
    let mut open: Option<u8> = None;
    let bytes: &[u8] = tag;
    for &byte in bytes {
        match open {
            Some(quote) if byte == quote => open = None,
            Some(_) => {}
            None if byte == b'"' => {
                quotes.push(Quote::Double);
                open = Some(byte);
            }
            None if byte == b'\'' => {
                quotes.push(Quote::Single);
                open = Some(byte);
            }
            None => {}
        }
    }
    quotes
}

/// The whitespace before the root's first child element is the first
/// indentation in the document.
fn detect_layout(root: &Element) -> Layout {
    let text = match root.children().last() {
        None => return Layout::compact(),
        Some(Node::Text(text)) => text,
        Some(_) => return Layout::default(),
    };
    let raw = text.raw();
    if !text.is_whitespace() || !raw.contains('\n') {
        return Layout::default();
    }
    let indent = raw.rsplit('\n').next().unwrap_or_default().to_owned();
    let line_ending = if raw.contains("\r\n") {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    };
    Layout {
        indent: Some(indent),
        line_ending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ROOT xmlns=\"urn:r\" xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n    <A ID='one' NAME=\"x &amp; y\"/>\n    <B>text</B>\n</ROOT>\n";

    #[test]
    fn parses_structure_and_drops_layout_whitespace() {
        let tree = parse(SIMPLE.as_bytes()).unwrap();
        let root = tree.root();
        assert_eq!(root.local_name(), "ROOT");
        assert_eq!(root.children().len(), 2);
        assert_eq!(tree.layout().indent.as_deref(), Some("    "));
        assert!(tree.trailing_newline);
    }

    #[test]
    fn keeps_attribute_quotes_and_raw_values() {
        let tree = parse(SIMPLE.as_bytes()).unwrap();
        let a = tree.root().child("A").unwrap();
        assert!(a.is_self_closing());
        assert_eq!(a.attribute("ID").unwrap().quote(), Quote::Single);
        let name = a.attribute("NAME").unwrap();
        assert_eq!(name.raw(), "x &amp; y");
        assert_eq!(name.value(), "x & y");
        assert_eq!(a.namespace(), Some("urn:r"));
    }

    #[test]
    fn entity_references_join_the_surrounding_text() {
        let tree = parse(b"<R>a &lt; b&#10;c</R>").unwrap();
        let [Node::Text(text)] = tree.root().children() else {
            panic!("expected a single text node");
        };
        assert_eq!(text.raw(), "a &lt; b&#10;c");
        assert_eq!(text.value(), "a < b\nc");
    }

    #[test]
    fn xhtml_content_is_kept_verbatim() {
        let source = "<R xmlns:xhtml=\"http://www.w3.org/1999/xhtml\"><THE-VALUE>\n  <xhtml:div>a <xhtml:b>b</xhtml:b>  </xhtml:div>\n</THE-VALUE></R>";
        let tree = parse(source.as_bytes()).unwrap();
        let value = tree.root().child("THE-VALUE").unwrap();
        assert!(value.preserves_whitespace());
        assert_eq!(
            value.verbatim(),
            Some("\n  <xhtml:div>a <xhtml:b>b</xhtml:b>  </xhtml:div>\n")
        );
        assert_eq!(value.children().len(), 3);
    }

    #[test]
    fn reports_position_of_mismatched_tags() {
        let error = parse(b"<R>\n  <A></B>\n</R>").unwrap_err();
        assert_eq!(error.line, 2);
        assert!(error.snippet.contains("<A></B>"));
    }

    #[test]
    fn reports_unclosed_elements() {
        assert!(parse(b"<R><A>").is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        let error = parse(b"<R>\xFF</R>").unwrap_err();
        assert_eq!(error.offset, 3);
        assert_eq!(error.message, "invalid UTF-8");
    }

    #[test]
    fn rejects_non_utf8_declarations() {
        let error = parse(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><R/>").unwrap_err();
        assert!(error.message.contains("ISO-8859-1"), "{error}");
    }

    #[test]
    fn rejects_undefined_entities() {
        assert!(parse(b"<R>&nbsp;</R>").is_err());
        assert!(parse(b"<R A=\"&bogus;\"/>").is_err());
    }

    #[test]
    fn rejects_text_outside_root() {
        assert!(parse(b"<R/>trailing").is_err());
        assert!(parse(b"<R/><S/>").is_err());
    }

    #[test]
    fn byte_order_mark_is_recorded() {
        let tree = parse(b"\xEF\xBB\xBF<R/>").unwrap();
        assert!(tree.bom);
    }

    #[test]
    fn fragments_bind_the_xhtml_prefix() {
        let nodes = parse_fragment("<xhtml:p>one</xhtml:p> <xhtml:p>two</xhtml:p>").unwrap();
        assert_eq!(nodes.len(), 3);
        let first = nodes[0].as_element().unwrap();
        assert_eq!(first.namespace(), Some(XHTML_NAMESPACE));
    }
}
