use super::node::{Element, Layout, Node, XmlTree};

/// Renders a document to UTF-8 bytes.
#[must_use]
pub fn render(tree: &XmlTree) -> Vec<u8> {
    render_to_string(tree).into_bytes()
}

/// Renders a document.
///
/// Structural content (elements whose children are all elements, comments or
/// processing instructions) is laid out one child per line using the tree's
/// [`Layout`]. Elements with character data, and whitespace-significant
/// subtrees, are written exactly as stored.
#[must_use]
pub fn render_to_string(tree: &XmlTree) -> String {
    let mut renderer = Renderer::new(&tree.layout);
    let newline = tree.layout.line_ending.as_str();

    if tree.bom {
        renderer.out.push('\u{FEFF}');
    }
    if let Some(declaration) = &tree.declaration {
        renderer.out.push_str(declaration);
        if tree.declaration_newline {
            renderer.out.push_str(newline);
        }
    }
    for node in &tree.prolog {
        renderer.node(node, 0, false);
        renderer.out.push_str(newline);
    }
    renderer.element(&tree.root, 0, false);
    for node in &tree.epilog {
        renderer.out.push_str(newline);
        renderer.node(node, 0, false);
    }
    if tree.trailing_newline {
        renderer.out.push_str(newline);
    }
    renderer.out
}

/// Renders nodes inline, without added whitespace.
#[must_use]
pub fn render_nodes(nodes: &[Node]) -> String {
    let layout = Layout::default();
    let mut renderer = Renderer::new(&layout);
    for node in nodes {
        renderer.node(node, 0, true);
    }
    renderer.out
}

struct Renderer<'a> {
    out: String,
    layout: &'a Layout,
}

impl<'a> Renderer<'a> {
    const fn new(layout: &'a Layout) -> Self {
        Self {
            out: String::new(),
            layout,
        }
    }

    fn newline(&mut self, depth: usize) {
        let Some(indent) = &self.layout.indent else {
            return;
        };
        self.out.push_str(self.layout.line_ending.as_str());
        for _ in 0..depth {
            self.out.push_str(indent);
        }
    }

    fn node(&mut self, node: &Node, depth: usize, inline: bool) {
        match node {
            Node::Element(element) => self.element(element, depth, inline),
            Node::Text(text) => self.out.push_str(text.raw()),
            Node::CData(data) => {
                self.out.push_str("<![CDATA[");
                self.out.push_str(data);
                self.out.push_str("]]>");
            }
            Node::Comment(comment) => {
                self.out.push_str("<!--");
                self.out.push_str(comment);
                self.out.push_str("-->");
            }
            Node::ProcessingInstruction(instruction) => {
                self.out.push_str("<?");
                self.out.push_str(instruction);
                self.out.push_str("?>");
            }
            Node::DocType(doctype) => self.out.push_str(doctype),
        }
    }

    fn element(&mut self, element: &Element, depth: usize, inline: bool) {
        let name = element.name().to_string();
        self.out.push('<');
        self.out.push_str(&name);
        for attribute in element.attributes() {
            let quote = attribute.quote().as_char();
            self.out.push(' ');
            self.out.push_str(&attribute.name().to_string());
            self.out.push('=');
            self.out.push(quote);
            self.out.push_str(attribute.raw());
            self.out.push(quote);
        }

        let children = element.children();
        if children.is_empty() {
            if element.is_self_closing() {
                self.out.push_str("/>");
            } else {
                self.out.push_str("></");
                self.out.push_str(&name);
                self.out.push('>');
            }
            return;
        }

        self.out.push('>');
        if let Some(verbatim) = element.verbatim() {
            self.out.push_str(verbatim);
        } else if inline
            || element.preserves_whitespace()
            || children.iter().any(Node::is_text_like)
        {
            for child in children {
                self.node(child, depth + 1, true);
            }
        } else {
            for child in children {
                self.newline(depth + 1);
                self.node(child, depth + 1, false);
            }
            self.newline(depth);
        }
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::super::parse::parse;
    use super::*;

    #[test_case("<R/>\n"; "self closing root")]
    #[test_case("<R></R>"; "explicit empty root without trailing newline")]
    #[test_case("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<R>\n  <A X='1' Y=\"2\"/>\n  <B>t &amp; u</B>\n</R>\n"; "declaration and indentation")]
    #[test_case("<R>\n\t<A>\n\t\t<B/>\n\t</A>\n</R>\n"; "tab indentation")]
    #[test_case("<R>\r\n  <A/>\r\n</R>\r\n"; "crlf line endings")]
    #[test_case("<!-- lead -->\n<R>\n  <!-- inner -->\n  <A/>\n</R>\n<!-- tail -->\n"; "comments")]
    #[test_case("<R>mixed <b>content</b> kept\n  exactly </R>\n"; "mixed content")]
    #[test_case("<R xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n  <THE-VALUE><xhtml:div  class = 'a'>\n x<xhtml:br/>\n</xhtml:div></THE-VALUE>\n</R>\n"; "verbatim xhtml")]
    #[test_case("<R><![CDATA[<raw> & text]]></R>\n"; "cdata")]
    #[test_case("<?xml version=\"1.0\"?><R><A><B/></A><C/></R>"; "compact document")]
    fn renders_source_unchanged(source: &str) {
        let tree = parse(source.as_bytes()).unwrap();
        assert_eq!(render_to_string(&tree), source);
    }

    #[test]
    fn edited_verbatim_content_is_rendered_from_nodes() {
        let source = "<R><THE-VALUE><p  a='1'>x</p></THE-VALUE></R>";
        let mut tree = parse(source.as_bytes()).unwrap();
        let Node::Element(value) = &mut tree.root_mut().children_mut()[0] else {
            panic!("expected THE-VALUE");
        };
        value.children_mut();
        assert_eq!(
            render_to_string(&tree),
            "<R><THE-VALUE><p a='1'>x</p></THE-VALUE></R>"
        );
    }

    #[test]
    fn render_nodes_is_inline() {
        let tree = parse(b"<R>\n  <A>\n    <B/>\n  </A>\n</R>").unwrap();
        assert_eq!(render_nodes(tree.root().children()), "<A><B/></A>");
    }
}
