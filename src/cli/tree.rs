use std::path::PathBuf;

use clap::Parser;
use reqif::{
    Document,
    domain::{Identifiable, Specification},
};
use tracing::instrument;

use super::{show::name_of, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Print the hierarchy of each specification")]
pub struct Tree {
    /// The document
    file: PathBuf,

    /// Only print this specification
    specification: Option<String>,
}

impl Tree {
    #[instrument(level = "debug", skip(self, context))]
    pub fn run(self, context: &super::Context) -> anyhow::Result<()> {
        let package = context.load(&self.file)?;
        let document = &package.document;

        if let Some(identifier) = &self.specification {
            let Some(specification) = document.specification(identifier) else {
                anyhow::bail!("no specification with identifier {identifier}");
            };
            print!("{}", render(document, specification));
            return Ok(());
        }

        for specification in document.specifications() {
            print!("{}", render(document, specification));
        }
        Ok(())
    }
}

fn render(document: &Document, specification: &Specification) -> String {
    let mut out = format!(
        "{} {}\n",
        specification.display_name(),
        format!("({})", specification.identifier()).dim()
    );
    for (path, node) in specification.nodes() {
        let object = node.object.target().as_str();
        let indent = "  ".repeat(path.len());
        out.push_str(&format!(
            "{indent}{object}  {}\n",
            name_of(document, object)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use reqif::{codec, xml};

    use super::*;

    #[test]
    fn nodes_are_indented_by_depth() {
        let source = include_str!("../../tests/fixtures/xhtml.reqif");
        let document = codec::decode(&xml::parse(source.as_bytes()).unwrap()).unwrap();
        let specification = document.specification("SPEC-1").unwrap();

        let rendered = render(&document, specification);
        let lines: Vec<_> = rendered.lines().skip(1).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  SO-1"));
        assert!(lines[1].starts_with("    SO-2"));
    }
}
