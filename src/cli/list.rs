use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use reqif::{Document, domain::Identifiable};
use serde::Serialize;
use tracing::instrument;

use super::{show::name_of, terminal::print_table};

/// Command arguments for `reqif list`.
#[derive(Debug, Parser)]
#[command(about = "List the elements of a document")]
pub struct List {
    /// The document
    file: PathBuf,

    /// What to list (default: objects).
    #[arg(long, value_enum, default_value_t)]
    what: What,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum What {
    /// Spec objects
    #[default]
    Objects,
    /// Spec relations
    Relations,
    /// Spec types
    Types,
    /// Datatype definitions
    Datatypes,
    /// Specifications
    Specifications,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl List {
    #[instrument(level = "debug", skip(self, context))]
    pub fn run(self, context: &super::Context) -> anyhow::Result<()> {
        let package = context.load(&self.file)?;
        let document = &package.document;

        match self.output {
            OutputFormat::Json => {
                render_json(document, self.what)?;
            }
            OutputFormat::Table => {
                let (headers, rows) = table(document, self.what);
                if self.quiet {
                    for row in rows {
                        println!("{}", row.join("\t"));
                    }
                } else {
                    print_table(headers, &rows, |_, cell| cell.to_owned());
                }
            }
        }
        Ok(())
    }
}

fn render_json(document: &Document, what: What) -> anyhow::Result<()> {
    fn write(value: &impl Serialize) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(std::io::stdout(), value)
            .context("failed to render json output")?;
        println!();
        Ok(())
    }

    match what {
        What::Objects => write(document.spec_objects()),
        What::Relations => write(document.spec_relations()),
        What::Types => write(document.spec_types()),
        What::Datatypes => write(document.datatypes()),
        What::Specifications => write(document.specifications()),
    }
}

fn table(document: &Document, what: What) -> (&'static [&'static str], Vec<Vec<String>>) {
    let name = |identifier: &str| name_of(document, identifier).to_owned();
    match what {
        What::Objects => (
            &["ID", "NAME", "TYPE", "CHANGED"],
            document
                .spec_objects()
                .iter()
                .map(|object| {
                    vec![
                        object.identifier().to_string(),
                        object.display_name().to_owned(),
                        name(object.spec_type.target().as_str()),
                        object.metadata.last_change.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
        What::Relations => (
            &["ID", "TYPE", "SOURCE", "TARGET"],
            document
                .spec_relations()
                .iter()
                .map(|relation| {
                    vec![
                        relation.identifier().to_string(),
                        name(relation.spec_type.target().as_str()),
                        relation.source.target().to_string(),
                        relation.target.target().to_string(),
                    ]
                })
                .collect(),
        ),
        What::Types => (
            &["ID", "NAME", "DESCRIBES", "ATTRIBUTES"],
            document
                .spec_types()
                .iter()
                .map(|spec_type| {
                    vec![
                        spec_type.identifier().to_string(),
                        spec_type.display_name().to_owned(),
                        spec_type.kind.to_string(),
                        spec_type.attributes.len().to_string(),
                    ]
                })
                .collect(),
        ),
        What::Datatypes => (
            &["ID", "NAME", "VALUES"],
            document
                .datatypes()
                .iter()
                .map(|datatype| {
                    vec![
                        datatype.identifier().to_string(),
                        datatype.display_name().to_owned(),
                        datatype.value_kind().to_string(),
                    ]
                })
                .collect(),
        ),
        What::Specifications => (
            &["ID", "NAME", "TYPE", "NODES"],
            document
                .specifications()
                .iter()
                .map(|specification| {
                    vec![
                        specification.identifier().to_string(),
                        specification.display_name().to_owned(),
                        name(specification.spec_type.target().as_str()),
                        specification.nodes().len().to_string(),
                    ]
                })
                .collect(),
        ),
    }
}
