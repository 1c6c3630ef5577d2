use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use reqif::domain::{Identifiable, Reference, SpecRelation, TraceGraph};
use serde::Serialize;
use tracing::instrument;

use super::{show::name_of, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Show the relations of a spec object")]
pub struct Trace {
    /// The document
    file: PathBuf,

    /// The spec object to trace
    object: String,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Serialize)]
struct Link<'a> {
    relation: &'a str,
    #[serde(rename = "type")]
    relation_type: &'a str,
    object: &'a str,
}

#[derive(Debug, Serialize)]
struct Traced<'a> {
    object: &'a str,
    outgoing: Vec<Link<'a>>,
    incoming: Vec<Link<'a>>,
    in_cycle: bool,
}

impl Trace {
    #[instrument(level = "debug", skip(self, context))]
    pub fn run(self, context: &super::Context) -> anyhow::Result<()> {
        let package = context.load(&self.file)?;
        let document = &package.document;
        if document.spec_object(&self.object).is_none() {
            anyhow::bail!("no spec object with identifier {}", self.object);
        }

        let graph = TraceGraph::new(document);
        let traced = Traced {
            object: &self.object,
            outgoing: graph
                .outgoing(&self.object)
                .into_iter()
                .map(|relation| link(relation, &relation.target))
                .collect(),
            incoming: graph
                .incoming(&self.object)
                .into_iter()
                .map(|relation| link(relation, &relation.source))
                .collect(),
            in_cycle: graph
                .cycles()
                .iter()
                .any(|cycle| cycle.contains(&self.object.as_str())),
        };

        match self.output {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(std::io::stdout(), &traced)
                    .context("failed to render json output")?;
                println!();
            }
            OutputFormat::Pretty => {
                println!("# {}", traced.object);
                println!("{}", name_of(document, traced.object));

                for (title, arrow, links) in [
                    ("Outgoing", "→", &traced.outgoing),
                    ("Incoming", "←", &traced.incoming),
                ] {
                    if links.is_empty() {
                        continue;
                    }
                    println!("\n{}", title.dim());
                    for link in links {
                        println!(
                            "  {arrow} {}  {} {}",
                            link.object,
                            name_of(document, link.object),
                            format!(
                                "[{} {}]",
                                name_of(document, link.relation_type),
                                link.relation
                            )
                            .dim()
                        );
                    }
                }

                if traced.in_cycle {
                    println!("\n{}", "The object is part of a relation cycle".warning());
                }
            }
        }
        Ok(())
    }
}

fn link<'a>(relation: &'a SpecRelation, other: &'a Reference) -> Link<'a> {
    Link {
        relation: relation.identifier().as_str(),
        relation_type: relation.spec_type.target().as_str(),
        object: other.target().as_str(),
    }
}
