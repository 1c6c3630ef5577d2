use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use reqif::{
    Document,
    domain::{
        Attributed, AttributeValue, DatatypeKind, EntityRef, Identifiable, Metadata, Sequence,
        Value,
    },
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Display an element of a document")]
pub struct Show {
    /// The document
    file: PathBuf,

    /// The identifier of the element to display
    identifier: String,

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

impl Show {
    #[instrument(level = "debug", skip(self, context))]
    pub fn run(self, context: &super::Context) -> anyhow::Result<()> {
        let package = context.load(&self.file)?;
        let document = &package.document;

        let Some(entity) = document.entity(&self.identifier) else {
            anyhow::bail!("no element with identifier {}", self.identifier);
        };

        match self.output {
            OutputFormat::Pretty => output_pretty(document, entity),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(std::io::stdout(), &entity)
                    .context("failed to render json output")?;
                println!();
            }
        }
        Ok(())
    }
}

/// The long name of an element, or its identifier.
pub fn name_of<'a>(document: &'a Document, identifier: &'a str) -> &'a str {
    document
        .entity(identifier)
        .and_then(|entity| entity.metadata())
        .and_then(|metadata| metadata.long_name.as_deref())
        .unwrap_or(identifier)
}

/// A value as text, with enumeration literals by name.
pub fn value_text(document: &Document, value: &Value) -> String {
    match value {
        Value::Enumeration(literals) => literals
            .iter()
            .map(|literal| name_of(document, literal.target().as_str()))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.text(),
    }
}

fn output_pretty(document: &Document, entity: EntityRef<'_>) {
    if let EntityRef::Header(header) = entity {
        println!("# {}", header.identifier());
        if let Some(title) = &header.title {
            println!("{title}");
        }
        println!("\n{}", "Header".dim());
        let fields = [
            ("Comment", &header.comment),
            ("Created", &header.creation_time),
            ("Repository", &header.repository_id),
            ("ReqIF tool", &header.req_if_tool_id),
            ("Version", &header.req_if_version),
            ("Source tool", &header.source_tool_id),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {label:<12}{value}");
            }
        }
        return;
    }

    if let Some(metadata) = entity.metadata() {
        heading(entity.kind_name(), metadata);
    }

    match entity {
        EntityRef::Datatype(datatype) => {
            println!("  {:<12}{}", "Values:", datatype.value_kind());
            match &datatype.kind {
                DatatypeKind::Integer { min, max } => range(min.as_ref(), max.as_ref()),
                DatatypeKind::Real { min, max, accuracy } => {
                    range(min.as_ref(), max.as_ref());
                    if let Some(accuracy) = accuracy {
                        println!("  {:<12}{accuracy}", "Accuracy:");
                    }
                }
                DatatypeKind::String {
                    max_length: Some(max_length),
                } => println!("  {:<12}{max_length}", "Max length:"),
                DatatypeKind::Enumeration { values } => {
                    println!("\n{}", "Literals".dim());
                    for literal in values {
                        let key = literal.key().map(|key| format!(" = {key}")).unwrap_or_default();
                        println!("  • {}{key} ({})", literal.display_name(), literal.identifier());
                    }
                }
                _ => {}
            }
        }
        EntityRef::EnumValue(literal) => {
            if let Some(properties) = &literal.properties {
                println!("  {:<12}{}", "Key:", properties.key);
                if !properties.other_content.is_empty() {
                    println!("  {:<12}{}", "Content:", properties.other_content);
                }
            }
        }
        EntityRef::SpecType(spec_type) => {
            println!("  {:<12}{}", "Describes:", spec_type.kind);
            if !spec_type.attributes.is_empty() {
                println!("\n{}", "Attributes".dim());
                for attribute in &spec_type.attributes {
                    println!(
                        "  • {} ({}, {})",
                        attribute.display_name(),
                        attribute.identifier(),
                        attribute.kind
                    );
                }
            }
        }
        EntityRef::AttributeDefinition(attribute) => {
            println!("  {:<12}{}", "Values:", attribute.kind);
            println!(
                "  {:<12}{}",
                "Datatype:",
                name_of(document, attribute.datatype.target().as_str())
            );
            if attribute.is_multi_valued() {
                println!("  {:<12}yes", "Multi:");
            }
            if let Some(default) = &attribute.default_value {
                println!(
                    "  {:<12}{}",
                    "Default:",
                    value_text(document, &default.value.value)
                );
            }
        }
        EntityRef::SpecObject(object) => {
            attributed(document, object);
            let placements = document.placements_of(object.identifier().as_str());
            if !placements.is_empty() {
                println!("\n{}", "Placed in".dim());
                for placement in placements {
                    println!(
                        "  • {} ({})",
                        placement.specification.display_name(),
                        placement.node.identifier()
                    );
                }
            }
            let relations: Vec<_> = document
                .relations_of(object.identifier().as_str())
                .collect();
            if !relations.is_empty() {
                println!("\n{}", "Relations".dim());
                for relation in relations {
                    println!(
                        "  • {} → {} ({})",
                        relation.source.target(),
                        relation.target.target(),
                        name_of(document, relation.spec_type.target().as_str())
                    );
                }
            }
        }
        EntityRef::SpecRelation(relation) => {
            println!("  {:<12}{}", "Source:", relation.source.target());
            println!("  {:<12}{}", "Target:", relation.target.target());
            attributed(document, relation);
        }
        EntityRef::Specification(specification) => {
            attributed(document, specification);
            println!(
                "\n{} {}",
                "Nodes".dim(),
                specification.nodes().len()
            );
        }
        EntityRef::SpecHierarchy(node) => {
            println!(
                "  {:<12}{} ({})",
                "Object:",
                name_of(document, node.object.target().as_str()),
                node.object.target()
            );
            println!("  {:<12}{}", "Children:", node.children.len());
        }
        EntityRef::RelationGroup(group) => {
            println!(
                "  {:<12}{}",
                "Source:",
                name_of(document, group.source_specification.target().as_str())
            );
            println!(
                "  {:<12}{}",
                "Target:",
                name_of(document, group.target_specification.target().as_str())
            );
            println!("\n{}", "Relations".dim());
            for relation in &group.relations {
                println!("  • {}", relation.target());
            }
        }
        EntityRef::Header(_) => {}
    }
}

fn heading(kind: &str, metadata: &Metadata) {
    println!("# {}", metadata.identifier());
    if let Some(long_name) = &metadata.long_name {
        println!("{long_name}");
    }

    println!("\n{}", "Metadata".dim());
    println!("  {:<12}{kind}", "Kind:");
    if let Some(last_change) = &metadata.last_change {
        println!("  {:<12}{last_change}", "Changed:");
    }
    if let Some(desc) = &metadata.desc {
        println!("  {:<12}{desc}", "Description:");
    }
}

fn range<T: std::fmt::Display>(min: Option<&T>, max: Option<&T>) {
    if let Some(min) = min {
        println!("  {:<12}{min}", "Min:");
    }
    if let Some(max) = max {
        println!("  {:<12}{max}", "Max:");
    }
}

fn attributed(document: &Document, entity: &impl Attributed) {
    println!(
        "  {:<12}{}",
        "Type:",
        name_of(document, entity.spec_type().target().as_str())
    );
    values(document, entity.values());
}

fn values(document: &Document, values: &Sequence<AttributeValue>) {
    if values.is_empty() {
        return;
    }
    println!("\n{}", "Values".dim());
    for value in values {
        println!(
            "  {}: {}",
            name_of(document, value.definition.target().as_str()),
            value_text(document, &value.value)
        );
    }
}
