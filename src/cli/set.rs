use std::path::PathBuf;

use anyhow::Context as _;
use chrono::DateTime;
use clap::Parser;
use reqif::{
    Document, Session,
    domain::{
        AttributeDefinition, DatatypeDefinition, EntityRef, Identifiable, Identifier, Mutation,
        Reference, Sequence, Value, ValueKind, XhtmlContent,
    },
};
use tracing::instrument;

use super::{show::value_text, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Set an attribute value and save the document")]
pub struct Set {
    /// The document
    file: PathBuf,

    /// The spec object, relation or specification to change
    owner: String,

    /// The attribute definition, by identifier or long name
    definition: String,

    /// The new value.
    ///
    /// Enumeration literals are given by identifier or long name, separated
    /// by commas. XHTML is given as markup.
    value: String,

    /// Write the result here instead of overwriting the document
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

impl Set {
    #[instrument(level = "debug", skip(self, context))]
    pub fn run(self, context: &super::Context) -> anyhow::Result<()> {
        let mut session = Session::new(context.config.clone());
        let handle = session
            .open_document_with(&self.file, &context.load_options())
            .with_context(|| format!("failed to load {}", self.file.display()))?;

        let (definition, value) = {
            let document = session.document(handle)?;
            let definition = definition_for(document, &self.owner, &self.definition)?;
            let datatype = document.datatype(definition.datatype.target().as_str());
            let value = parse_value(&self.value, definition, datatype)?;
            (definition.identifier().clone(), value)
        };
        let owner = Identifier::new(self.owner.as_str())?;

        let version = session.apply_mutation(
            handle,
            Mutation::SetAttributeValue {
                owner,
                definition: definition.clone(),
                value,
            },
        )?;

        let target = self.out.as_ref().unwrap_or(&self.file);
        session.save_document(handle, target)?;

        let document = session.document(handle)?;
        let shown = document
            .spec_object(&self.owner)
            .and_then(|object| {
                object
                    .values
                    .iter()
                    .find(|value| value.definition.target() == &definition)
            })
            .map(|value| value_text(document, &value.value))
            .unwrap_or_else(|| self.value.clone());
        println!(
            "{} {}.{} = {shown} ({version}, {})",
            "Updated".success(),
            self.owner,
            definition,
            target.display()
        );
        Ok(())
    }
}

/// Finds the attribute definition named `definition` on the type of `owner`.
fn definition_for<'a>(
    document: &'a Document,
    owner: &str,
    definition: &str,
) -> anyhow::Result<&'a AttributeDefinition> {
    let spec_type = match document.entity(owner) {
        Some(EntityRef::SpecObject(object)) => &object.spec_type,
        Some(EntityRef::SpecRelation(relation)) => &relation.spec_type,
        Some(EntityRef::Specification(specification)) => &specification.spec_type,
        Some(other) => anyhow::bail!("{owner} is a {}, which has no values", other.kind_name()),
        None => anyhow::bail!("no element with identifier {owner}"),
    };
    let Some(spec_type) = document.spec_type(spec_type.target().as_str()) else {
        anyhow::bail!("the type of {owner} is not declared");
    };
    spec_type
        .attribute(definition)
        .or_else(|| spec_type.attribute_named(definition))
        .with_context(|| {
            format!(
                "{} has no attribute {definition}",
                spec_type.display_name()
            )
        })
}

/// Parses command line text as a value for `definition`.
fn parse_value(
    text: &str,
    definition: &AttributeDefinition,
    datatype: Option<&DatatypeDefinition>,
) -> anyhow::Result<Value> {
    let value = match definition.kind {
        ValueKind::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Boolean(true),
            "false" | "no" | "0" => Value::Boolean(false),
            _ => anyhow::bail!("{text:?} is not a boolean"),
        },
        ValueKind::Integer => Value::Integer(
            text.trim()
                .parse()
                .with_context(|| format!("{text:?} is not an integer"))?,
        ),
        ValueKind::Real => Value::Real(
            text.trim()
                .parse()
                .with_context(|| format!("{text:?} is not a number"))?,
        ),
        ValueKind::String => Value::String(text.to_owned()),
        ValueKind::Date => {
            DateTime::parse_from_rfc3339(text.trim())
                .with_context(|| format!("{text:?} is not an RFC 3339 date and time"))?;
            Value::Date(text.trim().to_owned())
        }
        ValueKind::Enumeration => {
            let literals = datatype.map(DatatypeDefinition::enum_values).unwrap_or_default();
            let selected = text
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| {
                    literals
                        .iter()
                        .find(|literal| {
                            literal.identifier().as_str() == token
                                || literal.metadata.long_name.as_deref() == Some(token)
                        })
                        .map(|literal| Reference::new(literal.identifier().clone()))
                        .with_context(|| format!("{token:?} is not a literal of the enumeration"))
                })
                .collect::<anyhow::Result<Sequence<_>>>()?;
            Value::Enumeration(selected)
        }
        ValueKind::Xhtml => XhtmlContent::parse(text)
            .context("the value is not well-formed markup")?
            .into(),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use reqif::{codec, xml};
    use test_case::test_case;

    use super::*;

    const XHTML: &str = include_str!("../../tests/fixtures/xhtml.reqif");

    fn document() -> Document {
        codec::decode(&xml::parse(XHTML.as_bytes()).unwrap()).unwrap()
    }

    fn parse(document: &Document, definition: &str, text: &str) -> anyhow::Result<Value> {
        let definition = definition_for(document, "SO-1", definition)?;
        parse_value(
            text,
            definition,
            document.datatype(definition.datatype.target().as_str()),
        )
    }

    #[test]
    fn definitions_are_found_by_identifier_or_long_name() {
        let document = document();
        let by_id = definition_for(&document, "SO-1", "AD-RISK").unwrap();
        let by_name = definition_for(&document, "SO-1", "Risk").unwrap();
        assert_eq!(by_id.identifier(), by_name.identifier());

        assert!(definition_for(&document, "SO-1", "Colour").is_err());
        assert!(definition_for(&document, "DT-INT", "Risk").is_err());
        assert!(definition_for(&document, "SO-9", "Risk").is_err());
    }

    #[test_case("AD-RISK", " 5 ", &Value::Integer(5))]
    #[test_case("AD-NAME", "Pump", &Value::String("Pump".to_owned()))]
    fn text_is_parsed_by_kind(definition: &str, text: &str, expected: &Value) {
        assert_eq!(&parse(&document(), definition, text).unwrap(), expected);
    }

    #[test]
    fn literals_are_found_by_identifier_or_long_name() {
        let document = document();
        let Value::Enumeration(selected) = parse(&document, "AD-PRIO", "Low, EV-HIGH").unwrap()
        else {
            panic!("expected an enumeration");
        };
        let ids: Vec<_> = selected.iter().map(|r| r.target().as_str()).collect();
        assert_eq!(ids, ["EV-LOW", "EV-HIGH"]);

        assert!(parse(&document, "AD-PRIO", "Medium").is_err());
    }

    #[test]
    fn malformed_text_is_rejected() {
        let document = document();
        assert!(parse(&document, "AD-RISK", "five").is_err());
        assert!(parse(&document, "AD-TEXT", "<xhtml:div>").is_err());
    }
}
