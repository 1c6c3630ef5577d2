use std::fmt;

use serde::Serialize;

use super::{
    AttributeValue, Metadata, OpaqueExtra, Reference, Sequence, ValueKind,
    metadata::identifiable,
};

/// What a spec type describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecTypeKind {
    /// `SPEC-OBJECT-TYPE`
    SpecObject,
    /// `SPEC-RELATION-TYPE`
    SpecRelation,
    /// `SPECIFICATION-TYPE`
    Specification,
    /// `RELATION-GROUP-TYPE`
    RelationGroup,
}

impl fmt::Display for SpecTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SpecObject => "spec object type",
            Self::SpecRelation => "spec relation type",
            Self::Specification => "specification type",
            Self::RelationGroup => "relation group type",
        })
    }
}

/// A `SPEC-OBJECT-TYPE`, `SPEC-RELATION-TYPE`, `SPECIFICATION-TYPE` or
/// `RELATION-GROUP-TYPE`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecType {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// What the type describes.
    pub kind: SpecTypeKind,
    /// `SPEC-ATTRIBUTES`, in declaration order.
    pub attributes: Sequence<AttributeDefinition>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

identifiable!(SpecType, AttributeDefinition);

impl SpecType {
    /// A type with no attributes.
    #[must_use]
    pub fn new(metadata: Metadata, kind: SpecTypeKind) -> Self {
        Self {
            metadata,
            kind,
            attributes: Sequence::new(),
            extra: OpaqueExtra::default(),
        }
    }

    /// Looks up an attribute definition by identifier.
    #[must_use]
    pub fn attribute(&self, identifier: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attribute| attribute.metadata.identifier().as_str() == identifier)
    }

    /// Looks up an attribute definition by long name.
    #[must_use]
    pub fn attribute_named(&self, long_name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attribute| attribute.metadata.long_name.as_deref() == Some(long_name))
    }

    /// The element's unrecognised content.
    #[must_use]
    pub const fn extra(&self) -> &OpaqueExtra {
        &self.extra
    }
}

/// An `ATTRIBUTE-DEFINITION-*` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDefinition {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// The value domain. Must equal the datatype's.
    pub kind: ValueKind,
    /// `TYPE`: the `DATATYPE-DEFINITION-*`.
    pub datatype: Reference,
    /// `IS-EDITABLE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_editable: Option<bool>,
    /// `MULTI-VALUED`, enumerations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_valued: Option<bool>,
    /// `DEFAULT-VALUE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

impl AttributeDefinition {
    /// A definition of the given kind over `datatype`.
    #[must_use]
    pub fn new(metadata: Metadata, kind: ValueKind, datatype: impl Into<Reference>) -> Self {
        Self {
            metadata,
            kind,
            datatype: datatype.into(),
            is_editable: None,
            multi_valued: None,
            default_value: None,
            extra: OpaqueExtra::default(),
        }
    }

    /// Whether more than one enumeration literal may be selected.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued.unwrap_or(false)
    }
}

/// The `DEFAULT-VALUE` of an attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DefaultValue {
    /// The default.
    pub value: AttributeValue,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

impl DefaultValue {
    /// Wraps a value.
    #[must_use]
    pub fn new(value: AttributeValue) -> Self {
        Self {
            value,
            extra: OpaqueExtra::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identifier;

    fn definition(id: &str, name: &str) -> AttributeDefinition {
        AttributeDefinition::new(
            Metadata::new(Identifier::new(id).unwrap()).with_long_name(name),
            ValueKind::String,
            Identifier::new("DT-STRING").unwrap(),
        )
    }

    #[test]
    fn attributes_are_found_by_identifier_and_name() {
        let mut spec_type = SpecType::new(
            Metadata::new(Identifier::new("SOT").unwrap()),
            SpecTypeKind::SpecObject,
        );
        spec_type.attributes.push(definition("AD-TEXT", "ReqIF.Text"));
        spec_type.attributes.push(definition("AD-NAME", "ReqIF.Name"));

        assert_eq!(
            spec_type.attribute_named("ReqIF.Name").unwrap().metadata.identifier().as_str(),
            "AD-NAME"
        );
        assert!(spec_type.attribute("AD-TEXT").is_some());
        assert!(spec_type.attribute("AD-OTHER").is_none());
    }
}
