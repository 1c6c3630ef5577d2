use serde::Serialize;

use super::{OpaqueExtra, Reference, Sequence, ValueKind, XhtmlContent};

/// An `ATTRIBUTE-VALUE-*` element: the value of one attribute of a spec
/// object, relation or specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeValue {
    /// The `ATTRIBUTE-DEFINITION-*` this is a value of.
    pub definition: Reference,
    /// The value.
    pub value: Value,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

impl AttributeValue {
    /// A value for the given attribute definition.
    #[must_use]
    pub fn new(definition: impl Into<Reference>, value: Value) -> Self {
        Self {
            definition: definition.into(),
            value,
            extra: OpaqueExtra::default(),
        }
    }

    /// The element's unrecognised content.
    #[must_use]
    pub const fn extra(&self) -> &OpaqueExtra {
        &self.extra
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// `ATTRIBUTE-VALUE-BOOLEAN`
    Boolean(bool),
    /// `ATTRIBUTE-VALUE-INTEGER`
    Integer(i64),
    /// `ATTRIBUTE-VALUE-REAL`
    Real(f64),
    /// `ATTRIBUTE-VALUE-STRING`
    String(String),
    /// `ATTRIBUTE-VALUE-DATE`, as written.
    Date(String),
    /// `ATTRIBUTE-VALUE-ENUMERATION`: the selected literals.
    Enumeration(Sequence<Reference>),
    /// `ATTRIBUTE-VALUE-XHTML`
    Xhtml(Box<XhtmlValue>),
}

impl Value {
    /// The value domain.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Integer(_) => ValueKind::Integer,
            Self::Real(_) => ValueKind::Real,
            Self::String(_) => ValueKind::String,
            Self::Date(_) => ValueKind::Date,
            Self::Enumeration(_) => ValueKind::Enumeration,
            Self::Xhtml(_) => ValueKind::Xhtml,
        }
    }

    /// A plain text rendering of the value, for search and display.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Boolean(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => value.to_string(),
            Self::String(value) | Self::Date(value) => value.clone(),
            Self::Enumeration(values) => values
                .iter()
                .map(|value| value.target().as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Self::Xhtml(value) => value.the_value.text(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<XhtmlContent> for Value {
    fn from(value: XhtmlContent) -> Self {
        Self::Xhtml(Box::new(XhtmlValue::new(value)))
    }
}

/// The content of an `ATTRIBUTE-VALUE-XHTML`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XhtmlValue {
    /// `THE-VALUE`
    pub the_value: XhtmlContent,
    /// `THE-ORIGINAL-VALUE`: the unsimplified content, when `the_value` has
    /// been simplified for exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_value: Option<XhtmlContent>,
    /// `IS-SIMPLIFIED`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_simplified: Option<bool>,
}

impl XhtmlValue {
    /// A value with no original.
    #[must_use]
    pub const fn new(the_value: XhtmlContent) -> Self {
        Self {
            the_value,
            original_value: None,
            is_simplified: None,
        }
    }

    /// Relative paths of files referenced by either content.
    #[must_use]
    pub fn links(&self) -> Vec<String> {
        let mut links = self.the_value.links();
        for link in self.original_value.iter().flat_map(XhtmlContent::links) {
            if !links.contains(&link) {
                links.push(link);
            }
        }
        links
    }
}

/// Parses a boolean the way `xsd:boolean` spells it.
pub(crate) fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::Identifier;

    #[test_case("true", Some(true))]
    #[test_case("1", Some(true))]
    #[test_case(" false ", Some(false))]
    #[test_case("0", Some(false))]
    #[test_case("TRUE", None)]
    fn xsd_booleans(raw: &str, expected: Option<bool>) {
        assert_eq!(parse_boolean(raw), expected);
    }

    #[test]
    fn enumeration_text_lists_literals() {
        let value = Value::Enumeration(
            vec![
                Reference::new(Identifier::new("EV-A").unwrap()),
                Reference::new(Identifier::new("EV-B").unwrap()),
            ]
            .into(),
        );
        assert_eq!(value.kind(), ValueKind::Enumeration);
        assert_eq!(value.text(), "EV-A, EV-B");
    }

    #[test]
    fn values_serialize_as_plain_data() {
        let value = AttributeValue::new(Identifier::new("AD-1").unwrap(), Value::Integer(3));
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({"definition": "AD-1", "value": {"kind": "integer", "value": 3}})
        );
    }
}
