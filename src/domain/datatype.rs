use std::fmt;

use serde::Serialize;

use super::{Identifier, Metadata, OpaqueExtra, Sequence, metadata::identifiable};

/// The seven value domains of ReqIF.
///
/// Datatypes, attribute definitions and attribute values each carry one of
/// these, and the three must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// `true` or `false`.
    Boolean,
    /// A signed integer.
    Integer,
    /// A floating point number.
    Real,
    /// Plain text.
    String,
    /// An `xsd:dateTime`.
    Date,
    /// One or more values of an enumeration.
    Enumeration,
    /// Formatted text.
    Xhtml,
}

impl ValueKind {
    /// All kinds, in the order the ReqIF schema lists them.
    pub const ALL: [Self; 7] = [
        Self::Boolean,
        Self::Date,
        Self::Enumeration,
        Self::Integer,
        Self::Real,
        Self::String,
        Self::Xhtml,
    ];
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::String => "string",
            Self::Date => "date",
            Self::Enumeration => "enumeration",
            Self::Xhtml => "xhtml",
        })
    }
}

/// A `DATATYPE-DEFINITION-*` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatatypeDefinition {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// The value domain and its constraints.
    #[serde(flatten)]
    pub kind: DatatypeKind,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

identifiable!(DatatypeDefinition);

/// The constraints of a datatype.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatatypeKind {
    /// `DATATYPE-DEFINITION-BOOLEAN`
    Boolean,
    /// `DATATYPE-DEFINITION-INTEGER`
    Integer {
        /// `MIN`
        min: Option<i64>,
        /// `MAX`
        max: Option<i64>,
    },
    /// `DATATYPE-DEFINITION-REAL`
    Real {
        /// `MIN`
        min: Option<f64>,
        /// `MAX`
        max: Option<f64>,
        /// `ACCURACY`: significant decimal places.
        accuracy: Option<u32>,
    },
    /// `DATATYPE-DEFINITION-STRING`
    String {
        /// `MAX-LENGTH`
        max_length: Option<u64>,
    },
    /// `DATATYPE-DEFINITION-DATE`
    Date,
    /// `DATATYPE-DEFINITION-ENUMERATION`
    Enumeration {
        /// `SPECIFIED-VALUES`, in declaration order.
        values: Sequence<EnumValue>,
    },
    /// `DATATYPE-DEFINITION-XHTML`
    Xhtml,
}

impl DatatypeKind {
    /// The value domain.
    #[must_use]
    pub const fn value_kind(&self) -> ValueKind {
        match self {
            Self::Boolean => ValueKind::Boolean,
            Self::Integer { .. } => ValueKind::Integer,
            Self::Real { .. } => ValueKind::Real,
            Self::String { .. } => ValueKind::String,
            Self::Date => ValueKind::Date,
            Self::Enumeration { .. } => ValueKind::Enumeration,
            Self::Xhtml => ValueKind::Xhtml,
        }
    }
}

impl DatatypeDefinition {
    /// A new datatype with no constraints beyond its kind.
    #[must_use]
    pub fn new(metadata: Metadata, kind: DatatypeKind) -> Self {
        Self {
            metadata,
            kind,
            extra: OpaqueExtra::default(),
        }
    }

    /// The value domain.
    #[must_use]
    pub const fn value_kind(&self) -> ValueKind {
        self.kind.value_kind()
    }

    /// The enumeration literals, empty for other kinds.
    #[must_use]
    pub fn enum_values(&self) -> &[EnumValue] {
        match &self.kind {
            DatatypeKind::Enumeration { values } => values,
            _ => &[],
        }
    }

    /// Looks up an enumeration literal by identifier.
    #[must_use]
    pub fn enum_value(&self, identifier: &str) -> Option<&EnumValue> {
        self.enum_values()
            .iter()
            .find(|value| value.metadata.identifier().as_str() == identifier)
    }

    /// The element's unrecognised content.
    #[must_use]
    pub const fn extra(&self) -> &OpaqueExtra {
        &self.extra
    }
}

/// An `ENUM-VALUE`: one literal of an enumeration datatype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// `PROPERTIES/EMBEDDED-VALUE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<EmbeddedValue>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

identifiable!(EnumValue);

impl EnumValue {
    /// A literal with the given key.
    #[must_use]
    pub fn new(metadata: Metadata, key: i64) -> Self {
        Self {
            metadata,
            properties: Some(EmbeddedValue::new(key, String::new())),
            extra: OpaqueExtra::default(),
        }
    }

    /// The integer key, if the literal has properties.
    #[must_use]
    pub fn key(&self) -> Option<i64> {
        self.properties.as_ref().map(|properties| properties.key)
    }
}

/// The `EMBEDDED-VALUE` of an enumeration literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedValue {
    /// `KEY`
    pub key: i64,
    /// `OTHER-CONTENT`: tool specific content, often a colour.
    pub other_content: String,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
    /// The enclosing `PROPERTIES` element.
    #[serde(skip)]
    pub(crate) wrapper: OpaqueExtra,
}

impl EmbeddedValue {
    /// New properties.
    #[must_use]
    pub fn new(key: i64, other_content: String) -> Self {
        Self {
            key,
            other_content,
            extra: OpaqueExtra::default(),
            wrapper: OpaqueExtra::default(),
        }
    }
}

/// Checks a value against the constraints of a datatype.
pub(crate) fn check_range(kind: &DatatypeKind, value: &super::Value) -> Result<(), String> {
    use super::Value;

    match (kind, value) {
        (DatatypeKind::Integer { min, max }, Value::Integer(v)) => {
            if min.is_some_and(|min| *v < min) || max.is_some_and(|max| *v > max) {
                return Err(format!(
                    "{v} is outside the range {}..={}",
                    bound(*min),
                    bound(*max)
                ));
            }
        }
        (DatatypeKind::Real { min, max, .. }, Value::Real(v)) => {
            if !v.is_finite() {
                return Err(format!("{v} is not a finite number"));
            }
            if min.is_some_and(|min| *v < min) || max.is_some_and(|max| *v > max) {
                return Err(format!(
                    "{v} is outside the range {}..={}",
                    bound(*min),
                    bound(*max)
                ));
            }
        }
        (DatatypeKind::String { max_length: Some(max) }, Value::String(v)) => {
            let length = u64::try_from(v.chars().count()).unwrap_or(u64::MAX);
            if length > *max {
                return Err(format!("{length} characters exceeds the maximum of {max}"));
            }
        }
        _ => {}
    }
    Ok(())
}

fn bound<T: fmt::Display>(bound: Option<T>) -> String {
    bound.map_or_else(String::new, |b| b.to_string())
}
