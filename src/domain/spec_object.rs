use borsh::BorshSerialize;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{
    AttributeValue, Identifiable, Metadata, OpaqueExtra, Reference, Sequence, Value,
    metadata::identifiable,
};

/// A `SPEC-OBJECT`: a single requirement or requirement-like item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecObject {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// `TYPE`: the `SPEC-OBJECT-TYPE`.
    #[serde(rename = "type")]
    pub spec_type: Reference,
    /// `VALUES`, in document order.
    pub values: Sequence<AttributeValue>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

identifiable!(SpecObject);

impl SpecObject {
    /// A spec object with no values.
    #[must_use]
    pub fn new(metadata: Metadata, spec_type: impl Into<Reference>) -> Self {
        Self {
            metadata,
            spec_type: spec_type.into(),
            values: Sequence::new(),
            extra: OpaqueExtra::default(),
        }
    }

    /// The element's unrecognised content.
    #[must_use]
    pub const fn extra(&self) -> &OpaqueExtra {
        &self.extra
    }

    /// A fingerprint of the object's type and values.
    ///
    /// The fingerprint is a SHA256 hash of the Borsh-serialized values, and
    /// changes whenever a value, or the order of values, changes. Names,
    /// modification times and unrecognised content do not contribute.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        #[derive(BorshSerialize)]
        struct FingerprintData<'a> {
            spec_type: &'a str,
            values: Vec<(&'a str, FingerprintValue<'a>)>,
        }

        #[derive(BorshSerialize)]
        enum FingerprintValue<'a> {
            Boolean(bool),
            Integer(i64),
            Real(u64),
            String(&'a str),
            Date(&'a str),
            Enumeration(Vec<&'a str>),
            Xhtml(String),
        }

        let values = self
            .values
            .iter()
            .map(|value| {
                let fingerprint = match &value.value {
                    Value::Boolean(v) => FingerprintValue::Boolean(*v),
                    Value::Integer(v) => FingerprintValue::Integer(*v),
                    Value::Real(v) => FingerprintValue::Real(v.to_bits()),
                    Value::String(v) => FingerprintValue::String(v),
                    Value::Date(v) => FingerprintValue::Date(v),
                    Value::Enumeration(refs) => FingerprintValue::Enumeration(
                        refs.iter().map(|r| r.target().as_str()).collect(),
                    ),
                    Value::Xhtml(v) => {
                        FingerprintValue::Xhtml(v.the_value.markup().into_owned())
                    }
                };
                (value.definition.target().as_str(), fingerprint)
            })
            .collect();

        let data = FingerprintData {
            spec_type: self.spec_type.target().as_str(),
            values,
        };

        // encode using [borsh](https://borsh.io/); writing to a Vec cannot fail
        let encoded = borsh::to_vec(&data).unwrap_or_default();

        let hash = Sha256::digest(encoded);
        format!("{hash:x}")
    }
}

/// An element that carries attribute values: spec objects, relations and
/// specifications.
pub trait Attributed: Identifiable {
    /// `TYPE`
    fn spec_type(&self) -> &Reference;

    /// `VALUES`
    fn values(&self) -> &Sequence<AttributeValue>;

    /// Mutable access to `VALUES`.
    fn values_mut(&mut self) -> &mut Sequence<AttributeValue>;

    /// Mutable access to the shared metadata.
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// The value for an attribute definition, if one is set.
    fn value(&self, definition: &str) -> Option<&AttributeValue> {
        self.values()
            .iter()
            .find(|value| value.definition.target().as_str() == definition)
    }
}

macro_rules! attributed {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::domain::Attributed for $ty {
                fn spec_type(&self) -> &$crate::domain::Reference {
                    &self.spec_type
                }

                fn values(&self) -> &$crate::domain::Sequence<$crate::domain::AttributeValue> {
                    &self.values
                }

                fn values_mut(&mut self) -> &mut $crate::domain::Sequence<$crate::domain::AttributeValue> {
                    &mut self.values
                }

                fn metadata_mut(&mut self) -> &mut $crate::domain::Metadata {
                    &mut self.metadata
                }
            }
        )+
    };
}
pub(crate) use attributed;

attributed!(SpecObject);
