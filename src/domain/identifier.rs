use std::{borrow::Borrow, fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::OpaqueExtra;

/// The `IDENTIFIER` of a ReqIF element.
///
/// Identifiers are opaque and unique within a document. They are never
/// rewritten once assigned; new entities get a fresh one from
/// [`Identifier::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(NonEmptyString);

impl Identifier {
    /// Creates an identifier from a string.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyIdentifier`] if the string is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdentifier> {
        NonEmptyString::new(value.into())
            .map(Self)
            .map_err(|_| EmptyIdentifier)
    }

    /// Allocates a new identifier that cannot collide with an existing one.
    ///
    /// The leading underscore keeps the value a valid `xsd:ID`.
    #[must_use]
    pub fn generate() -> Self {
        let value = format!("_{}", Uuid::new_v4());
        Self::new(value).unwrap_or_else(|EmptyIdentifier| unreachable!())
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// An identifier was empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("identifiers must not be empty")]
pub struct EmptyIdentifier;

impl FromStr for Identifier {
    type Err = EmptyIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = EmptyIdentifier;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Identifier {
    type Error = EmptyIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Deref for Identifier {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A reference to another element, held in a `*-REF` element.
///
/// Most references sit inside a wrapper element (`TYPE`, `SOURCE`,
/// `OBJECT`, ...) whose content is kept too. References in a list, like the
/// selected literals of an enumeration value, have no wrapper of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    target: Identifier,
    pub(crate) element: OpaqueExtra,
    pub(crate) wrapper: OpaqueExtra,
}

impl Reference {
    /// A reference to `target`.
    #[must_use]
    pub fn new(target: Identifier) -> Self {
        Self {
            target,
            element: OpaqueExtra::default(),
            wrapper: OpaqueExtra::default(),
        }
    }

    pub(crate) const fn with_extras(
        target: Identifier,
        element: OpaqueExtra,
        wrapper: OpaqueExtra,
    ) -> Self {
        Self {
            target,
            element,
            wrapper,
        }
    }

    /// The referenced identifier.
    #[must_use]
    pub const fn target(&self) -> &Identifier {
        &self.target
    }

    /// Points the reference somewhere else, keeping its element layout.
    pub fn retarget(&mut self, target: Identifier) {
        self.target = target;
    }
}

impl From<Identifier> for Reference {
    fn from(target: Identifier) -> Self {
        Self::new(target)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.target.serialize(serializer)
    }
}
