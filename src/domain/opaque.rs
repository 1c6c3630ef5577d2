use std::ops::{Deref, DerefMut};

use serde::{Serialize, Serializer};

use crate::xml::{Attribute, Node, QName, Quote};

/// Everything about an element that the typed model does not capture.
///
/// Recognised attributes and children are recorded as slots naming the
/// schema field that fills them, in source order, together with the raw
/// text they had. Unrecognised attributes and children are stored whole.
/// Re-encoding walks the slots, so unknown content comes back at the same
/// position relative to the typed fields.
///
/// A default `OpaqueExtra` describes an element that did not exist in the
/// source; it is encoded in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaqueExtra {
    pub(crate) tag: Option<QName>,
    pub(crate) attributes: Vec<AttributeSlot>,
    pub(crate) children: Vec<ChildSlot>,
    pub(crate) self_closing: bool,
}

/// An attribute position within an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSlot {
    /// A schema attribute, with its source spelling.
    Known {
        /// The attribute's local name.
        name: &'static str,
        /// The quote character used in the source.
        quote: Quote,
        /// The value as written.
        raw: String,
    },
    /// An attribute the model does not recognise.
    Extra(Attribute),
}

/// A child position within an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildSlot {
    /// A schema child element, filled from the typed model on encode.
    Known(&'static str),
    /// An item of a list element, keyed by its identifier, the definition
    /// it gives a value for, or the target it references. Unrecognised
    /// nodes in front of an item follow it when items are removed or
    /// reordered.
    Item(Option<String>),
    /// A run of the element's own character data, as written.
    Text(String),
    /// A node the model does not recognise.
    Extra(Node),
}

impl OpaqueExtra {
    /// Whether the element was absent from the source.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.tag.is_none()
    }

    /// The element name as written, if the element came from a source
    /// document.
    #[must_use]
    pub const fn tag(&self) -> Option<&QName> {
        self.tag.as_ref()
    }

    /// Attributes the model does not recognise, in source order.
    pub fn unknown_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter_map(|slot| match slot {
            AttributeSlot::Extra(attribute) => Some(attribute),
            AttributeSlot::Known { .. } => None,
        })
    }

    /// Child nodes the model does not recognise, in source order.
    pub fn unknown_children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(|slot| match slot {
            ChildSlot::Extra(node) => Some(node),
            ChildSlot::Known(_) | ChildSlot::Item(_) | ChildSlot::Text(_) => None,
        })
    }

    /// Whether the element carries nothing the model does not recognise.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.unknown_attributes().next().is_none() && self.unknown_children().next().is_none()
    }

    /// Appends an unrecognised child after everything already recorded.
    pub fn push_unknown(&mut self, node: impl Into<Node>) {
        self.children.push(ChildSlot::Extra(node.into()));
    }
}

/// An ordered list of entities together with their container element.
///
/// `extra` is `None` when the container element was absent from the source;
/// such a container is only written once it has items.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence<T> {
    items: Vec<T>,
    pub(crate) extra: Option<OpaqueExtra>,
}

impl<T> Sequence<T> {
    /// An empty sequence whose container element does not exist yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            extra: None,
        }
    }

    pub(crate) const fn from_parts(items: Vec<T>, extra: Option<OpaqueExtra>) -> Self {
        Self { items, extra }
    }

    /// The container element's unrecognised content.
    #[must_use]
    pub const fn extra(&self) -> Option<&OpaqueExtra> {
        self.extra.as_ref()
    }

    /// Consumes the sequence, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for Sequence<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items, extra: None }
    }
}

impl<T> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> Deref for Sequence<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> DerefMut for Sequence<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

impl<'a, T> IntoIterator for &'a Sequence<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for Sequence<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}
