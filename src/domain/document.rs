use std::fmt;

use serde::Serialize;

use super::{
    AttributeDefinition, DatatypeDefinition, EnumValue, Header, Identifier, Index, Location,
    Metadata, OpaqueExtra, RelationGroup, Sequence, SpecHierarchy, SpecObject, SpecRelation, SpecType,
    Specification, ToolExtension, Value, xhtml,
};
use crate::xml::{Attribute, Element, Node, QName, XmlTree};

/// Namespace of ReqIF 1.2 documents.
pub const REQIF_NAMESPACE: &str = "http://www.omg.org/spec/ReqIF/20110401/reqif.xsd";

/// A ReqIF document.
///
/// The document owns every entity. Other components refer to entities by
/// [`Identifier`] and look them up here; all changes go through
/// [`Document::apply`], which keeps the identifier index current.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) header: Header,
    pub(crate) datatypes: Sequence<DatatypeDefinition>,
    pub(crate) spec_types: Sequence<SpecType>,
    pub(crate) spec_objects: Sequence<SpecObject>,
    pub(crate) spec_relations: Sequence<SpecRelation>,
    pub(crate) specifications: Sequence<Specification>,
    pub(crate) relation_groups: Sequence<RelationGroup>,
    pub(crate) tool_extensions: Sequence<ToolExtension>,
    pub(crate) envelope: Envelope,
    pub(crate) index: Index,
    pub(crate) version: Version,
    pub(crate) partial: bool,
}

/// The parts of the source document around the ReqIF content: the XML
/// declaration, comments outside the root, layout, and the wrapper elements
/// that have no typed counterpart.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Envelope {
    /// The source tree with an empty root.
    pub(crate) shell: XmlTree,
    /// `REQ-IF`
    pub(crate) root: OpaqueExtra,
    /// `CORE-CONTENT`
    pub(crate) core_content: OpaqueExtra,
    /// `REQ-IF-CONTENT`
    pub(crate) content: OpaqueExtra,
}

impl Default for Envelope {
    fn default() -> Self {
        let root = OpaqueExtra {
            tag: Some(QName::new("REQ-IF")),
            attributes: vec![
                super::AttributeSlot::Extra(Attribute::new(QName::new("xmlns"), REQIF_NAMESPACE)),
                super::AttributeSlot::Extra(Attribute::new(
                    QName::with_prefix("xmlns", "xhtml"),
                    crate::xml::XHTML_NAMESPACE,
                )),
            ],
            children: Vec::new(),
            self_closing: false,
        };
        Self {
            shell: XmlTree::new(Element::new(QName::new("REQ-IF"))),
            root,
            core_content: OpaqueExtra::default(),
            content: OpaqueExtra::default(),
        }
    }
}

/// A document revision number, incremented by every applied mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Version(u64);

impl Version {
    /// The revision number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A borrowed view of any identifiable entity.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", content = "entity", rename_all = "kebab-case")]
pub enum EntityRef<'a> {
    /// The document header.
    Header(&'a Header),
    /// A datatype.
    Datatype(&'a DatatypeDefinition),
    /// An enumeration literal.
    EnumValue(&'a EnumValue),
    /// A spec type.
    SpecType(&'a SpecType),
    /// An attribute definition.
    AttributeDefinition(&'a AttributeDefinition),
    /// A spec object.
    SpecObject(&'a SpecObject),
    /// A spec relation.
    SpecRelation(&'a SpecRelation),
    /// A specification.
    Specification(&'a Specification),
    /// A hierarchy node.
    SpecHierarchy(&'a SpecHierarchy),
    /// A relation group.
    RelationGroup(&'a RelationGroup),
}

impl<'a> EntityRef<'a> {
    /// The shared metadata; the header has none.
    #[must_use]
    pub const fn metadata(&self) -> Option<&'a Metadata> {
        match self {
            Self::Header(_) => None,
            Self::Datatype(entity) => Some(&entity.metadata),
            Self::EnumValue(entity) => Some(&entity.metadata),
            Self::SpecType(entity) => Some(&entity.metadata),
            Self::AttributeDefinition(entity) => Some(&entity.metadata),
            Self::SpecObject(entity) => Some(&entity.metadata),
            Self::SpecRelation(entity) => Some(&entity.metadata),
            Self::Specification(entity) => Some(&entity.metadata),
            Self::SpecHierarchy(entity) => Some(&entity.metadata),
            Self::RelationGroup(entity) => Some(&entity.metadata),
        }
    }

    /// The element name of the entity.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Header(_) => "REQ-IF-HEADER",
            Self::Datatype(_) => "DATATYPE-DEFINITION",
            Self::EnumValue(_) => "ENUM-VALUE",
            Self::SpecType(_) => "SPEC-TYPE",
            Self::AttributeDefinition(_) => "ATTRIBUTE-DEFINITION",
            Self::SpecObject(_) => "SPEC-OBJECT",
            Self::SpecRelation(_) => "SPEC-RELATION",
            Self::Specification(_) => "SPECIFICATION",
            Self::SpecHierarchy(_) => "SPEC-HIERARCHY",
            Self::RelationGroup(_) => "RELATION-GROUP",
        }
    }
}

/// A place in a specification where a spec object appears.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    /// The specification.
    pub specification: &'a Specification,
    /// The hierarchy node placing the object.
    pub node: &'a SpecHierarchy,
}

/// Well-formed XML that does not match the ReqIF structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {kind}")]
pub struct SchemaError {
    /// Where the problem is, as an element path or identifier.
    pub path: String,
    /// What is wrong.
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    /// Creates an error at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, kind: SchemaErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// The ways a document can violate the ReqIF structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaErrorKind {
    /// The root element is not `REQ-IF`.
    #[error("root element is <{0}>, expected <REQ-IF>")]
    UnexpectedRoot(String),
    /// A required child element is absent.
    #[error("missing required element <{0}>")]
    MissingElement(String),
    /// A required attribute is absent.
    #[error("missing required attribute {0}")]
    MissingAttribute(String),
    /// A value could not be read.
    #[error("{name} has invalid value {value:?}, expected {expected}")]
    InvalidValue {
        /// The attribute or element holding the value.
        name: String,
        /// The value as written.
        value: String,
        /// What was expected.
        expected: &'static str,
    },
    /// An identifier is declared by more than one element.
    #[error("identifier {0} is declared more than once")]
    DuplicateIdentifier(Identifier),
    /// A value, attribute definition and datatype disagree on the kind of
    /// value.
    #[error("{found} does not match {expected} definition {definition}")]
    KindMismatch {
        /// The definition or datatype the element refers to.
        definition: Identifier,
        /// The kind the definition declares.
        expected: super::ValueKind,
        /// The kind found.
        found: super::ValueKind,
    },
    /// An enumeration value selects a literal of another datatype.
    #[error("{literal} is not a literal of datatype {datatype}")]
    ForeignLiteral {
        /// The selected literal.
        literal: Identifier,
        /// The definition's datatype.
        datatype: Identifier,
    },
}

/// A reference to an identifier that is not declared, or declares an
/// element of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{referrer} refers to {identifier}, which is not a declared {expected}")]
pub struct UnresolvedReference {
    /// The referenced identifier.
    pub identifier: Identifier,
    /// The element holding the reference.
    pub referrer: String,
    /// The kind of element the reference must point at.
    pub expected: &'static str,
}

impl Document {
    /// An empty document with a fresh header.
    #[must_use]
    pub fn new() -> Self {
        let mut document = Self {
            header: Header::new(Identifier::generate()),
            datatypes: Sequence::new(),
            spec_types: Sequence::new(),
            spec_objects: Sequence::new(),
            spec_relations: Sequence::new(),
            specifications: Sequence::new(),
            relation_groups: Sequence::new(),
            tool_extensions: Sequence::new(),
            envelope: Envelope::default(),
            index: Index::default(),
            version: Version::default(),
            partial: false,
        };
        document.header.req_if_version = Some("1.0".to_owned());
        // a lone header identifier cannot collide
        document.index = Index::build(&document).unwrap_or_default();
        document
    }

    /// Rebuilds the identifier index after a structural change.
    pub(crate) fn reindex(&mut self) -> Result<(), SchemaError> {
        self.index = Index::build(self)?;
        Ok(())
    }

    /// The `REQ-IF-HEADER`.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// `DATATYPES`
    #[must_use]
    pub const fn datatypes(&self) -> &Sequence<DatatypeDefinition> {
        &self.datatypes
    }

    /// `SPEC-TYPES`
    #[must_use]
    pub const fn spec_types(&self) -> &Sequence<SpecType> {
        &self.spec_types
    }

    /// `SPEC-OBJECTS`
    #[must_use]
    pub const fn spec_objects(&self) -> &Sequence<SpecObject> {
        &self.spec_objects
    }

    /// `SPEC-RELATIONS`
    #[must_use]
    pub const fn spec_relations(&self) -> &Sequence<SpecRelation> {
        &self.spec_relations
    }

    /// `SPECIFICATIONS`
    #[must_use]
    pub const fn specifications(&self) -> &Sequence<Specification> {
        &self.specifications
    }

    /// `SPEC-RELATION-GROUPS`
    #[must_use]
    pub const fn relation_groups(&self) -> &Sequence<RelationGroup> {
        &self.relation_groups
    }

    /// `TOOL-EXTENSIONS`
    #[must_use]
    pub const fn tool_extensions(&self) -> &Sequence<ToolExtension> {
        &self.tool_extensions
    }

    /// The identifier index.
    #[must_use]
    pub const fn index(&self) -> &Index {
        &self.index
    }

    /// The revision of the document.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Whether the document was loaded in lenient mode and some content could
    /// not be decoded. Undecoded content is kept, but is not part of the
    /// typed model.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial
    }

    /// Looks up any identifiable entity.
    #[must_use]
    pub fn entity(&self, identifier: &str) -> Option<EntityRef<'_>> {
        Some(match self.index.get(identifier)? {
            Location::Header => EntityRef::Header(&self.header),
            Location::Datatype(d) => EntityRef::Datatype(self.datatypes.get(*d)?),
            Location::EnumValue { datatype, value } => {
                EntityRef::EnumValue(self.datatypes.get(*datatype)?.enum_values().get(*value)?)
            }
            Location::SpecType(t) => EntityRef::SpecType(self.spec_types.get(*t)?),
            Location::AttributeDefinition {
                spec_type,
                attribute,
            } => EntityRef::AttributeDefinition(
                self.spec_types.get(*spec_type)?.attributes.get(*attribute)?,
            ),
            Location::SpecObject(o) => EntityRef::SpecObject(self.spec_objects.get(*o)?),
            Location::SpecRelation(r) => EntityRef::SpecRelation(self.spec_relations.get(*r)?),
            Location::Specification(s) => EntityRef::Specification(self.specifications.get(*s)?),
            Location::SpecHierarchy {
                specification,
                path,
            } => EntityRef::SpecHierarchy(self.specifications.get(*specification)?.node(path)?),
            Location::RelationGroup(g) => EntityRef::RelationGroup(self.relation_groups.get(*g)?),
        })
    }

    /// Looks up a datatype.
    #[must_use]
    pub fn datatype(&self, identifier: &str) -> Option<&DatatypeDefinition> {
        match self.index.get(identifier)? {
            Location::Datatype(d) => self.datatypes.get(*d),
            _ => None,
        }
    }

    /// Looks up a spec type.
    #[must_use]
    pub fn spec_type(&self, identifier: &str) -> Option<&SpecType> {
        match self.index.get(identifier)? {
            Location::SpecType(t) => self.spec_types.get(*t),
            _ => None,
        }
    }

    /// Looks up an attribute definition and the spec type that owns it.
    #[must_use]
    pub fn attribute_definition(
        &self,
        identifier: &str,
    ) -> Option<(&SpecType, &AttributeDefinition)> {
        match self.index.get(identifier)? {
            Location::AttributeDefinition {
                spec_type,
                attribute,
            } => {
                let spec_type = self.spec_types.get(*spec_type)?;
                Some((spec_type, spec_type.attributes.get(*attribute)?))
            }
            _ => None,
        }
    }

    /// Looks up a spec object.
    #[must_use]
    pub fn spec_object(&self, identifier: &str) -> Option<&SpecObject> {
        match self.index.get(identifier)? {
            Location::SpecObject(o) => self.spec_objects.get(*o),
            _ => None,
        }
    }

    /// Looks up a spec relation.
    #[must_use]
    pub fn spec_relation(&self, identifier: &str) -> Option<&SpecRelation> {
        match self.index.get(identifier)? {
            Location::SpecRelation(r) => self.spec_relations.get(*r),
            _ => None,
        }
    }

    /// Looks up a specification.
    #[must_use]
    pub fn specification(&self, identifier: &str) -> Option<&Specification> {
        match self.index.get(identifier)? {
            Location::Specification(s) => self.specifications.get(*s),
            _ => None,
        }
    }

    /// Looks up a relation group.
    #[must_use]
    pub fn relation_group(&self, identifier: &str) -> Option<&RelationGroup> {
        match self.index.get(identifier)? {
            Location::RelationGroup(g) => self.relation_groups.get(*g),
            _ => None,
        }
    }

    /// Every hierarchy node that places a spec object.
    #[must_use]
    pub fn placements_of(&self, object: &str) -> Vec<Placement<'_>> {
        self.index
            .placements(object)
            .iter()
            .filter_map(|(s, path)| {
                let specification = self.specifications.get(*s)?;
                Some(Placement {
                    specification,
                    node: specification.node(path)?,
                })
            })
            .collect()
    }

    /// Relations with the spec object at either end.
    pub fn relations_of<'a>(&'a self, object: &'a str) -> impl Iterator<Item = &'a SpecRelation> {
        self.spec_relations
            .iter()
            .filter(move |relation| relation.involves(object))
    }

    /// Relative paths of every file the document refers to, from XHTML
    /// values and tool extensions, in document order.
    #[must_use]
    pub fn attachment_references(&self) -> Vec<String> {
        let mut links = Vec::new();
        let mut add = |value: &Value| {
            if let Value::Xhtml(xhtml) = value {
                for link in xhtml.links() {
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
        };

        for spec_type in &self.spec_types {
            for attribute in &spec_type.attributes {
                if let Some(default) = &attribute.default_value {
                    add(&default.value.value);
                }
            }
        }
        let values = self
            .spec_objects
            .iter()
            .flat_map(|o| o.values.iter())
            .chain(self.spec_relations.iter().flat_map(|r| r.values.iter()))
            .chain(self.specifications.iter().flat_map(|s| s.values.iter()));
        for value in values {
            add(&value.value);
        }

        for extension in &self.tool_extensions {
            let mut found = Vec::new();
            xhtml::collect_links(&extension.element, &mut found);
            for link in found {
                if !links.contains(&link) {
                    links.push(link);
                }
            }
        }
        links
    }

    /// Every attribute value and text run inside the tool extensions, in
    /// document order.
    ///
    /// Tools keep file names in their own vocabulary, so any of these may
    /// name an attachment. Unlike [`Document::attachment_references`], a
    /// mention that names no file is not an error.
    #[must_use]
    pub fn tool_extension_mentions(&self) -> Vec<String> {
        let mut mentions: Vec<String> = Vec::new();
        for extension in &self.tool_extensions {
            extension.element.walk(&mut |element| {
                let texts = element.children().iter().filter_map(|node| match node {
                    Node::Text(text) => Some(text.value()),
                    _ => None,
                });
                for value in element.attributes().iter().map(Attribute::value).chain(texts) {
                    let value = value.trim();
                    if !value.is_empty() && !mentions.iter().any(|m| m == value) {
                        mentions.push(value.to_owned());
                    }
                }
            });
        }
        mentions
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
