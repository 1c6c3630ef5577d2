use std::collections::{HashMap, hash_map::Entry};

use super::{Document, Identifier, SchemaError, SchemaErrorKind, SpecHierarchy};

/// Where an identifiable element lives in a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The `REQ-IF-HEADER`.
    Header,
    /// A datatype, by position.
    Datatype(usize),
    /// A literal of an enumeration datatype.
    EnumValue {
        /// Position of the datatype.
        datatype: usize,
        /// Position of the literal within the datatype.
        value: usize,
    },
    /// A spec type, by position.
    SpecType(usize),
    /// An attribute definition of a spec type.
    AttributeDefinition {
        /// Position of the spec type.
        spec_type: usize,
        /// Position of the definition within the spec type.
        attribute: usize,
    },
    /// A spec object, by position.
    SpecObject(usize),
    /// A spec relation, by position.
    SpecRelation(usize),
    /// A specification, by position.
    Specification(usize),
    /// A hierarchy node.
    SpecHierarchy {
        /// Position of the specification.
        specification: usize,
        /// Child indices from the specification down to the node.
        path: Vec<usize>,
    },
    /// A relation group, by position.
    RelationGroup(usize),
}

/// Identifier lookup table for a [`Document`].
///
/// Identifiers are unique across the whole document regardless of element
/// kind, as `xsd:ID` requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    locations: HashMap<Identifier, Location>,
    placements: HashMap<Identifier, Vec<(usize, Vec<usize>)>>,
}

impl Index {
    /// Indexes every identifiable element of a document.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the first identifier that is declared
    /// more than once.
    pub fn build(document: &Document) -> Result<Self, SchemaError> {
        let mut index = Self::default();

        index.insert(document.header().identifier(), Location::Header)?;

        for (d, datatype) in document.datatypes().iter().enumerate() {
            index.insert(datatype.metadata.identifier(), Location::Datatype(d))?;
            for (v, value) in datatype.enum_values().iter().enumerate() {
                index.insert(
                    value.metadata.identifier(),
                    Location::EnumValue {
                        datatype: d,
                        value: v,
                    },
                )?;
            }
        }

        for (t, spec_type) in document.spec_types().iter().enumerate() {
            index.insert(spec_type.metadata.identifier(), Location::SpecType(t))?;
            for (a, attribute) in spec_type.attributes.iter().enumerate() {
                index.insert(
                    attribute.metadata.identifier(),
                    Location::AttributeDefinition {
                        spec_type: t,
                        attribute: a,
                    },
                )?;
            }
        }

        for (o, object) in document.spec_objects().iter().enumerate() {
            index.insert(object.metadata.identifier(), Location::SpecObject(o))?;
        }
        for (r, relation) in document.spec_relations().iter().enumerate() {
            index.insert(relation.metadata.identifier(), Location::SpecRelation(r))?;
        }

        for (s, specification) in document.specifications().iter().enumerate() {
            index.insert(specification.metadata.identifier(), Location::Specification(s))?;
            for (path, node) in specification.nodes() {
                index.place(s, &path, node);
                index.insert(
                    node.metadata.identifier(),
                    Location::SpecHierarchy {
                        specification: s,
                        path,
                    },
                )?;
            }
        }

        for (g, group) in document.relation_groups().iter().enumerate() {
            index.insert(group.metadata.identifier(), Location::RelationGroup(g))?;
        }

        Ok(index)
    }

    fn insert(&mut self, identifier: &Identifier, location: Location) -> Result<(), SchemaError> {
        match self.locations.entry(identifier.clone()) {
            Entry::Occupied(_) => Err(SchemaError::new(
                identifier.as_str(),
                SchemaErrorKind::DuplicateIdentifier(identifier.clone()),
            )),
            Entry::Vacant(entry) => {
                entry.insert(location);
                Ok(())
            }
        }
    }

    fn place(&mut self, specification: usize, path: &[usize], node: &SpecHierarchy) {
        self.placements
            .entry(node.object.target().clone())
            .or_default()
            .push((specification, path.to_vec()));
    }

    /// The location of an identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&Location> {
        self.locations.get(identifier)
    }

    /// Whether an identifier is in use.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.locations.contains_key(identifier)
    }

    /// The number of indexed identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// The hierarchy positions (specification position and child path) at
    /// which a spec object is placed.
    #[must_use]
    pub fn placements(&self, object: &str) -> &[(usize, Vec<usize>)] {
        self.placements.get(object).map_or(&[], Vec::as_slice)
    }
}
