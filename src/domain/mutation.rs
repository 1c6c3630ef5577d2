use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, instrument};

use super::{
    Attributed, AttributeDefinition, AttributeValue, DatatypeDefinition, DatatypeKind, Document,
    Identifiable, Identifier, Location, SchemaError, SpecHierarchy, SpecObject, SpecRelation,
    SpecType, SpecTypeKind, Specification, UnresolvedReference, Value, ValueKind,
    datatype::check_range,
};

/// A change to a document.
///
/// Every mutation is checked against the document's invariants before
/// anything is written. A rejected mutation leaves the document exactly as it
/// was.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Sets the value of an attribute on a spec object, relation or
    /// specification, replacing any existing value for that definition.
    SetAttributeValue {
        /// The spec object, relation or specification.
        owner: Identifier,
        /// The attribute definition.
        definition: Identifier,
        /// The new value.
        value: Value,
    },
    /// Removes the value of an attribute.
    RemoveAttributeValue {
        /// The spec object, relation or specification.
        owner: Identifier,
        /// The attribute definition.
        definition: Identifier,
    },
    /// Adds a spec object.
    AddSpecObject(SpecObject),
    /// Removes a spec object.
    RemoveSpecObject {
        /// The object to remove.
        object: Identifier,
        /// Also remove the relations and hierarchy nodes (with their
        /// subtrees) that refer to the object. Without this, an object that
        /// is still referred to cannot be removed.
        cascade: bool,
    },
    /// Adds a spec relation.
    AddRelation(SpecRelation),
    /// Removes a spec relation, and drops it from any relation group.
    RemoveRelation(Identifier),
    /// Moves a hierarchy node to a new position among its siblings.
    ReorderHierarchyChild {
        /// The node to move.
        node: Identifier,
        /// The new index among its siblings.
        position: usize,
    },
    /// Inserts a hierarchy node (with its subtree).
    InsertHierarchyNode {
        /// A specification, or a hierarchy node.
        parent: Identifier,
        /// Index among the parent's children; `None` appends.
        position: Option<usize>,
        /// The node.
        node: SpecHierarchy,
    },
    /// Removes a hierarchy node and its subtree. The placed objects remain.
    RemoveHierarchyNode(Identifier),
    /// Adds a datatype.
    AddDatatype(DatatypeDefinition),
    /// Adds a spec type.
    AddSpecType(SpecType),
    /// Adds a specification.
    AddSpecification(Specification),
}

impl Mutation {
    /// A short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetAttributeValue { .. } => "set-attribute-value",
            Self::RemoveAttributeValue { .. } => "remove-attribute-value",
            Self::AddSpecObject(_) => "add-spec-object",
            Self::RemoveSpecObject { .. } => "remove-spec-object",
            Self::AddRelation(_) => "add-relation",
            Self::RemoveRelation(_) => "remove-relation",
            Self::ReorderHierarchyChild { .. } => "reorder-hierarchy-child",
            Self::InsertHierarchyNode { .. } => "insert-hierarchy-node",
            Self::RemoveHierarchyNode(_) => "remove-hierarchy-node",
            Self::AddDatatype(_) => "add-datatype",
            Self::AddSpecType(_) => "add-spec-type",
            Self::AddSpecification(_) => "add-specification",
        }
    }
}

/// A mutation was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The mutation names an element that does not exist.
    #[error("no {expected} with identifier {identifier}")]
    NotFound {
        /// The identifier given.
        identifier: Identifier,
        /// The kind of element required.
        expected: &'static str,
    },

    /// A new element reuses an identifier.
    #[error("identifier {0} is already in use")]
    DuplicateIdentifier(Identifier),

    /// A new element refers to something that does not exist.
    #[error(transparent)]
    Unresolved(#[from] UnresolvedReference),

    /// The attribute is not defined by the owner's type.
    #[error("{definition} is not an attribute of the type of {owner}")]
    ForeignDefinition {
        /// The element being changed.
        owner: Identifier,
        /// The attribute definition.
        definition: Identifier,
    },

    /// The value does not match the attribute's datatype.
    #[error("{definition} holds {expected} values, not {found}")]
    KindMismatch {
        /// The attribute definition or datatype.
        definition: Identifier,
        /// The kind it declares.
        expected: ValueKind,
        /// The kind supplied.
        found: ValueKind,
    },

    /// An enumeration value selects a literal of another datatype.
    #[error("{literal} is not a literal of {datatype}")]
    UnknownLiteral {
        /// The selected literal.
        literal: Identifier,
        /// The attribute's datatype.
        datatype: Identifier,
    },

    /// More than one literal was selected for a single-valued attribute.
    #[error("{definition} is single-valued, but {count} literals were selected")]
    NotMultiValued {
        /// The attribute definition.
        definition: Identifier,
        /// The number of selected literals.
        count: usize,
    },

    /// The value violates the datatype's range or length.
    #[error("{definition}: {reason}")]
    OutOfRange {
        /// The attribute definition.
        definition: Identifier,
        /// What is wrong.
        reason: String,
    },

    /// The element is still the target of a reference.
    #[error("{identifier} is still referenced by {referrer}")]
    StillReferenced {
        /// The element to remove.
        identifier: Identifier,
        /// An element referring to it.
        referrer: Identifier,
    },

    /// A hierarchy position is past the end of the sibling list.
    #[error("position {position} is out of bounds for {len} children")]
    PositionOutOfBounds {
        /// The requested position.
        position: usize,
        /// The number of siblings.
        len: usize,
    },

    /// The change would leave the document structurally invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

type Result<T> = std::result::Result<T, ValidationError>;

impl Document {
    /// Applies a mutation.
    ///
    /// Returns the new document version.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the mutation would break an
    /// invariant of the document. The document is unchanged on error.
    #[instrument(level = "debug", skip_all, fields(mutation = mutation.name()))]
    pub fn apply(&mut self, mutation: Mutation) -> Result<super::Version> {
        let mut staged = self.clone();
        staged.stage(mutation)?;
        staged.reindex()?;
        staged.version = staged.version.next();

        *self = staged;
        debug!(version = %self.version, "mutation applied");
        Ok(self.version)
    }

    fn stage(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::SetAttributeValue {
                owner,
                definition,
                value,
            } => self.set_attribute_value(&owner, &definition, value)?,
            Mutation::RemoveAttributeValue { owner, definition } => {
                self.remove_attribute_value(&owner, &definition)?;
            }
            Mutation::AddSpecObject(object) => self.add_spec_object(object)?,
            Mutation::RemoveSpecObject { object, cascade } => {
                self.remove_spec_object(&object, cascade)?;
            }
            Mutation::AddRelation(relation) => self.add_relation(relation)?,
            Mutation::RemoveRelation(relation) => self.remove_relation(&relation)?,
            Mutation::ReorderHierarchyChild { node, position } => {
                self.reorder_hierarchy_child(&node, position)?;
            }
            Mutation::InsertHierarchyNode {
                parent,
                position,
                node,
            } => self.insert_hierarchy_node(&parent, position, node)?,
            Mutation::RemoveHierarchyNode(node) => self.remove_hierarchy_node(&node)?,
            Mutation::AddDatatype(datatype) => self.add_datatype(datatype)?,
            Mutation::AddSpecType(spec_type) => self.add_spec_type(spec_type)?,
            Mutation::AddSpecification(specification) => self.add_specification(specification)?,
        }
        Ok(())
    }

    fn set_attribute_value(
        &mut self,
        owner: &Identifier,
        definition: &Identifier,
        value: Value,
    ) -> Result<()> {
        let location = self.owner_location(owner)?;
        let spec_type = self.owner_spec_type(owner, &location)?;
        self.check_value(owner, spec_type, definition, &value)?;

        let now = Utc::now();
        let Some(target) = self.owner_mut(&location) else {
            return Err(not_found(owner, "spec object, relation or specification"));
        };
        let values = target.values_mut();
        if let Some(existing) = values
            .iter_mut()
            .find(|existing| existing.definition.target() == definition)
        {
            existing.value = carry_layout(&mut existing.value, value);
        } else {
            values.push(AttributeValue::new(definition.clone(), value));
        }
        target.metadata_mut().touch(now);
        Ok(())
    }

    fn remove_attribute_value(&mut self, owner: &Identifier, definition: &Identifier) -> Result<()> {
        let location = self.owner_location(owner)?;
        let now = Utc::now();
        let Some(target) = self.owner_mut(&location) else {
            return Err(not_found(owner, "spec object, relation or specification"));
        };
        let values = target.values_mut();
        let Some(position) = values
            .iter()
            .position(|value| value.definition.target() == definition)
        else {
            return Err(not_found(definition, "attribute value"));
        };
        values.remove(position);
        target.metadata_mut().touch(now);
        Ok(())
    }

    fn add_spec_object(&mut self, object: SpecObject) -> Result<()> {
        self.check_fresh([object.identifier()])?;
        let spec_type = self.typed(&object.spec_type, SpecTypeKind::SpecObject, object.identifier())?;
        self.check_values(object.identifier(), spec_type, &object.values)?;
        self.spec_objects.push(object);
        Ok(())
    }

    fn remove_spec_object(&mut self, object: &Identifier, cascade: bool) -> Result<()> {
        let Some(Location::SpecObject(position)) = self.index.get(object).cloned() else {
            return Err(not_found(object, "spec object"));
        };

        if !cascade {
            if let Some(relation) = self.relations_of(object).next() {
                return Err(ValidationError::StillReferenced {
                    identifier: object.clone(),
                    referrer: relation.identifier().clone(),
                });
            }
            if let Some(placement) = self.placements_of(object).first() {
                return Err(ValidationError::StillReferenced {
                    identifier: object.clone(),
                    referrer: placement.node.identifier().clone(),
                });
            }
        }

        let removed: Vec<Identifier> = self
            .relations_of(object)
            .map(|relation| relation.identifier().clone())
            .collect();
        self.spec_relations.retain(|relation| !relation.involves(object));
        self.drop_from_groups(&removed);
        for specification in self.specifications.iter_mut() {
            prune(&mut specification.children, object);
        }
        self.spec_objects.remove(position);
        debug!(relations = removed.len(), "removed spec object");
        Ok(())
    }

    fn add_relation(&mut self, relation: SpecRelation) -> Result<()> {
        self.check_fresh([relation.identifier()])?;
        let referrer = relation.identifier();
        let spec_type = self.typed(&relation.spec_type, SpecTypeKind::SpecRelation, referrer)?;
        for end in [&relation.source, &relation.target] {
            if self.spec_object(end.target()).is_none() {
                return Err(unresolved(end.target(), referrer, "spec object"));
            }
        }
        self.check_values(referrer, spec_type, &relation.values)?;
        self.spec_relations.push(relation);
        Ok(())
    }

    fn remove_relation(&mut self, relation: &Identifier) -> Result<()> {
        let Some(Location::SpecRelation(position)) = self.index.get(relation).cloned() else {
            return Err(not_found(relation, "spec relation"));
        };
        self.spec_relations.remove(position);
        self.drop_from_groups(std::slice::from_ref(relation));
        Ok(())
    }

    fn drop_from_groups(&mut self, relations: &[Identifier]) {
        for group in self.relation_groups.iter_mut() {
            group
                .relations
                .retain(|reference| !relations.contains(reference.target()));
        }
    }

    fn reorder_hierarchy_child(&mut self, node: &Identifier, position: usize) -> Result<()> {
        let Some(Location::SpecHierarchy {
            specification,
            path,
        }) = self.index.get(node).cloned()
        else {
            return Err(not_found(node, "hierarchy node"));
        };
        let Some((current, parent)) = path.split_last() else {
            return Err(not_found(node, "hierarchy node"));
        };
        let siblings = self
            .specifications
            .get_mut(specification)
            .and_then(|specification| specification.children_at_mut(parent))
            .ok_or_else(|| not_found(node, "hierarchy node"))?;
        if position >= siblings.len() {
            return Err(ValidationError::PositionOutOfBounds {
                position,
                len: siblings.len(),
            });
        }
        let moved = siblings.remove(*current);
        siblings.insert(position, moved);
        Ok(())
    }

    fn insert_hierarchy_node(
        &mut self,
        parent: &Identifier,
        position: Option<usize>,
        node: SpecHierarchy,
    ) -> Result<()> {
        let (specification, path) = match self.index.get(parent).cloned() {
            Some(Location::Specification(s)) => (s, Vec::new()),
            Some(Location::SpecHierarchy {
                specification,
                path,
            }) => (specification, path),
            _ => return Err(not_found(parent, "specification or hierarchy node")),
        };

        let mut declared = Vec::new();
        collect_node_ids(std::slice::from_ref(&node), &mut declared);
        self.check_fresh(declared)?;
        self.check_hierarchy(std::slice::from_ref(&node))?;

        let siblings = self
            .specifications
            .get_mut(specification)
            .and_then(|specification| specification.children_at_mut(&path))
            .ok_or_else(|| not_found(parent, "specification or hierarchy node"))?;
        let position = position.unwrap_or(siblings.len());
        if position > siblings.len() {
            return Err(ValidationError::PositionOutOfBounds {
                position,
                len: siblings.len(),
            });
        }
        siblings.insert(position, node);
        Ok(())
    }

    fn remove_hierarchy_node(&mut self, node: &Identifier) -> Result<()> {
        let Some(Location::SpecHierarchy {
            specification,
            path,
        }) = self.index.get(node).cloned()
        else {
            return Err(not_found(node, "hierarchy node"));
        };
        let (current, parent) = path
            .split_last()
            .ok_or_else(|| not_found(node, "hierarchy node"))?;
        let siblings = self
            .specifications
            .get_mut(specification)
            .and_then(|specification| specification.children_at_mut(parent))
            .ok_or_else(|| not_found(node, "hierarchy node"))?;
        siblings.remove(*current);
        Ok(())
    }

    fn add_datatype(&mut self, datatype: DatatypeDefinition) -> Result<()> {
        let declared = std::iter::once(datatype.identifier())
            .chain(datatype.enum_values().iter().map(Identifiable::identifier));
        self.check_fresh(declared)?;
        self.datatypes.push(datatype);
        Ok(())
    }

    fn add_spec_type(&mut self, spec_type: SpecType) -> Result<()> {
        let declared = std::iter::once(spec_type.identifier())
            .chain(spec_type.attributes.iter().map(Identifiable::identifier));
        self.check_fresh(declared)?;

        for attribute in &spec_type.attributes {
            let datatype = self.check_definition(attribute)?;
            if let Some(default) = &attribute.default_value {
                self.check_literal_value(attribute, datatype, &default.value.value)?;
            }
        }
        self.spec_types.push(spec_type);
        Ok(())
    }

    fn add_specification(&mut self, specification: Specification) -> Result<()> {
        let mut declared = vec![specification.identifier()];
        collect_node_ids(&specification.children, &mut declared);
        self.check_fresh(declared)?;

        let referrer = specification.identifier();
        let spec_type =
            self.typed(&specification.spec_type, SpecTypeKind::Specification, referrer)?;
        self.check_values(referrer, spec_type, &specification.values)?;
        self.check_hierarchy(&specification.children)?;
        self.specifications.push(specification);
        Ok(())
    }

    /// Every identifier must be unused, and distinct from the others.
    fn check_fresh<'a>(&self, declared: impl IntoIterator<Item = &'a Identifier>) -> Result<()> {
        let mut seen = HashSet::new();
        for identifier in declared {
            if self.index.contains(identifier) || !seen.insert(identifier) {
                return Err(ValidationError::DuplicateIdentifier(identifier.clone()));
            }
        }
        Ok(())
    }

    fn check_hierarchy(&self, nodes: &[SpecHierarchy]) -> Result<()> {
        for node in nodes {
            if self.spec_object(node.object.target()).is_none() {
                return Err(unresolved(node.object.target(), node.identifier(), "spec object"));
            }
            self.check_hierarchy(&node.children)?;
        }
        Ok(())
    }

    /// The spec type a reference points at, which must be of `kind`.
    fn typed(
        &self,
        reference: &super::Reference,
        kind: SpecTypeKind,
        referrer: &Identifier,
    ) -> Result<&SpecType> {
        self.spec_type(reference.target())
            .filter(|spec_type| spec_type.kind == kind)
            .ok_or_else(|| unresolved(reference.target(), referrer, spec_type_name(kind)))
    }

    /// The datatype of an attribute definition, which must agree with it.
    fn check_definition(&self, attribute: &AttributeDefinition) -> Result<&DatatypeDefinition> {
        let target = attribute.datatype.target();
        let datatype = self
            .datatype(target)
            .ok_or_else(|| unresolved(target, attribute.identifier(), "datatype"))?;
        if datatype.value_kind() != attribute.kind {
            return Err(ValidationError::KindMismatch {
                definition: target.clone(),
                expected: datatype.value_kind(),
                found: attribute.kind,
            });
        }
        Ok(datatype)
    }

    fn check_values(
        &self,
        owner: &Identifier,
        spec_type: &SpecType,
        values: &[AttributeValue],
    ) -> Result<()> {
        let mut seen = HashSet::new();
        for value in values {
            let definition = value.definition.target();
            if !seen.insert(definition) {
                return Err(ValidationError::DuplicateIdentifier(definition.clone()));
            }
            self.check_value(owner, spec_type, definition, &value.value)?;
        }
        Ok(())
    }

    fn check_value(
        &self,
        owner: &Identifier,
        spec_type: &SpecType,
        definition: &Identifier,
        value: &Value,
    ) -> Result<()> {
        let attribute =
            spec_type
                .attribute(definition)
                .ok_or_else(|| ValidationError::ForeignDefinition {
                    owner: owner.clone(),
                    definition: definition.clone(),
                })?;
        let datatype = self.check_definition(attribute)?;
        self.check_literal_value(attribute, datatype, value)
    }

    fn check_literal_value(
        &self,
        attribute: &AttributeDefinition,
        datatype: &DatatypeDefinition,
        value: &Value,
    ) -> Result<()> {
        let definition = attribute.identifier();
        if value.kind() != attribute.kind {
            return Err(ValidationError::KindMismatch {
                definition: definition.clone(),
                expected: attribute.kind,
                found: value.kind(),
            });
        }

        if let Value::Enumeration(selected) = value {
            if selected.len() > 1 && !attribute.is_multi_valued() {
                return Err(ValidationError::NotMultiValued {
                    definition: definition.clone(),
                    count: selected.len(),
                });
            }
            for literal in selected.iter() {
                if datatype.enum_value(literal.target()).is_none() {
                    return Err(ValidationError::UnknownLiteral {
                        literal: literal.target().clone(),
                        datatype: datatype.identifier().clone(),
                    });
                }
            }
        }

        if !matches!(datatype.kind, DatatypeKind::Enumeration { .. }) {
            check_range(&datatype.kind, value).map_err(|reason| ValidationError::OutOfRange {
                definition: definition.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    fn owner_location(&self, owner: &Identifier) -> Result<Location> {
        match self.index.get(owner) {
            Some(
                location @ (Location::SpecObject(_)
                | Location::SpecRelation(_)
                | Location::Specification(_)),
            ) => Ok(location.clone()),
            _ => Err(not_found(owner, "spec object, relation or specification")),
        }
    }

    fn owner_spec_type(&self, owner: &Identifier, location: &Location) -> Result<&SpecType> {
        let (reference, kind) = match location {
            Location::SpecObject(o) => self
                .spec_objects
                .get(*o)
                .map(|o| (&o.spec_type, SpecTypeKind::SpecObject)),
            Location::SpecRelation(r) => self
                .spec_relations
                .get(*r)
                .map(|r| (&r.spec_type, SpecTypeKind::SpecRelation)),
            Location::Specification(s) => self
                .specifications
                .get(*s)
                .map(|s| (&s.spec_type, SpecTypeKind::Specification)),
            _ => None,
        }
        .ok_or_else(|| not_found(owner, "spec object, relation or specification"))?;
        self.typed(reference, kind, owner)
    }

    fn owner_mut(&mut self, location: &Location) -> Option<&mut dyn Attributed> {
        match location {
            Location::SpecObject(o) => self.spec_objects.get_mut(*o).map(|o| o as &mut dyn Attributed),
            Location::SpecRelation(r) => self
                .spec_relations
                .get_mut(*r)
                .map(|r| r as &mut dyn Attributed),
            Location::Specification(s) => self
                .specifications
                .get_mut(*s)
                .map(|s| s as &mut dyn Attributed),
            _ => None,
        }
    }
}

/// Keeps the element layout of an existing value when it is replaced by a
/// value of the same kind.
fn carry_layout(old: &mut Value, mut new: Value) -> Value {
    match (old, &mut new) {
        (Value::Enumeration(old), Value::Enumeration(new)) if new.extra.is_none() => {
            new.extra = old.extra.take();
        }
        (Value::Xhtml(old), Value::Xhtml(new)) => {
            if new.the_value.extra.is_synthetic() {
                new.the_value.extra = std::mem::take(&mut old.the_value.extra);
            }
            if new.is_simplified.is_none() {
                new.is_simplified = old.is_simplified;
            }
        }
        _ => {}
    }
    new
}

/// Removes every node placing `object`, with its subtree.
fn prune(children: &mut super::Sequence<SpecHierarchy>, object: &Identifier) {
    children.retain(|node| node.object.target() != object);
    for child in children.iter_mut() {
        prune(&mut child.children, object);
    }
}

fn collect_node_ids<'a>(nodes: &'a [SpecHierarchy], out: &mut Vec<&'a Identifier>) {
    for node in nodes {
        out.push(node.identifier());
        collect_node_ids(&node.children, out);
    }
}

const fn spec_type_name(kind: SpecTypeKind) -> &'static str {
    match kind {
        SpecTypeKind::SpecObject => "spec object type",
        SpecTypeKind::SpecRelation => "spec relation type",
        SpecTypeKind::Specification => "specification type",
        SpecTypeKind::RelationGroup => "relation group type",
    }
}

fn not_found(identifier: &Identifier, expected: &'static str) -> ValidationError {
    ValidationError::NotFound {
        identifier: identifier.clone(),
        expected,
    }
}

fn unresolved(identifier: &Identifier, referrer: &Identifier, expected: &'static str) -> ValidationError {
    ValidationError::Unresolved(UnresolvedReference {
        identifier: identifier.clone(),
        referrer: referrer.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{EnumValue, Metadata, Reference};

    fn id(value: &str) -> Identifier {
        Identifier::new(value).unwrap()
    }

    fn meta(value: &str) -> Metadata {
        Metadata::new(id(value))
    }

    fn attribute(identifier: &str, kind: ValueKind, datatype: &str) -> AttributeDefinition {
        AttributeDefinition::new(meta(identifier), kind, id(datatype))
    }

    /// A document with one object type carrying one attribute of each kind,
    /// one relation type, one specification type and two objects.
    fn document() -> Document {
        let mut document = Document::new();
        let datatypes = [
            DatatypeDefinition::new(meta("DT-BOOL"), DatatypeKind::Boolean),
            DatatypeDefinition::new(
                meta("DT-INT"),
                DatatypeKind::Integer {
                    min: Some(0),
                    max: Some(100),
                },
            ),
            DatatypeDefinition::new(meta("DT-STR"), DatatypeKind::String { max_length: Some(10) }),
            DatatypeDefinition::new(
                meta("DT-ENUM"),
                DatatypeKind::Enumeration {
                    values: vec![EnumValue::new(meta("EV-LOW"), 0), EnumValue::new(meta("EV-HIGH"), 1)]
                        .into(),
                },
            ),
        ];
        for datatype in datatypes {
            document.apply(Mutation::AddDatatype(datatype)).unwrap();
        }

        let mut object_type = SpecType::new(meta("SOT"), SpecTypeKind::SpecObject);
        object_type.attributes.push(attribute("AD-DONE", ValueKind::Boolean, "DT-BOOL"));
        object_type.attributes.push(attribute("AD-PRIO", ValueKind::Integer, "DT-INT"));
        object_type.attributes.push(attribute("AD-TEXT", ValueKind::String, "DT-STR"));
        object_type.attributes.push(attribute("AD-LEVEL", ValueKind::Enumeration, "DT-ENUM"));
        document.apply(Mutation::AddSpecType(object_type)).unwrap();
        document
            .apply(Mutation::AddSpecType(SpecType::new(meta("SRT"), SpecTypeKind::SpecRelation)))
            .unwrap();
        document
            .apply(Mutation::AddSpecType(SpecType::new(meta("ST"), SpecTypeKind::Specification)))
            .unwrap();

        for object in ["SO-1", "SO-2"] {
            document
                .apply(Mutation::AddSpecObject(SpecObject::new(meta(object), id("SOT"))))
                .unwrap();
        }
        document
    }

    fn set(owner: &str, definition: &str, value: Value) -> Mutation {
        Mutation::SetAttributeValue {
            owner: id(owner),
            definition: id(definition),
            value,
        }
    }

    fn enumeration(literals: &[&str]) -> Value {
        Value::Enumeration(literals.iter().map(|l| Reference::new(id(l))).collect())
    }

    #[test]
    fn setting_a_value_bumps_the_version_and_stamps_last_change() {
        let mut document = document();
        let before = document.version();

        let version = document.apply(set("SO-1", "AD-DONE", Value::Boolean(true))).unwrap();

        assert!(version > before);
        assert_eq!(document.version(), version);
        let object = document.spec_object("SO-1").unwrap();
        assert_eq!(object.value("AD-DONE").unwrap().value, Value::Boolean(true));
        assert!(object.metadata.last_changed().is_some());
    }

    #[test]
    fn setting_an_existing_value_replaces_it_in_place() {
        let mut document = document();
        document.apply(set("SO-1", "AD-PRIO", Value::Integer(1))).unwrap();
        document.apply(set("SO-1", "AD-DONE", Value::Boolean(false))).unwrap();
        document.apply(set("SO-1", "AD-PRIO", Value::Integer(2))).unwrap();

        let values: Vec<_> = document.spec_object("SO-1").unwrap().values
            .iter()
            .map(|v| (v.definition.target().to_string(), v.value.clone()))
            .collect();
        assert_eq!(
            values,
            [
                ("AD-PRIO".to_owned(), Value::Integer(2)),
                ("AD-DONE".to_owned(), Value::Boolean(false)),
            ]
        );
    }

    #[test_case(set("SO-1", "AD-DONE", Value::String("yes".into())); "kind mismatch")]
    #[test_case(set("SO-1", "AD-PRIO", Value::Integer(101)); "above max")]
    #[test_case(set("SO-1", "AD-TEXT", Value::String("far too long".into())); "too long")]
    #[test_case(set("SO-1", "AD-LEVEL", enumeration(&["EV-MID"])); "unknown literal")]
    #[test_case(set("SO-1", "AD-LEVEL", enumeration(&["EV-LOW", "EV-HIGH"])); "single valued")]
    #[test_case(set("SO-1", "AD-OTHER", Value::Boolean(true)); "foreign definition")]
    #[test_case(set("SO-9", "AD-DONE", Value::Boolean(true)); "unknown owner")]
    #[test_case(Mutation::AddSpecObject(SpecObject::new(meta("SO-1"), id("SOT"))); "duplicate identifier")]
    #[test_case(Mutation::AddSpecObject(SpecObject::new(meta("SO-3"), id("SRT"))); "wrong spec type kind")]
    #[test_case(Mutation::AddRelation(SpecRelation::new(meta("R-1"), id("SRT"), id("SO-1"), id("SO-9"))); "dangling relation target")]
    #[test_case(Mutation::RemoveSpecObject { object: id("DT-BOOL"), cascade: true }; "remove wrong kind")]
    #[test_case(Mutation::AddSpecType({
        let mut t = SpecType::new(meta("SOT-2"), SpecTypeKind::SpecObject);
        t.attributes.push(attribute("AD-X", ValueKind::Integer, "DT-BOOL"));
        t
    }); "definition kind differs from datatype")]
    fn rejected_mutations_leave_the_document_unchanged(mutation: Mutation) {
        let mut document = document();
        let before = document.clone();

        assert!(document.apply(mutation).is_err());
        assert_eq!(document, before);
    }

    #[test]
    fn a_failed_reindex_leaves_the_document_unchanged() {
        let mut document = document();
        // bypass `apply`, so only the rebuilt index notices the clash
        document
            .spec_objects
            .push(SpecObject::new(meta("SO-2"), id("SOT")));
        let before = document.clone();

        let error = document
            .apply(set("SO-1", "AD-DONE", Value::Boolean(true)))
            .unwrap_err();
        assert!(matches!(error, ValidationError::Schema(_)));
        assert_eq!(document, before);
        assert_eq!(document.version(), before.version());
    }

    #[test]
    fn removing_a_referenced_object_requires_cascade() {
        let mut document = document();
        document
            .apply(Mutation::AddRelation(SpecRelation::new(
                meta("R-1"),
                id("SRT"),
                id("SO-1"),
                id("SO-2"),
            )))
            .unwrap();
        let mut specification = Specification::new(meta("SPEC"), id("ST"));
        specification.children.push(SpecHierarchy::new(meta("H-1"), id("SO-1")));
        specification.children.push(SpecHierarchy::new(meta("H-2"), id("SO-2")));
        document.apply(Mutation::AddSpecification(specification)).unwrap();

        let error = document
            .apply(Mutation::RemoveSpecObject {
                object: id("SO-1"),
                cascade: false,
            })
            .unwrap_err();
        assert!(matches!(error, ValidationError::StillReferenced { .. }));

        document
            .apply(Mutation::RemoveSpecObject {
                object: id("SO-1"),
                cascade: true,
            })
            .unwrap();
        assert!(document.spec_object("SO-1").is_none());
        assert!(document.spec_relation("R-1").is_none());
        assert!(document.entity("H-1").is_none());
        assert_eq!(document.placements_of("SO-2").len(), 1);
    }

    #[test]
    fn hierarchy_nodes_are_inserted_reordered_and_removed() {
        let mut document = document();
        document
            .apply(Mutation::AddSpecification(Specification::new(meta("SPEC"), id("ST"))))
            .unwrap();
        for (node, object) in [("H-1", "SO-1"), ("H-2", "SO-2")] {
            document
                .apply(Mutation::InsertHierarchyNode {
                    parent: id("SPEC"),
                    position: None,
                    node: SpecHierarchy::new(meta(node), id(object)),
                })
                .unwrap();
        }
        document
            .apply(Mutation::InsertHierarchyNode {
                parent: id("H-1"),
                position: Some(0),
                node: SpecHierarchy::new(meta("H-1-1"), id("SO-2")),
            })
            .unwrap();

        document
            .apply(Mutation::ReorderHierarchyChild {
                node: id("H-2"),
                position: 0,
            })
            .unwrap();
        let order: Vec<_> = document.specification("SPEC").unwrap().children
            .iter()
            .map(|node| node.identifier().to_string())
            .collect();
        assert_eq!(order, ["H-2", "H-1"]);
        assert_eq!(document.placements_of("SO-2").len(), 2);

        let error = document
            .apply(Mutation::ReorderHierarchyChild {
                node: id("H-2"),
                position: 2,
            })
            .unwrap_err();
        assert_eq!(error, ValidationError::PositionOutOfBounds { position: 2, len: 2 });

        document.apply(Mutation::RemoveHierarchyNode(id("H-1"))).unwrap();
        assert!(document.entity("H-1-1").is_none());
        assert!(document.spec_object("SO-1").is_some());
    }

    #[test]
    fn removing_a_relation_drops_it_from_groups() {
        let mut document = document();
        document
            .apply(Mutation::AddRelation(SpecRelation::new(
                meta("R-1"),
                id("SRT"),
                id("SO-1"),
                id("SO-2"),
            )))
            .unwrap();
        let mut group = crate::domain::RelationGroup::new(meta("G"), id("RGT"), id("S1"), id("S2"));
        group.relations.push(Reference::new(id("R-1")));
        document.relation_groups.push(group);
        document.reindex().unwrap();

        document.apply(Mutation::RemoveRelation(id("R-1"))).unwrap();
        assert!(document.relation_group("G").unwrap().relations.is_empty());
    }
}
