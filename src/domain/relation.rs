use serde::Serialize;

use super::{
    AttributeValue, Metadata, OpaqueExtra, Reference, Sequence, metadata::identifiable,
    spec_object::attributed,
};

/// A `SPEC-RELATION`: a directed, typed link between two spec objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecRelation {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// `TYPE`: the `SPEC-RELATION-TYPE`.
    #[serde(rename = "type")]
    pub spec_type: Reference,
    /// `SOURCE`
    pub source: Reference,
    /// `TARGET`
    pub target: Reference,
    /// `VALUES`
    pub values: Sequence<AttributeValue>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

identifiable!(SpecRelation, RelationGroup);
attributed!(SpecRelation);

impl SpecRelation {
    /// A relation with no values.
    #[must_use]
    pub fn new(
        metadata: Metadata,
        spec_type: impl Into<Reference>,
        source: impl Into<Reference>,
        target: impl Into<Reference>,
    ) -> Self {
        Self {
            metadata,
            spec_type: spec_type.into(),
            source: source.into(),
            target: target.into(),
            values: Sequence::new(),
            extra: OpaqueExtra::default(),
        }
    }

    /// Whether the relation touches the object at either end.
    #[must_use]
    pub fn involves(&self, object: &str) -> bool {
        self.source.target().as_str() == object || self.target.target().as_str() == object
    }
}

/// A `RELATION-GROUP`: relations between the objects of two specifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationGroup {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// `TYPE`: the `RELATION-GROUP-TYPE`.
    #[serde(rename = "type")]
    pub spec_type: Reference,
    /// `SOURCE-SPECIFICATION`
    pub source_specification: Reference,
    /// `TARGET-SPECIFICATION`
    pub target_specification: Reference,
    /// `SPEC-RELATIONS`: the grouped relations.
    pub relations: Sequence<Reference>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

impl RelationGroup {
    /// An empty group.
    #[must_use]
    pub fn new(
        metadata: Metadata,
        spec_type: impl Into<Reference>,
        source_specification: impl Into<Reference>,
        target_specification: impl Into<Reference>,
    ) -> Self {
        Self {
            metadata,
            spec_type: spec_type.into(),
            source_specification: source_specification.into(),
            target_specification: target_specification.into(),
            relations: Sequence::new(),
            extra: OpaqueExtra::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identifier;

    #[test]
    fn relation_involves_both_ends() {
        let id = |s: &str| Identifier::new(s).unwrap();
        let relation = SpecRelation::new(Metadata::new(id("R-1")), id("SRT"), id("SO-1"), id("SO-2"));
        assert!(relation.involves("SO-1"));
        assert!(relation.involves("SO-2"));
        assert!(!relation.involves("SO-3"));
    }
}
