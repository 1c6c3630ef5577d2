use serde::Serialize;

use super::{
    AttributeValue, Metadata, OpaqueExtra, Reference, Sequence, metadata::identifiable,
    spec_object::attributed,
};

/// A `SPECIFICATION`: a named tree imposing document structure over spec
/// objects.
///
/// The specification is the root of its hierarchy; its `CHILDREN` are the
/// top-level hierarchy nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specification {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// `TYPE`: the `SPECIFICATION-TYPE`.
    #[serde(rename = "type")]
    pub spec_type: Reference,
    /// `VALUES`
    pub values: Sequence<AttributeValue>,
    /// `CHILDREN`
    pub children: Sequence<SpecHierarchy>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

identifiable!(Specification, SpecHierarchy);
attributed!(Specification);

impl Specification {
    /// An empty specification.
    #[must_use]
    pub fn new(metadata: Metadata, spec_type: impl Into<Reference>) -> Self {
        Self {
            metadata,
            spec_type: spec_type.into(),
            values: Sequence::new(),
            children: Sequence::new(),
            extra: OpaqueExtra::default(),
        }
    }

    /// Every hierarchy node, depth first, with its path of child indices.
    #[must_use]
    pub fn nodes(&self) -> Vec<(Vec<usize>, &SpecHierarchy)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        collect(&self.children, &mut path, &mut out);
        out
    }

    /// The node at a path of child indices.
    #[must_use]
    pub fn node(&self, path: &[usize]) -> Option<&SpecHierarchy> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.children.get(*first)?, |node, index| {
                node.children.get(*index)
            })
    }

    /// Mutable access to the node at a path of child indices.
    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut SpecHierarchy> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.children.get_mut(*first)?, |node, index| {
                node.children.get_mut(*index)
            })
    }

    /// The child list at a path: the specification's own children for an
    /// empty path, otherwise the children of the node there.
    pub(crate) fn children_at_mut(&mut self, path: &[usize]) -> Option<&mut Sequence<SpecHierarchy>> {
        if path.is_empty() {
            Some(&mut self.children)
        } else {
            self.node_mut(path).map(|node| &mut node.children)
        }
    }

    /// The child list at a path, see [`Specification::children_at_mut`].
    pub(crate) fn children_at(&self, path: &[usize]) -> Option<&Sequence<SpecHierarchy>> {
        if path.is_empty() {
            Some(&self.children)
        } else {
            self.node(path).map(|node| &node.children)
        }
    }
}

fn collect<'a>(
    children: &'a [SpecHierarchy],
    path: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, &'a SpecHierarchy)>,
) {
    for (index, child) in children.iter().enumerate() {
        path.push(index);
        out.push((path.clone(), child));
        collect(&child.children, path, out);
        path.pop();
    }
}

/// A `SPEC-HIERARCHY` node.
///
/// A spec object may be placed under any number of nodes; the node refers to
/// it, it does not own it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecHierarchy {
    /// Identifier, names and modification time.
    #[serde(flatten)]
    pub metadata: Metadata,
    /// `OBJECT`: the placed spec object.
    pub object: Reference,
    /// `CHILDREN`
    pub children: Sequence<SpecHierarchy>,
    /// `IS-TABLE-INTERNAL`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_table_internal: Option<bool>,
    /// `IS-EDITABLE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_editable: Option<bool>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
}

impl SpecHierarchy {
    /// A leaf node placing `object`.
    #[must_use]
    pub fn new(metadata: Metadata, object: impl Into<Reference>) -> Self {
        Self {
            metadata,
            object: object.into(),
            children: Sequence::new(),
            is_table_internal: None,
            is_editable: None,
            extra: OpaqueExtra::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identifier;

    fn node(id: &str, object: &str) -> SpecHierarchy {
        SpecHierarchy::new(
            Metadata::new(Identifier::new(id).unwrap()),
            Identifier::new(object).unwrap(),
        )
    }

    fn specification() -> Specification {
        let mut spec = Specification::new(
            Metadata::new(Identifier::new("SPEC").unwrap()),
            Identifier::new("ST").unwrap(),
        );
        let mut chapter = node("H-1", "SO-1");
        chapter.children.push(node("H-1-1", "SO-2"));
        chapter.children.push(node("H-1-2", "SO-3"));
        spec.children.push(chapter);
        spec.children.push(node("H-2", "SO-1"));
        spec
    }

    #[test]
    fn nodes_are_listed_depth_first_with_paths() {
        let spec = specification();
        let nodes: Vec<_> = spec
            .nodes()
            .into_iter()
            .map(|(path, node)| (path, node.metadata.identifier().to_string()))
            .collect();
        assert_eq!(
            nodes,
            [
                (vec![0], "H-1".to_owned()),
                (vec![0, 0], "H-1-1".to_owned()),
                (vec![0, 1], "H-1-2".to_owned()),
                (vec![1], "H-2".to_owned()),
            ]
        );
    }

    #[test]
    fn nodes_are_addressed_by_path() {
        let mut spec = specification();
        assert_eq!(spec.node(&[0, 1]).unwrap().object.target().as_str(), "SO-3");
        assert!(spec.node(&[0, 2]).is_none());
        assert!(spec.node(&[]).is_none());

        spec.node_mut(&[1]).unwrap().is_editable = Some(false);
        assert_eq!(spec.node(&[1]).unwrap().is_editable, Some(false));
        assert_eq!(spec.children_at(&[0]).unwrap().len(), 2);
        assert_eq!(spec.children_at(&[]).unwrap().len(), 2);
    }
}
