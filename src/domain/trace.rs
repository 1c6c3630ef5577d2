use petgraph::{
    Direction,
    algo::{has_path_connecting, is_cyclic_directed, tarjan_scc},
    graphmap::DiGraphMap,
};

use super::{Document, SpecRelation};

/// The spec relations of a document as a directed graph over spec objects.
///
/// Relations are directed from source to target. Traversal in the other
/// direction gives the derived, bidirectional view.
#[derive(Debug)]
pub struct TraceGraph<'a> {
    document: &'a Document,
    graph: DiGraphMap<&'a str, Vec<&'a SpecRelation>>,
}

impl<'a> TraceGraph<'a> {
    /// Builds the graph of every relation in the document.
    #[must_use]
    pub fn new(document: &'a Document) -> Self {
        let mut graph: DiGraphMap<&'a str, Vec<&'a SpecRelation>> = DiGraphMap::with_capacity(
            document.spec_objects().len(),
            document.spec_relations().len(),
        );
        for object in document.spec_objects() {
            graph.add_node(object.metadata.identifier().as_str());
        }
        for relation in document.spec_relations() {
            let source = relation.source.target().as_str();
            let target = relation.target.target().as_str();
            if let Some(relations) = graph.edge_weight_mut(source, target) {
                relations.push(relation);
            } else {
                graph.add_edge(source, target, vec![relation]);
            }
        }
        Self { document, graph }
    }

    fn node(&self, object: &str) -> Option<&'a str> {
        self.document
            .spec_object(object)
            .map(|object| object.metadata.identifier().as_str())
    }

    fn relations(&self, object: &str, direction: Direction) -> Vec<&'a SpecRelation> {
        let Some(node) = self.node(object) else {
            return Vec::new();
        };
        let mut relations: Vec<_> = self
            .graph
            .edges_directed(node, direction)
            .flat_map(|(_, _, relations)| relations.iter().copied())
            .collect();
        relations.sort_by(|a, b| a.metadata.identifier().cmp(b.metadata.identifier()));
        relations
    }

    /// Relations with `object` as their source.
    #[must_use]
    pub fn outgoing(&self, object: &str) -> Vec<&'a SpecRelation> {
        self.relations(object, Direction::Outgoing)
    }

    /// Relations with `object` as their target.
    #[must_use]
    pub fn incoming(&self, object: &str) -> Vec<&'a SpecRelation> {
        self.relations(object, Direction::Incoming)
    }

    /// Objects related to `object` in either direction, sorted.
    #[must_use]
    pub fn linked(&self, object: &str) -> Vec<&'a str> {
        let Some(node) = self.node(object) else {
            return Vec::new();
        };
        let mut linked: Vec<_> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(node, Direction::Incoming))
            .collect();
        linked.sort_unstable();
        linked.dedup();
        linked
    }

    /// Whether `to` can be reached from `from` by following relations.
    #[must_use]
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        match (self.node(from), self.node(to)) {
            (Some(from), Some(to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Determine whether the relations contain any cycles.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Every cycle, as the sorted identifiers of the objects in it.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<&'a str>> {
        let mut cycles = Vec::new();

        for mut component in tarjan_scc(&self.graph) {
            if component.len() > 1 {
                component.sort_unstable();
                cycles.push(component);
                continue;
            }

            let Some(&node) = component.first() else {
                continue;
            };

            if self.graph.contains_edge(node, node) {
                cycles.push(vec![node]);
            }
        }

        cycles.sort();
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identifier, Metadata, Mutation, SpecObject, SpecType, SpecTypeKind};

    fn id(value: &str) -> Identifier {
        Identifier::new(value).unwrap()
    }

    fn document(objects: &[&str], relations: &[(&str, &str, &str)]) -> Document {
        let mut document = Document::new();
        for (type_id, kind) in [("SOT", SpecTypeKind::SpecObject), ("SRT", SpecTypeKind::SpecRelation)] {
            document
                .apply(Mutation::AddSpecType(SpecType::new(Metadata::new(id(type_id)), kind)))
                .unwrap();
        }
        for object in objects {
            document
                .apply(Mutation::AddSpecObject(SpecObject::new(
                    Metadata::new(id(object)),
                    id("SOT"),
                )))
                .unwrap();
        }
        for (relation, source, target) in relations {
            document
                .apply(Mutation::AddRelation(SpecRelation::new(
                    Metadata::new(id(relation)),
                    id("SRT"),
                    id(source),
                    id(target),
                )))
                .unwrap();
        }
        document
    }

    fn ids(relations: &[&SpecRelation]) -> Vec<String> {
        relations
            .iter()
            .map(|relation| relation.metadata.identifier().to_string())
            .collect()
    }

    #[test]
    fn relations_are_traversed_in_both_directions() {
        let document = document(
            &["A", "B", "C"],
            &[("R1", "A", "B"), ("R2", "A", "B"), ("R3", "C", "A")],
        );
        let graph = TraceGraph::new(&document);

        assert_eq!(ids(&graph.outgoing("A")), ["R1", "R2"]);
        assert_eq!(ids(&graph.incoming("A")), ["R3"]);
        assert_eq!(graph.linked("A"), ["B", "C"]);
        assert!(graph.is_reachable("C", "B"));
        assert!(!graph.is_reachable("B", "C"));
        assert!(graph.outgoing("missing").is_empty());
    }

    #[test]
    fn cycles_are_reported() {
        let document = document(
            &["A", "B", "C", "D"],
            &[("R1", "A", "B"), ("R2", "B", "A"), ("R3", "C", "C"), ("R4", "C", "D")],
        );
        let graph = TraceGraph::new(&document);

        assert!(graph.has_cycles());
        assert_eq!(graph.cycles(), [vec!["A", "B"], vec!["C"]]);
    }

    #[test]
    fn acyclic_relations_have_no_cycles() {
        let document = document(&["A", "B"], &[("R1", "A", "B")]);
        assert!(!TraceGraph::new(&document).has_cycles());
        assert!(TraceGraph::new(&document).cycles().is_empty());
    }
}
