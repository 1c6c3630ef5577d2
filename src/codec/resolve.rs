use super::{DecodeError, Mode, names};
use crate::domain::{
    AttributeValue, Document, EntityRef, Reference, SchemaError, SchemaErrorKind, SpecHierarchy,
    SpecTypeKind, UnresolvedReference, Value,
};

/// Checks that every reference in a freshly decoded document resolves to an
/// element of the right kind, and that values agree with their definitions.
///
/// In strict mode the first problem in document order is returned. In
/// lenient mode every problem is recorded as a warning.
pub(super) fn check(
    document: &Document,
    mode: Mode,
    warnings: &mut Vec<DecodeError>,
) -> Result<(), DecodeError> {
    let mut resolver = Resolver {
        document,
        problems: Vec::new(),
    };
    resolver.run();

    match mode {
        Mode::Strict => resolver.problems.into_iter().next().map_or(Ok(()), Err),
        Mode::Lenient => {
            warnings.extend(resolver.problems);
            Ok(())
        }
    }
}

struct Resolver<'a> {
    document: &'a Document,
    problems: Vec<DecodeError>,
}

impl Resolver<'_> {
    fn run(&mut self) {
        let document = self.document;

        for spec_type in document.spec_types() {
            for attribute in &spec_type.attributes {
                let referrer = attribute.metadata.identifier().as_str();
                match document.datatype(attribute.datatype.target()) {
                    None => self.unresolved(
                        &attribute.datatype,
                        referrer,
                        names::datatype(attribute.kind),
                    ),
                    Some(datatype) if datatype.value_kind() != attribute.kind => {
                        self.schema(
                            referrer,
                            SchemaErrorKind::KindMismatch {
                                definition: datatype.metadata.identifier().clone(),
                                expected: datatype.value_kind(),
                                found: attribute.kind,
                            },
                        );
                    }
                    Some(_) => {}
                }
                if let Some(default) = &attribute.default_value {
                    self.value(&default.value, referrer);
                }
            }
        }

        for object in document.spec_objects() {
            let referrer = object.metadata.identifier().as_str();
            self.spec_type(&object.spec_type, SpecTypeKind::SpecObject, referrer);
            self.values(&object.values, referrer);
        }

        for relation in document.spec_relations() {
            let referrer = relation.metadata.identifier().as_str();
            self.spec_type(&relation.spec_type, SpecTypeKind::SpecRelation, referrer);
            self.spec_object(&relation.source, referrer);
            self.spec_object(&relation.target, referrer);
            self.values(&relation.values, referrer);
        }

        for specification in document.specifications() {
            let referrer = specification.metadata.identifier().as_str();
            self.spec_type(
                &specification.spec_type,
                SpecTypeKind::Specification,
                referrer,
            );
            self.values(&specification.values, referrer);
            self.hierarchy(&specification.children);
        }

        for group in document.relation_groups() {
            let referrer = group.metadata.identifier().as_str();
            self.spec_type(&group.spec_type, SpecTypeKind::RelationGroup, referrer);
            for specification in [&group.source_specification, &group.target_specification] {
                if document.specification(specification.target()).is_none() {
                    self.unresolved(specification, referrer, "SPECIFICATION");
                }
            }
            for relation in &group.relations {
                if document.spec_relation(relation.target()).is_none() {
                    self.unresolved(relation, referrer, "SPEC-RELATION");
                }
            }
        }
    }

    fn unresolved(&mut self, reference: &Reference, referrer: &str, expected: &'static str) {
        self.problems.push(
            UnresolvedReference {
                identifier: reference.target().clone(),
                referrer: referrer.to_owned(),
                expected,
            }
            .into(),
        );
    }

    fn schema(&mut self, path: &str, kind: SchemaErrorKind) {
        self.problems.push(SchemaError::new(path, kind).into());
    }

    fn spec_type(&mut self, reference: &Reference, kind: SpecTypeKind, referrer: &str) {
        let resolved = self
            .document
            .spec_type(reference.target())
            .is_some_and(|spec_type| spec_type.kind == kind);
        if !resolved {
            self.unresolved(reference, referrer, names::spec_type(kind));
        }
    }

    fn spec_object(&mut self, reference: &Reference, referrer: &str) {
        if self.document.spec_object(reference.target()).is_none() {
            self.unresolved(reference, referrer, "SPEC-OBJECT");
        }
    }

    fn hierarchy(&mut self, nodes: &[SpecHierarchy]) {
        for node in nodes {
            self.spec_object(&node.object, node.metadata.identifier().as_str());
            self.hierarchy(&node.children);
        }
    }

    fn values(&mut self, values: &[AttributeValue], referrer: &str) {
        for value in values {
            self.value(value, referrer);
        }
    }

    fn value(&mut self, value: &AttributeValue, referrer: &str) {
        let found = value.value.kind();
        let Some((_, definition)) = self.document.attribute_definition(value.definition.target())
        else {
            self.unresolved(
                &value.definition,
                referrer,
                names::attribute_definition(found),
            );
            return;
        };

        if definition.kind != found {
            self.schema(
                referrer,
                SchemaErrorKind::KindMismatch {
                    definition: definition.metadata.identifier().clone(),
                    expected: definition.kind,
                    found,
                },
            );
            return;
        }

        let Value::Enumeration(literals) = &value.value else {
            return;
        };
        let datatype = definition.datatype.target();
        for literal in literals {
            match self.document.entity(literal.target()) {
                Some(EntityRef::EnumValue(_)) => {
                    let own = self
                        .document
                        .datatype(datatype)
                        .and_then(|d| d.enum_value(literal.target()))
                        .is_some();
                    if !own {
                        self.schema(
                            referrer,
                            SchemaErrorKind::ForeignLiteral {
                                literal: literal.target().clone(),
                                datatype: datatype.clone(),
                            },
                        );
                    }
                }
                _ => self.unresolved(literal, referrer, "ENUM-VALUE"),
            }
        }
    }
}
