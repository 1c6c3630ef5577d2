use tracing::{debug, instrument};

use super::{
    names::{self, DESC, IDENTIFIER, LAST_CHANGE, LONG_NAME},
    slots::{Emit, Lexical, format_real},
};
use crate::{
    domain::{
        AttributeDefinition, AttributeValue, DatatypeDefinition, DatatypeKind, Document, EnumValue,
        Header, Metadata, OpaqueExtra, Reference, RelationGroup, Sequence, SpecHierarchy,
        SpecObject, SpecRelation, SpecType, SpecTypeKind, Specification, Value, XhtmlContent,
    },
    xml::{self, Element, XmlTree},
};

/// Encodes a document as a ReqIF tree.
///
/// Content read from a source document comes back in its original layout:
/// unrecognised elements and attributes at their original positions, and
/// unchanged values in their original spelling. New content is written in
/// schema order.
#[must_use]
#[instrument(level = "debug", skip_all, fields(version = %document.version()))]
pub fn encode(document: &Document) -> XmlTree {
    let mut tree = document.envelope.shell.clone();
    tree.set_root(root(document));
    debug!("encoded document");
    tree
}

/// Encodes and renders a document.
#[must_use]
pub fn to_bytes(document: &Document) -> Vec<u8> {
    xml::render(&encode(document))
}

fn root(document: &Document) -> Element {
    let envelope = &document.envelope;

    let mut content = Emit::new("REQ-IF-CONTENT", &envelope.content);
    content.child(
        "DATATYPES",
        sequence(&document.datatypes, "DATATYPES", datatype),
    );
    content.child(
        "SPEC-TYPES",
        sequence(&document.spec_types, "SPEC-TYPES", spec_type),
    );
    content.child(
        "SPEC-OBJECTS",
        sequence(&document.spec_objects, "SPEC-OBJECTS", spec_object),
    );
    content.child(
        "SPEC-RELATIONS",
        sequence(&document.spec_relations, "SPEC-RELATIONS", spec_relation),
    );
    content.child(
        "SPECIFICATIONS",
        sequence(&document.specifications, "SPECIFICATIONS", specification),
    );
    content.child(
        "SPEC-RELATION-GROUPS",
        sequence(
            &document.relation_groups,
            "SPEC-RELATION-GROUPS",
            relation_group,
        ),
    );

    let mut core_content = Emit::new("CORE-CONTENT", &envelope.core_content);
    core_content.child("REQ-IF-CONTENT", Some(content.finish()));

    let mut root = Emit::new("REQ-IF", &envelope.root);
    root.child("THE-HEADER", Some(header(&document.header)));
    root.child("CORE-CONTENT", Some(core_content.finish()));
    root.child(
        "TOOL-EXTENSIONS",
        sequence(&document.tool_extensions, "TOOL-EXTENSIONS", |extension| {
            extension.element.clone()
        }),
    );
    root.finish()
}

/// A list element, or nothing for an empty list that was not in the source.
fn sequence<T>(
    items: &Sequence<T>,
    name: &'static str,
    encode: impl Fn(&T) -> Element,
) -> Option<Element> {
    let synthetic = OpaqueExtra::default();
    let extra = match items.extra() {
        Some(extra) => extra,
        None if items.is_empty() => return None,
        None => &synthetic,
    };
    let mut emit = Emit::new(name, extra);
    for item in items {
        emit.item(encode(item));
    }
    Some(emit.finish())
}

fn metadata(emit: &mut Emit<'_>, metadata: &Metadata) {
    emit.attr(
        IDENTIFIER,
        Some(metadata.identifier().to_string()),
        Lexical::Text,
    );
    emit.attr(LAST_CHANGE, metadata.last_change.clone(), Lexical::Text);
    emit.attr(LONG_NAME, metadata.long_name.clone(), Lexical::Text);
    emit.attr(DESC, metadata.desc.clone(), Lexical::Text);
}

fn flag(value: Option<bool>) -> Option<String> {
    value.map(|value| value.to_string())
}

fn reference(reference: &Reference, name: &'static str) -> Element {
    let mut emit = Emit::new(name, &reference.element);
    emit.text(reference.target().to_string(), Lexical::Token);
    emit.finish()
}

fn wrapped(reference: &Reference, wrapper: &'static str, name: &'static str) -> Element {
    let mut emit = Emit::new(wrapper, &reference.wrapper);
    emit.child(name, Some(self::reference(reference, name)));
    emit.finish()
}

fn header(header: &Header) -> Element {
    let synthetic = OpaqueExtra::default();
    let mut inner = Emit::new("REQ-IF-HEADER", &header.extra);
    inner.attr(
        IDENTIFIER,
        Some(header.identifier().to_string()),
        Lexical::Text,
    );
    for (name, value) in header.field_values() {
        let field = value.map(|value| {
            let mut field = Emit::new(name, header.field_extra(name).unwrap_or(&synthetic));
            field.text(value.to_owned(), Lexical::Text);
            field.finish()
        });
        inner.child(name, field);
    }

    let mut wrapper = Emit::new("THE-HEADER", &header.wrapper);
    wrapper.child("REQ-IF-HEADER", Some(inner.finish()));
    wrapper.finish()
}

fn datatype(datatype: &DatatypeDefinition) -> Element {
    let mut emit = Emit::new(names::datatype(datatype.value_kind()), &datatype.extra);
    metadata(&mut emit, &datatype.metadata);
    match &datatype.kind {
        DatatypeKind::Integer { min, max } => {
            emit.attr("MAX", max.map(|v| v.to_string()), Lexical::Integer);
            emit.attr("MIN", min.map(|v| v.to_string()), Lexical::Integer);
        }
        DatatypeKind::Real { min, max, accuracy } => {
            emit.attr("ACCURACY", accuracy.map(|v| v.to_string()), Lexical::Integer);
            emit.attr("MAX", max.map(format_real), Lexical::Real);
            emit.attr("MIN", min.map(format_real), Lexical::Real);
        }
        DatatypeKind::String { max_length } => {
            emit.attr(
                "MAX-LENGTH",
                max_length.map(|v| v.to_string()),
                Lexical::Integer,
            );
        }
        DatatypeKind::Enumeration { values } => {
            emit.child(
                "SPECIFIED-VALUES",
                sequence(values, "SPECIFIED-VALUES", enum_value),
            );
        }
        DatatypeKind::Boolean | DatatypeKind::Date | DatatypeKind::Xhtml => {}
    }
    emit.finish()
}

fn enum_value(value: &EnumValue) -> Element {
    let mut emit = Emit::new("ENUM-VALUE", &value.extra);
    metadata(&mut emit, &value.metadata);

    let properties = value.properties.as_ref().map(|properties| {
        let mut embedded = Emit::new("EMBEDDED-VALUE", &properties.extra);
        embedded.attr("KEY", Some(properties.key.to_string()), Lexical::Integer);
        embedded.attr(
            "OTHER-CONTENT",
            Some(properties.other_content.clone()),
            Lexical::Text,
        );
        let mut wrapper = Emit::new("PROPERTIES", &properties.wrapper);
        wrapper.child("EMBEDDED-VALUE", Some(embedded.finish()));
        wrapper.finish()
    });
    emit.child("PROPERTIES", properties);
    emit.finish()
}

fn spec_type(spec_type: &SpecType) -> Element {
    let mut emit = Emit::new(names::spec_type(spec_type.kind), &spec_type.extra);
    metadata(&mut emit, &spec_type.metadata);
    emit.child(
        "SPEC-ATTRIBUTES",
        sequence(
            &spec_type.attributes,
            "SPEC-ATTRIBUTES",
            attribute_definition,
        ),
    );
    emit.finish()
}

fn attribute_definition(definition: &AttributeDefinition) -> Element {
    let mut emit = Emit::new(
        names::attribute_definition(definition.kind),
        &definition.extra,
    );
    metadata(&mut emit, &definition.metadata);
    emit.attr("IS-EDITABLE", flag(definition.is_editable), Lexical::Boolean);
    emit.attr("MULTI-VALUED", flag(definition.multi_valued), Lexical::Boolean);

    let default_value = definition.default_value.as_ref().map(|default| {
        let name = names::attribute_value(default.value.value.kind());
        let mut wrapper = Emit::new("DEFAULT-VALUE", &default.extra);
        wrapper.child(name, Some(attribute_value(&default.value)));
        wrapper.finish()
    });
    emit.child("DEFAULT-VALUE", default_value);
    emit.child(
        "TYPE",
        Some(wrapped(
            &definition.datatype,
            "TYPE",
            names::datatype_ref(definition.kind),
        )),
    );
    emit.finish()
}

fn attribute_value(value: &AttributeValue) -> Element {
    let kind = value.value.kind();
    let mut emit = Emit::new(names::attribute_value(kind), &value.extra);
    let definition = Some(wrapped(
        &value.definition,
        "DEFINITION",
        names::attribute_definition_ref(kind),
    ));

    match &value.value {
        Value::Boolean(v) => emit.attr("THE-VALUE", Some(v.to_string()), Lexical::Boolean),
        Value::Integer(v) => emit.attr("THE-VALUE", Some(v.to_string()), Lexical::Integer),
        Value::Real(v) => emit.attr("THE-VALUE", Some(format_real(*v)), Lexical::Real),
        Value::String(v) | Value::Date(v) => {
            emit.attr("THE-VALUE", Some(v.clone()), Lexical::Text);
        }
        Value::Enumeration(_) | Value::Xhtml(_) => {}
    }
    if let Value::Xhtml(xhtml) = &value.value {
        emit.attr("IS-SIMPLIFIED", flag(xhtml.is_simplified), Lexical::Boolean);
    }

    emit.child("DEFINITION", definition);
    match &value.value {
        Value::Enumeration(literals) => {
            emit.child(
                "VALUES",
                sequence(literals, "VALUES", |literal| {
                    reference(literal, "ENUM-VALUE-REF")
                }),
            );
        }
        Value::Xhtml(xhtml) => {
            emit.child(
                "THE-ORIGINAL-VALUE",
                xhtml
                    .original_value
                    .as_ref()
                    .map(|content| xhtml_content(content, "THE-ORIGINAL-VALUE")),
            );
            emit.child(
                "THE-VALUE",
                Some(xhtml_content(&xhtml.the_value, "THE-VALUE")),
            );
        }
        _ => {}
    }
    emit.finish()
}

fn xhtml_content(content: &XhtmlContent, name: &'static str) -> Element {
    let mut element = Emit::new(name, &content.extra).finish();
    *element.children_mut() = content.nodes().to_vec();
    element.set_verbatim(content.source().map(str::to_owned));
    element.set_preserves_whitespace(true);
    element
}

fn values(emit: &mut Emit<'_>, values: &Sequence<AttributeValue>) {
    emit.child("VALUES", sequence(values, "VALUES", attribute_value));
}

fn spec_object(object: &SpecObject) -> Element {
    let mut emit = Emit::new("SPEC-OBJECT", &object.extra);
    metadata(&mut emit, &object.metadata);
    values(&mut emit, &object.values);
    emit.child(
        "TYPE",
        Some(wrapped(
            &object.spec_type,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::SpecObject),
        )),
    );
    emit.finish()
}

fn spec_relation(relation: &SpecRelation) -> Element {
    let mut emit = Emit::new("SPEC-RELATION", &relation.extra);
    metadata(&mut emit, &relation.metadata);
    values(&mut emit, &relation.values);
    emit.child(
        "TARGET",
        Some(wrapped(&relation.target, "TARGET", "SPEC-OBJECT-REF")),
    );
    emit.child(
        "SOURCE",
        Some(wrapped(&relation.source, "SOURCE", "SPEC-OBJECT-REF")),
    );
    emit.child(
        "TYPE",
        Some(wrapped(
            &relation.spec_type,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::SpecRelation),
        )),
    );
    emit.finish()
}

fn specification(specification: &Specification) -> Element {
    let mut emit = Emit::new("SPECIFICATION", &specification.extra);
    metadata(&mut emit, &specification.metadata);
    values(&mut emit, &specification.values);
    emit.child(
        "CHILDREN",
        sequence(&specification.children, "CHILDREN", spec_hierarchy),
    );
    emit.child(
        "TYPE",
        Some(wrapped(
            &specification.spec_type,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::Specification),
        )),
    );
    emit.finish()
}

fn spec_hierarchy(node: &SpecHierarchy) -> Element {
    let mut emit = Emit::new("SPEC-HIERARCHY", &node.extra);
    metadata(&mut emit, &node.metadata);
    emit.attr("IS-EDITABLE", flag(node.is_editable), Lexical::Boolean);
    emit.attr(
        "IS-TABLE-INTERNAL",
        flag(node.is_table_internal),
        Lexical::Boolean,
    );
    emit.child(
        "OBJECT",
        Some(wrapped(&node.object, "OBJECT", "SPEC-OBJECT-REF")),
    );
    emit.child(
        "CHILDREN",
        sequence(&node.children, "CHILDREN", spec_hierarchy),
    );
    emit.finish()
}

fn relation_group(group: &RelationGroup) -> Element {
    let mut emit = Emit::new("RELATION-GROUP", &group.extra);
    metadata(&mut emit, &group.metadata);
    emit.child(
        "SOURCE-SPECIFICATION",
        Some(wrapped(
            &group.source_specification,
            "SOURCE-SPECIFICATION",
            "SPECIFICATION-REF",
        )),
    );
    emit.child(
        "SPEC-RELATIONS",
        sequence(&group.relations, "SPEC-RELATIONS", |relation| {
            reference(relation, "SPEC-RELATION-REF")
        }),
    );
    emit.child(
        "TARGET-SPECIFICATION",
        Some(wrapped(
            &group.target_specification,
            "TARGET-SPECIFICATION",
            "SPECIFICATION-REF",
        )),
    );
    emit.child(
        "TYPE",
        Some(wrapped(
            &group.spec_type,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::RelationGroup),
        )),
    );
    emit.finish()
}
