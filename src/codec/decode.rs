use std::str::FromStr;

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use super::{
    DecodeError,
    names::{
        self, CONTENT_SECTIONS, DESC, HEADER_FIELDS, IDENTIFIER, LAST_CHANGE, LONG_NAME,
        METADATA,
    },
    resolve,
    slots::{capture, capture_tag, is_reqif, item_key, parse_real},
};
use crate::{
    domain::{
        AttributeDefinition, AttributeValue, ChildSlot, DatatypeDefinition, DatatypeKind,
        DefaultValue, Document, EmbeddedValue, EnumValue, Envelope, Header, Identifier, Index,
        Metadata, Reference, RelationGroup, SchemaError, SchemaErrorKind, Sequence, SpecHierarchy,
        SpecObject, SpecRelation, SpecType, SpecTypeKind, Specification, ToolExtension, Value,
        ValueKind, Version, XhtmlContent, XhtmlValue, parse_boolean,
    },
    xml::{Element, Node, XmlTree},
};

type Result<T> = std::result::Result<T, SchemaError>;

const INTEGER_ATTRIBUTES: [&str; 6] = [DESC, IDENTIFIER, LAST_CHANGE, LONG_NAME, "MAX", "MIN"];
const REAL_ATTRIBUTES: [&str; 7] = [
    DESC,
    IDENTIFIER,
    LAST_CHANGE,
    LONG_NAME,
    "ACCURACY",
    "MAX",
    "MIN",
];
const STRING_ATTRIBUTES: [&str; 5] = [DESC, IDENTIFIER, LAST_CHANGE, LONG_NAME, "MAX-LENGTH"];
const DEFINITION_ATTRIBUTES: [&str; 6] = [
    DESC,
    IDENTIFIER,
    LAST_CHANGE,
    LONG_NAME,
    "IS-EDITABLE",
    "MULTI-VALUED",
];
const HIERARCHY_ATTRIBUTES: [&str; 6] = [
    DESC,
    IDENTIFIER,
    LAST_CHANGE,
    LONG_NAME,
    "IS-EDITABLE",
    "IS-TABLE-INTERNAL",
];

/// How much of a document must decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Any problem aborts the decode.
    #[default]
    Strict,
    /// Entities that cannot be decoded are kept as unrecognised content and
    /// reported as warnings. The document is marked partial.
    Lenient,
}

/// The outcome of [`decode_with`].
#[derive(Debug)]
pub struct Decoded {
    /// The document.
    pub document: Document,
    /// Problems that were tolerated. Always empty in strict mode.
    pub warnings: Vec<DecodeError>,
}

impl Decoded {
    /// Whether anything was left out of the typed model.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.document.is_partial()
    }
}

/// Decodes a ReqIF tree.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the tree does not have the ReqIF structure,
/// declares an identifier twice, or holds a reference that does not resolve.
pub fn decode(tree: &XmlTree) -> std::result::Result<Document, DecodeError> {
    decode_with(tree, Mode::Strict).map(|decoded| decoded.document)
}

/// Decodes a ReqIF tree in the given mode.
///
/// Decoding reads the structure first, then indexes every identifier, then
/// resolves every reference. References may point forward.
///
/// # Errors
///
/// In strict mode, see [`decode`]. In lenient mode, only a wrong root
/// element, a missing header or content, and duplicate identifiers are
/// errors.
#[instrument(level = "debug", skip(tree))]
pub fn decode_with(tree: &XmlTree, mode: Mode) -> std::result::Result<Decoded, DecodeError> {
    let mut warnings = Vec::new();
    let mut document = structure(tree, mode, &mut warnings)?;
    document.reindex()?;
    resolve::check(&document, mode, &mut warnings)?;

    for warning in &warnings {
        warn!("{warning}");
    }
    document.partial = !warnings.is_empty();
    debug!(
        datatypes = document.datatypes.len(),
        spec_types = document.spec_types.len(),
        spec_objects = document.spec_objects.len(),
        spec_relations = document.spec_relations.len(),
        specifications = document.specifications.len(),
        partial = document.partial,
        "decoded document"
    );
    Ok(Decoded { document, warnings })
}

fn structure(tree: &XmlTree, mode: Mode, warnings: &mut Vec<DecodeError>) -> Result<Document> {
    let root = tree.root();
    if !is_reqif(root) || root.local_name() != "REQ-IF" {
        let name = root.name().to_string();
        return Err(SchemaError::new(
            name.clone(),
            SchemaErrorKind::UnexpectedRoot(name),
        ));
    }

    let the_header = required(root, "REQ-IF", "THE-HEADER")?;
    let header = header(the_header)?;
    let core_content = required(root, "REQ-IF", "CORE-CONTENT")?;
    let content = required(core_content, "CORE-CONTENT", "REQ-IF-CONTENT")?;

    let mut lenient = (mode == Mode::Lenient).then_some(warnings);
    let section = |name: &str| find(content, name);

    let datatypes = match section("DATATYPES") {
        Some(container) => sequence(container, is_datatype, datatype, false, lenient.as_deref_mut())?,
        None => Sequence::new(),
    };
    let spec_types = match section("SPEC-TYPES") {
        Some(container) => sequence(
            container,
            |e| names::spec_type_kind(e.local_name()).is_some(),
            spec_type,
            false,
            lenient.as_deref_mut(),
        )?,
        None => Sequence::new(),
    };
    let spec_objects = match section("SPEC-OBJECTS") {
        Some(container) => sequence(
            container,
            |e| e.local_name() == "SPEC-OBJECT",
            spec_object,
            true,
            lenient.as_deref_mut(),
        )?,
        None => Sequence::new(),
    };
    let spec_relations = match section("SPEC-RELATIONS") {
        Some(container) => sequence(
            container,
            |e| e.local_name() == "SPEC-RELATION",
            spec_relation,
            true,
            lenient.as_deref_mut(),
        )?,
        None => Sequence::new(),
    };
    let specifications = match section("SPECIFICATIONS") {
        Some(container) => sequence(
            container,
            |e| e.local_name() == "SPECIFICATION",
            specification,
            false,
            lenient.as_deref_mut(),
        )?,
        None => Sequence::new(),
    };
    let relation_groups = match section("SPEC-RELATION-GROUPS") {
        Some(container) => sequence(
            container,
            |e| e.local_name() == "RELATION-GROUP",
            relation_group,
            false,
            lenient.as_deref_mut(),
        )?,
        None => Sequence::new(),
    };
    let tool_extensions = match find(root, "TOOL-EXTENSIONS") {
        Some(container) => sequence(
            container,
            |e| e.local_name() == "REQ-IF-TOOL-EXTENSION",
            |e| Ok(ToolExtension::new(e.clone())),
            false,
            None,
        )?,
        None => Sequence::new(),
    };

    Ok(Document {
        header,
        datatypes,
        spec_types,
        spec_objects,
        spec_relations,
        specifications,
        relation_groups,
        tool_extensions,
        envelope: Envelope {
            shell: tree.shell(),
            root: capture(
                root,
                &[],
                &["THE-HEADER", "CORE-CONTENT", "TOOL-EXTENSIONS"],
                false,
            ),
            core_content: capture(core_content, &[], &["REQ-IF-CONTENT"], false),
            content: capture(content, &[], &CONTENT_SECTIONS, false),
        },
        index: Index::default(),
        version: Version::default(),
        partial: false,
    })
}

/// The first child in the ReqIF vocabulary with the given name.
fn find<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent
        .elements()
        .find(|e| is_reqif(e) && e.local_name() == name)
}

fn required<'a>(parent: &'a Element, path: &str, name: &str) -> Result<&'a Element> {
    find(parent, name).ok_or_else(|| {
        SchemaError::new(path, SchemaErrorKind::MissingElement(name.to_owned()))
    })
}

fn attribute(element: &Element, name: &str) -> Option<String> {
    element.attribute(name).map(|a| a.value().into_owned())
}

fn required_attribute(element: &Element, path: &str, name: &str) -> Result<String> {
    attribute(element, name).ok_or_else(|| {
        SchemaError::new(path, SchemaErrorKind::MissingAttribute(name.to_owned()))
    })
}

fn invalid(path: &str, name: &str, value: String, expected: &'static str) -> SchemaError {
    SchemaError::new(
        path,
        SchemaErrorKind::InvalidValue {
            name: name.to_owned(),
            value,
            expected,
        },
    )
}

fn boolean(element: &Element, path: &str, name: &str) -> Result<Option<bool>> {
    attribute(element, name)
        .map(|value| parse_boolean(&value).ok_or_else(|| invalid(path, name, value, "xsd:boolean")))
        .transpose()
}

fn number<T: FromStr>(element: &Element, path: &str, name: &str) -> Result<Option<T>> {
    attribute(element, name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| invalid(path, name, value, "xsd:integer"))
        })
        .transpose()
}

fn real(element: &Element, path: &str, name: &str) -> Result<Option<f64>> {
    attribute(element, name)
        .map(|value| parse_real(&value).ok_or_else(|| invalid(path, name, value, "xsd:double")))
        .transpose()
}

/// Where an element is, for error messages: its identifier, or its name.
fn path(element: &Element) -> String {
    attribute(element, IDENTIFIER).unwrap_or_else(|| element.name().to_string())
}

fn metadata(element: &Element) -> Result<Metadata> {
    let path = element.name().to_string();
    let identifier = required_attribute(element, &path, IDENTIFIER)?;
    let identifier = Identifier::new(identifier)
        .map_err(|_| invalid(&path, IDENTIFIER, String::new(), "a non-empty identifier"))?;
    let mut metadata = Metadata::new(identifier);
    metadata.long_name = attribute(element, LONG_NAME);
    metadata.desc = attribute(element, DESC);
    metadata.last_change = attribute(element, LAST_CHANGE);
    Ok(metadata)
}

/// Decodes the items of a list element.
///
/// Children for which `is_item` holds are decoded; everything else is kept as
/// unrecognised content. With `lenient`, an item that fails to decode is kept
/// the same way and its error is recorded.
fn sequence<T: Send>(
    container: &Element,
    is_item: impl Fn(&Element) -> bool + Sync,
    decode: impl Fn(&Element) -> Result<T> + Sync,
    parallel: bool,
    mut lenient: Option<&mut Vec<DecodeError>>,
) -> Result<Sequence<T>> {
    let candidates: Vec<&Element> = container
        .elements()
        .filter(|e| is_reqif(e) && is_item(e))
        .collect();
    let results: Vec<Result<T>> = if parallel {
        candidates.par_iter().map(|e| decode(e)).collect()
    } else {
        candidates.iter().map(|e| decode(e)).collect()
    };

    let mut results = results.into_iter();
    let mut extra = capture_tag(container, &[]);
    let mut items = Vec::with_capacity(candidates.len());
    for node in container.children() {
        let candidate = match node {
            Node::Element(e) if is_reqif(e) && is_item(e) => Some(e),
            _ => None,
        };
        let slot = match candidate.and_then(|e| results.next().map(|result| (e, result))) {
            Some((element, Ok(item))) => {
                items.push(item);
                ChildSlot::Item(item_key(element))
            }
            Some((_, Err(error))) => match lenient.as_mut() {
                Some(warnings) => {
                    warnings.push(error.into());
                    ChildSlot::Extra(node.clone())
                }
                None => return Err(error),
            },
            None => ChildSlot::Extra(node.clone()),
        };
        extra.children.push(slot);
    }
    Ok(Sequence::from_parts(items, Some(extra)))
}

fn optional_sequence<T: Send>(
    parent: &Element,
    name: &str,
    is_item: impl Fn(&Element) -> bool + Sync,
    decode: impl Fn(&Element) -> Result<T> + Sync,
) -> Result<Sequence<T>> {
    match find(parent, name) {
        Some(container) => sequence(container, is_item, decode, false, None),
        None => Ok(Sequence::new()),
    }
}

fn reference(element: &Element, path: &str) -> Result<Reference> {
    let text = element.text();
    let target = Identifier::new(text.trim())
        .map_err(|_| invalid(path, element.local_name(), text.clone(), "an identifier"))?;
    Ok(Reference::with_extras(
        target,
        capture(element, &[], &[], true),
        crate::domain::OpaqueExtra::default(),
    ))
}

/// A reference held in `<wrapper><ref_tag>ID</ref_tag></wrapper>`.
fn wrapped_reference(
    owner: &Element,
    path: &str,
    wrapper: &'static str,
    ref_tag: &'static str,
) -> Result<Reference> {
    let wrapper_element = required(owner, path, wrapper)?;
    let reference_element = required(wrapper_element, &format!("{path}/{wrapper}"), ref_tag)?;
    let mut reference = reference(reference_element, path)?;
    reference.wrapper = capture(wrapper_element, &[], &[ref_tag], false);
    Ok(reference)
}

fn header(the_header: &Element) -> Result<Header> {
    let element = required(the_header, "THE-HEADER", "REQ-IF-HEADER")?;
    let identifier = metadata(element)?.identifier().clone();

    let mut header = Header::new(identifier);
    for field in HEADER_FIELDS {
        if let Some(field_element) = find(element, field) {
            if let Some(value) = header.field_mut(field) {
                *value = Some(field_element.text());
            }
            header
                .fields
                .push((field, capture(field_element, &[], &[], true)));
        }
    }
    header.extra = capture(element, &[IDENTIFIER], &HEADER_FIELDS, false);
    header.wrapper = capture(the_header, &[], &["REQ-IF-HEADER"], false);
    Ok(header)
}

fn is_datatype(element: &Element) -> bool {
    names::datatype_kind(element.local_name()).is_some()
}

fn datatype(element: &Element) -> Result<DatatypeDefinition> {
    let path = path(element);
    let Some(value_kind) = names::datatype_kind(element.local_name()) else {
        return Err(SchemaError::new(
            path,
            SchemaErrorKind::MissingElement("DATATYPE-DEFINITION-*".to_owned()),
        ));
    };
    let metadata = metadata(element)?;

    let (kind, extra) = match value_kind {
        ValueKind::Boolean => (DatatypeKind::Boolean, capture(element, &METADATA, &[], false)),
        ValueKind::Date => (DatatypeKind::Date, capture(element, &METADATA, &[], false)),
        ValueKind::Xhtml => (DatatypeKind::Xhtml, capture(element, &METADATA, &[], false)),
        ValueKind::Integer => (
            DatatypeKind::Integer {
                min: number(element, &path, "MIN")?,
                max: number(element, &path, "MAX")?,
            },
            capture(element, &INTEGER_ATTRIBUTES, &[], false),
        ),
        ValueKind::Real => (
            DatatypeKind::Real {
                min: real(element, &path, "MIN")?,
                max: real(element, &path, "MAX")?,
                accuracy: number(element, &path, "ACCURACY")?,
            },
            capture(element, &REAL_ATTRIBUTES, &[], false),
        ),
        ValueKind::String => (
            DatatypeKind::String {
                max_length: number(element, &path, "MAX-LENGTH")?,
            },
            capture(element, &STRING_ATTRIBUTES, &[], false),
        ),
        ValueKind::Enumeration => (
            DatatypeKind::Enumeration {
                values: optional_sequence(
                    element,
                    "SPECIFIED-VALUES",
                    |e| e.local_name() == "ENUM-VALUE",
                    enum_value,
                )?,
            },
            capture(element, &METADATA, &["SPECIFIED-VALUES"], false),
        ),
    };

    Ok(DatatypeDefinition {
        metadata,
        kind,
        extra,
    })
}

fn enum_value(element: &Element) -> Result<EnumValue> {
    let metadata = metadata(element)?;
    let path = metadata.identifier().to_string();

    let properties = match find(element, "PROPERTIES") {
        Some(properties) => {
            let embedded = required(properties, &path, "EMBEDDED-VALUE")?;
            let key = number(embedded, &path, "KEY")?.ok_or_else(|| {
                SchemaError::new(&path, SchemaErrorKind::MissingAttribute("KEY".to_owned()))
            })?;
            let other_content = required_attribute(embedded, &path, "OTHER-CONTENT")?;
            let mut value = EmbeddedValue::new(key, other_content);
            value.extra = capture(embedded, &["KEY", "OTHER-CONTENT"], &[], false);
            value.wrapper = capture(properties, &[], &["EMBEDDED-VALUE"], false);
            Some(value)
        }
        None => None,
    };

    Ok(EnumValue {
        metadata,
        properties,
        extra: capture(element, &METADATA, &["PROPERTIES"], false),
    })
}

fn spec_type(element: &Element) -> Result<SpecType> {
    let path = path(element);
    let Some(kind) = names::spec_type_kind(element.local_name()) else {
        return Err(SchemaError::new(
            path,
            SchemaErrorKind::MissingElement("SPEC-OBJECT-TYPE".to_owned()),
        ));
    };
    Ok(SpecType {
        metadata: metadata(element)?,
        kind,
        attributes: optional_sequence(
            element,
            "SPEC-ATTRIBUTES",
            |e| names::attribute_definition_kind(e.local_name()).is_some(),
            attribute_definition,
        )?,
        extra: capture(element, &METADATA, &["SPEC-ATTRIBUTES"], false),
    })
}

fn attribute_definition(element: &Element) -> Result<AttributeDefinition> {
    let path = path(element);
    let Some(kind) = names::attribute_definition_kind(element.local_name()) else {
        return Err(SchemaError::new(
            path,
            SchemaErrorKind::MissingElement("ATTRIBUTE-DEFINITION-*".to_owned()),
        ));
    };
    let metadata = metadata(element)?;
    let datatype = wrapped_reference(element, &path, "TYPE", names::datatype_ref(kind))?;

    let mut default_tag = names::attribute_value(kind);
    let default_value = match find(element, "DEFAULT-VALUE") {
        Some(wrapper) => {
            let value_element = wrapper
                .elements()
                .find(|e| is_reqif(e) && names::attribute_value_kind(e.local_name()).is_some())
                .ok_or_else(|| {
                    SchemaError::new(
                        format!("{path}/DEFAULT-VALUE"),
                        SchemaErrorKind::MissingElement(default_tag.to_owned()),
                    )
                })?;
            let value = attribute_value(value_element)?;
            default_tag = names::attribute_value(value.value.kind());
            Some(DefaultValue {
                value,
                extra: capture(wrapper, &[], &[default_tag], false),
            })
        }
        None => None,
    };

    Ok(AttributeDefinition {
        metadata,
        kind,
        datatype,
        is_editable: boolean(element, &path, "IS-EDITABLE")?,
        multi_valued: boolean(element, &path, "MULTI-VALUED")?,
        default_value,
        extra: capture(element, &DEFINITION_ATTRIBUTES, &["DEFAULT-VALUE", "TYPE"], false),
    })
}

fn is_attribute_value(element: &Element) -> bool {
    names::attribute_value_kind(element.local_name()).is_some()
}

fn attribute_value(element: &Element) -> Result<AttributeValue> {
    let local = element.local_name();
    let Some(kind) = names::attribute_value_kind(local) else {
        return Err(SchemaError::new(
            local,
            SchemaErrorKind::MissingElement("ATTRIBUTE-VALUE-*".to_owned()),
        ));
    };
    let definition = wrapped_reference(
        element,
        local,
        "DEFINITION",
        names::attribute_definition_ref(kind),
    )?;
    let path = format!("{local}[{}]", definition.target());
    let the_value = || required_attribute(element, &path, "THE-VALUE");

    let value = match kind {
        ValueKind::Boolean => {
            let raw = the_value()?;
            Value::Boolean(
                parse_boolean(&raw).ok_or_else(|| invalid(&path, "THE-VALUE", raw, "xsd:boolean"))?,
            )
        }
        ValueKind::Integer => {
            let raw = the_value()?;
            Value::Integer(
                raw.trim()
                    .parse()
                    .map_err(|_| invalid(&path, "THE-VALUE", raw.clone(), "xsd:integer"))?,
            )
        }
        ValueKind::Real => {
            let raw = the_value()?;
            Value::Real(parse_real(&raw).ok_or_else(|| invalid(&path, "THE-VALUE", raw, "xsd:double"))?)
        }
        ValueKind::String => Value::String(the_value()?),
        ValueKind::Date => Value::Date(the_value()?),
        ValueKind::Enumeration => Value::Enumeration(optional_sequence(
            element,
            "VALUES",
            |e| e.local_name() == "ENUM-VALUE-REF",
            |e| reference(e, &path),
        )?),
        ValueKind::Xhtml => Value::Xhtml(Box::new(XhtmlValue {
            the_value: xhtml_content(required(element, &path, "THE-VALUE")?),
            original_value: find(element, "THE-ORIGINAL-VALUE").map(xhtml_content),
            is_simplified: boolean(element, &path, "IS-SIMPLIFIED")?,
        })),
    };

    let extra = match kind {
        ValueKind::Enumeration => capture(element, &[], &["DEFINITION", "VALUES"], false),
        ValueKind::Xhtml => capture(
            element,
            &["IS-SIMPLIFIED"],
            &["DEFINITION", "THE-ORIGINAL-VALUE", "THE-VALUE"],
            false,
        ),
        _ => capture(element, &["THE-VALUE"], &["DEFINITION"], false),
    };
    Ok(AttributeValue {
        definition,
        value,
        extra,
    })
}

fn xhtml_content(element: &Element) -> XhtmlContent {
    let source = element
        .verbatim()
        .map(str::to_owned)
        .or_else(|| element.children().is_empty().then(String::new));
    XhtmlContent::from_parts(capture_tag(element, &[]), element.children().to_vec(), source)
}

fn values(element: &Element) -> Result<Sequence<AttributeValue>> {
    optional_sequence(element, "VALUES", is_attribute_value, attribute_value)
}

fn spec_object(element: &Element) -> Result<SpecObject> {
    let metadata = metadata(element)?;
    let path = metadata.identifier().to_string();
    Ok(SpecObject {
        spec_type: wrapped_reference(
            element,
            &path,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::SpecObject),
        )?,
        values: values(element)?,
        extra: capture(element, &METADATA, &["VALUES", "TYPE"], false),
        metadata,
    })
}

fn spec_relation(element: &Element) -> Result<SpecRelation> {
    let metadata = metadata(element)?;
    let path = metadata.identifier().to_string();
    Ok(SpecRelation {
        spec_type: wrapped_reference(
            element,
            &path,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::SpecRelation),
        )?,
        source: wrapped_reference(element, &path, "SOURCE", "SPEC-OBJECT-REF")?,
        target: wrapped_reference(element, &path, "TARGET", "SPEC-OBJECT-REF")?,
        values: values(element)?,
        extra: capture(
            element,
            &METADATA,
            &["VALUES", "TARGET", "SOURCE", "TYPE"],
            false,
        ),
        metadata,
    })
}

fn specification(element: &Element) -> Result<Specification> {
    let metadata = metadata(element)?;
    let path = metadata.identifier().to_string();
    Ok(Specification {
        spec_type: wrapped_reference(
            element,
            &path,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::Specification),
        )?,
        values: values(element)?,
        children: hierarchy_children(element)?,
        extra: capture(element, &METADATA, &["VALUES", "CHILDREN", "TYPE"], false),
        metadata,
    })
}

fn hierarchy_children(element: &Element) -> Result<Sequence<SpecHierarchy>> {
    optional_sequence(
        element,
        "CHILDREN",
        |e| e.local_name() == "SPEC-HIERARCHY",
        spec_hierarchy,
    )
}

fn spec_hierarchy(element: &Element) -> Result<SpecHierarchy> {
    let metadata = metadata(element)?;
    let path = metadata.identifier().to_string();
    Ok(SpecHierarchy {
        object: wrapped_reference(element, &path, "OBJECT", "SPEC-OBJECT-REF")?,
        children: hierarchy_children(element)?,
        is_table_internal: boolean(element, &path, "IS-TABLE-INTERNAL")?,
        is_editable: boolean(element, &path, "IS-EDITABLE")?,
        extra: capture(element, &HIERARCHY_ATTRIBUTES, &["OBJECT", "CHILDREN"], false),
        metadata,
    })
}

fn relation_group(element: &Element) -> Result<RelationGroup> {
    let metadata = metadata(element)?;
    let path = metadata.identifier().to_string();
    Ok(RelationGroup {
        spec_type: wrapped_reference(
            element,
            &path,
            "TYPE",
            names::spec_type_ref(SpecTypeKind::RelationGroup),
        )?,
        source_specification: wrapped_reference(
            element,
            &path,
            "SOURCE-SPECIFICATION",
            "SPECIFICATION-REF",
        )?,
        target_specification: wrapped_reference(
            element,
            &path,
            "TARGET-SPECIFICATION",
            "SPECIFICATION-REF",
        )?,
        relations: optional_sequence(
            element,
            "SPEC-RELATIONS",
            |e| e.local_name() == "SPEC-RELATION-REF",
            |e| reference(e, &path),
        )?,
        extra: capture(
            element,
            &METADATA,
            &[
                "SOURCE-SPECIFICATION",
                "SPEC-RELATIONS",
                "TARGET-SPECIFICATION",
                "TYPE",
            ],
            false,
        ),
        metadata,
    })
}
