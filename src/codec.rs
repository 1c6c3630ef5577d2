//! Decoding trees into documents and encoding them back.
//!
//! Decoding records, for every element it reads, the layout the typed model
//! does not capture: the tag as written, the raw text of each known
//! attribute, and the position of every unrecognised node. Encoding replays
//! that layout around the current typed values, so that
//! `render(encode(decode(parse(bytes))))` reproduces `bytes` for an
//! unedited document.

mod decode;
mod encode;
mod names;
mod resolve;
mod slots;

pub use decode::{Decoded, Mode, decode, decode_with};
pub use encode::{encode, to_bytes};

use crate::{
    domain::{SchemaError, UnresolvedReference},
    xml,
};

/// Why a tree could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The tree does not have the ReqIF structure.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A reference does not resolve.
    #[error(transparent)]
    Unresolved(#[from] UnresolvedReference),
}

/// Parses, decodes, encodes and renders a document.
///
/// # Errors
///
/// Returns an error if the bytes are not well-formed XML or do not decode as
/// a ReqIF document.
pub fn round_trip(bytes: &[u8]) -> Result<Vec<u8>, crate::Error> {
    let tree = xml::parse(bytes)?;
    let document = decode(&tree)?;
    Ok(to_bytes(&document))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{
        AttributeValue, Document, Identifier, Metadata, Mutation, SchemaErrorKind, SpecObject,
        Value,
    };

    const MINIMAL: &str = include_str!("../tests/fixtures/minimal.reqif");
    const UNKNOWN_EXTENSION: &str = include_str!("../tests/fixtures/unknown_extension.reqif");
    const DANGLING: &str = include_str!("../tests/fixtures/dangling_reference.reqif");
    const XHTML: &str = include_str!("../tests/fixtures/xhtml.reqif");
    const INTERLEAVED: &str = include_str!("../tests/fixtures/interleaved.reqif");

    fn load(source: &str) -> Document {
        decode(&xml::parse(source.as_bytes()).unwrap()).unwrap()
    }

    fn id(value: &str) -> Identifier {
        Identifier::new(value).unwrap()
    }

    /// Whether `first` is followed by `second` with only whitespace between.
    fn adjacent(output: &str, first: &str, second: &str) -> bool {
        output
            .find(first)
            .is_some_and(|start| output[start + first.len()..].trim_start().starts_with(second))
    }

    #[test]
    fn minimal_document_decodes_and_reproduces() {
        let document = load(MINIMAL);

        assert_eq!(document.spec_objects().len(), 1);
        let object = &document.spec_objects()[0];
        assert_eq!(object.metadata.identifier().as_str(), "SO-1");
        assert_eq!(object.values[0].value, Value::Boolean(true));
        assert_eq!(document.specifications()[0].children.len(), 1);

        assert_eq!(String::from_utf8(to_bytes(&document)).unwrap(), MINIMAL);
    }

    #[test]
    fn rich_document_reproduces() {
        let output = round_trip(XHTML.as_bytes()).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), XHTML);
    }

    #[test]
    fn unknown_child_keeps_its_position() {
        let document = load(UNKNOWN_EXTENSION);
        let output = String::from_utf8(to_bytes(&document)).unwrap();
        assert_eq!(output, UNKNOWN_EXTENSION);

        let value_end = output.find("</ATTRIBUTE-VALUE-BOOLEAN>").unwrap();
        let custom = output.find("<CUSTOM-FIELD>X</CUSTOM-FIELD>").unwrap();
        let values_end = output.find("</VALUES>").unwrap();
        assert!(value_end < custom && custom < values_end);
    }

    #[test]
    fn unknown_child_survives_an_edit_to_its_neighbour() {
        let mut document = load(UNKNOWN_EXTENSION);
        document
            .apply(Mutation::SetAttributeValue {
                owner: id("SO-1"),
                definition: id("AD-DONE"),
                value: Value::Boolean(false),
            })
            .unwrap();

        let output = String::from_utf8(to_bytes(&document)).unwrap();
        let value = output.find(r#"THE-VALUE="false""#).unwrap();
        let custom = output.find("<CUSTOM-FIELD>X</CUSTOM-FIELD>").unwrap();
        assert!(value < custom);
    }

    #[test]
    fn interleaved_document_reproduces() {
        let output = round_trip(INTERLEAVED.as_bytes()).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), INTERLEAVED);
    }

    #[test_case("SO-1", r#"<SPEC-OBJECT IDENTIFIER="SO-2""#; "the item before it")]
    #[test_case("SO-2", r#"<SPEC-OBJECT IDENTIFIER="SO-3""#; "the item after it")]
    fn unknown_sibling_stays_in_front_of_its_item_after_a_removal(removed: &str, next: &str) {
        let mut document = load(INTERLEAVED);
        document
            .apply(Mutation::RemoveSpecObject {
                object: id(removed),
                cascade: true,
            })
            .unwrap();

        let output = String::from_utf8(to_bytes(&document)).unwrap();
        assert!(!output.contains(&format!(r#"IDENTIFIER="{removed}""#)));
        assert!(adjacent(&output, "<VENDOR-NOTE>about SO-2</VENDOR-NOTE>", next), "{output}");
    }

    #[test]
    fn unknown_sibling_follows_its_node_when_reordered() {
        let mut document = load(INTERLEAVED);
        document
            .apply(Mutation::ReorderHierarchyChild {
                node: id("H-2"),
                position: 2,
            })
            .unwrap();

        let output = String::from_utf8(to_bytes(&document)).unwrap();
        let marker = "<vnd:marker>before H-2</vnd:marker>";
        assert!(adjacent(&output, marker, r#"<SPEC-HIERARCHY IDENTIFIER="H-2""#), "{output}");
        assert!(output.find(r#"IDENTIFIER="H-3""#) < output.find(marker));
        assert!(adjacent(&output, "</SPEC-HIERARCHY>", r#"<SPEC-HIERARCHY IDENTIFIER="H-3""#));
    }

    #[test]
    fn unknown_sibling_stays_anchored_when_an_earlier_node_is_removed() {
        let mut document = load(INTERLEAVED);
        document
            .apply(Mutation::RemoveHierarchyNode(id("H-1")))
            .unwrap();

        let output = String::from_utf8(to_bytes(&document)).unwrap();
        assert!(!output.contains(r#"IDENTIFIER="H-1""#));
        assert!(adjacent(&output, "<CHILDREN>", "<vnd:marker>before H-2</vnd:marker>"));
        assert!(adjacent(
            &output,
            "<vnd:marker>before H-2</vnd:marker>",
            r#"<SPEC-HIERARCHY IDENTIFIER="H-2""#
        ));

        let reread = load(&output);
        assert_eq!(reread.specifications()[0].children.len(), 2);
    }

    #[test]
    fn dangling_type_reference_is_an_error() {
        let tree = xml::parse(DANGLING.as_bytes()).unwrap();
        let Err(DecodeError::Unresolved(error)) = decode(&tree) else {
            panic!("expected an unresolved reference");
        };
        assert_eq!(error.identifier.as_str(), "SOT-MISSING");
        assert_eq!(error.referrer, "SO-1");
    }

    #[test]
    fn lenient_decode_keeps_undecodable_objects_opaque() {
        let source = MINIMAL.replace(
            "          <TYPE>\n            <SPEC-OBJECT-TYPE-REF>SOT</SPEC-OBJECT-TYPE-REF>\n          </TYPE>\n",
            "",
        );
        assert_ne!(source, MINIMAL);
        let tree = xml::parse(source.as_bytes()).unwrap();

        let Err(DecodeError::Schema(error)) = decode(&tree) else {
            panic!("expected a schema error");
        };
        assert!(matches!(error.kind, SchemaErrorKind::MissingElement(ref name) if name == "TYPE"));

        let decoded = decode_with(&tree, Mode::Lenient).unwrap();
        assert!(decoded.is_partial());
        // the object is gone, so the hierarchy reference dangles as well
        assert_eq!(decoded.warnings.len(), 2);
        assert!(decoded.document.spec_objects().is_empty());
        assert_eq!(String::from_utf8(to_bytes(&decoded.document)).unwrap(), source);
    }

    #[test]
    fn lenient_decode_keeps_dangling_references_typed() {
        let tree = xml::parse(DANGLING.as_bytes()).unwrap();
        let decoded = decode_with(&tree, Mode::Lenient).unwrap();

        assert!(decoded.is_partial());
        assert_eq!(decoded.warnings.len(), 1);
        assert_eq!(decoded.document.spec_objects().len(), 1);
    }

    #[test]
    fn re_encoding_is_idempotent() {
        let document = load(XHTML);
        let first = encode(&document);
        let second = encode(&decode(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn value_of_the_wrong_kind_is_a_schema_error() {
        let source = MINIMAL
            .replace(
                r#"<ATTRIBUTE-VALUE-BOOLEAN THE-VALUE="true">"#,
                r#"<ATTRIBUTE-VALUE-STRING THE-VALUE="true">"#,
            )
            .replace(
                "</ATTRIBUTE-VALUE-BOOLEAN>",
                "</ATTRIBUTE-VALUE-STRING>",
            )
            .replace(
                "<ATTRIBUTE-DEFINITION-BOOLEAN-REF>AD-DONE</ATTRIBUTE-DEFINITION-BOOLEAN-REF>",
                "<ATTRIBUTE-DEFINITION-STRING-REF>AD-DONE</ATTRIBUTE-DEFINITION-STRING-REF>",
            );
        let tree = xml::parse(source.as_bytes()).unwrap();

        let Err(DecodeError::Schema(error)) = decode(&tree) else {
            panic!("expected a schema error");
        };
        assert!(matches!(error.kind, SchemaErrorKind::KindMismatch { .. }));
    }

    #[test]
    fn duplicate_identifiers_are_rejected_in_every_mode() {
        let source = MINIMAL.replace(r#"IDENTIFIER="ST""#, r#"IDENTIFIER="SOT""#);
        let tree = xml::parse(source.as_bytes()).unwrap();

        for mode in [Mode::Strict, Mode::Lenient] {
            let Err(DecodeError::Schema(error)) = decode_with(&tree, mode) else {
                panic!("expected a schema error");
            };
            assert!(matches!(error.kind, SchemaErrorKind::DuplicateIdentifier(_)));
        }
    }

    #[test]
    fn other_root_elements_are_rejected() {
        let tree = xml::parse(b"<DOCUMENT/>").unwrap();
        let Err(DecodeError::Schema(error)) = decode(&tree) else {
            panic!("expected a schema error");
        };
        assert_eq!(
            error.kind,
            SchemaErrorKind::UnexpectedRoot("DOCUMENT".to_owned())
        );
    }

    #[test]
    fn values_are_decoded_with_their_spelling() {
        let document = load(XHTML);
        let object = document.spec_object("SO-1").unwrap();

        let kinds: Vec<_> = object.values.iter().map(|v| v.value.kind()).collect();
        assert_eq!(kinds.len(), 4);
        assert_eq!(object.values[2].value, Value::Integer(7));
        assert_eq!(
            object.values[1].value,
            Value::String("Stop & hold".to_owned())
        );
        assert_eq!(document.header().comment.as_deref(), Some("Fish & chips"));

        let Value::Xhtml(xhtml) = &object.values[0].value else {
            panic!("expected xhtml");
        };
        assert_eq!(xhtml.links(), ["files/pic.png"]);
        assert_eq!(xhtml.the_value.text(), "The pump shall stop. pump");
    }

    #[test]
    fn new_documents_encode_and_decode() {
        let mut document = load(MINIMAL);
        let mut object = SpecObject::new(Metadata::new(id("SO-NEW")), id("SOT"));
        object
            .values
            .push(AttributeValue::new(id("AD-DONE"), Value::Boolean(false)));
        document
            .apply(Mutation::AddSpecObject(object))
            .unwrap();

        let output = String::from_utf8(to_bytes(&document)).unwrap();
        assert!(output.contains(
            "<SPEC-OBJECT IDENTIFIER=\"SO-NEW\">\n          <VALUES>\n            <ATTRIBUTE-VALUE-BOOLEAN THE-VALUE=\"false\">"
        ));

        let reloaded = load(&output);
        assert_eq!(reloaded.spec_objects().len(), 2);
        assert_eq!(
            reloaded.spec_object("SO-NEW").unwrap().values[0].value,
            Value::Boolean(false)
        );
    }
}
