//! Decodes and re-encodes a generated document with a few thousand spec
//! objects, with and without an edit in between.

#![allow(missing_docs)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use reqif::{
    Document, codec,
    domain::{
        AttributeDefinition, AttributeValue, DatatypeDefinition, DatatypeKind, Identifier,
        Metadata, Mutation, SpecHierarchy, SpecObject, SpecType, SpecTypeKind, Specification,
        Value, ValueKind,
    },
    xml,
};

const OBJECTS: usize = 2_000;

fn id(value: &str) -> Identifier {
    Identifier::new(value).unwrap()
}

/// Generates a document with one specification placing every object.
fn generate() -> Vec<u8> {
    let mut document = Document::new();

    document
        .apply(Mutation::AddDatatype(DatatypeDefinition::new(
            Metadata::new(id("DT-STR")),
            DatatypeKind::String { max_length: None },
        )))
        .unwrap();

    let mut object_type = SpecType::new(Metadata::new(id("SOT")), SpecTypeKind::SpecObject);
    object_type.attributes.push(AttributeDefinition::new(
        Metadata::new(id("AD-TEXT")).with_long_name("ReqIF.Text"),
        ValueKind::String,
        id("DT-STR"),
    ));
    document.apply(Mutation::AddSpecType(object_type)).unwrap();
    document
        .apply(Mutation::AddSpecType(SpecType::new(
            Metadata::new(id("ST")),
            SpecTypeKind::Specification,
        )))
        .unwrap();
    document
        .apply(Mutation::AddSpecification(Specification::new(
            Metadata::new(id("SPEC")),
            id("ST"),
        )))
        .unwrap();

    for i in 0..OBJECTS {
        let mut object = SpecObject::new(Metadata::new(id(&format!("SO-{i}"))), id("SOT"));
        object.values.push(AttributeValue::new(
            id("AD-TEXT"),
            Value::String(format!("The system shall handle case {i} & report it.")),
        ));
        document.apply(Mutation::AddSpecObject(object)).unwrap();
        document
            .apply(Mutation::InsertHierarchyNode {
                parent: id("SPEC"),
                position: None,
                node: SpecHierarchy::new(
                    Metadata::new(id(&format!("H-{i}"))),
                    id(&format!("SO-{i}")),
                ),
            })
            .unwrap();
    }

    codec::to_bytes(&document)
}

fn round_trip(c: &mut Criterion) {
    let source = generate();

    c.bench_function("decode and encode", |b| {
        b.iter(|| codec::round_trip(&source).unwrap());
    });

    c.bench_function("decode, edit and encode", |b| {
        b.iter_batched(
            || xml::parse(&source).unwrap(),
            |tree| {
                let mut document = codec::decode(&tree).unwrap();
                document
                    .apply(Mutation::SetAttributeValue {
                        owner: id("SO-1000"),
                        definition: id("AD-TEXT"),
                        value: Value::String("Edited".to_owned()),
                    })
                    .unwrap();
                codec::to_bytes(&document)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, round_trip);
criterion_main!(benches);
