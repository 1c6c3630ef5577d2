//! Load, edit and save documents through the public API.

use std::{
    fs,
    io::{Cursor, Read, Write},
    path::Path,
};

use reqif::{
    Error, LoadOptions, SaveOptions, Session,
    codec::{self, Mode},
    domain::{Identifier, Mutation, Value},
    xml,
};
use tempfile::TempDir;
use test_case::test_case;
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

const MINIMAL: &str = include_str!("fixtures/minimal.reqif");
const UNKNOWN_EXTENSION: &str = include_str!("fixtures/unknown_extension.reqif");
const XHTML: &str = include_str!("fixtures/xhtml.reqif");
const DANGLING: &str = include_str!("fixtures/dangling_reference.reqif");

fn id(value: &str) -> Identifier {
    Identifier::new(value).unwrap()
}

/// Lines of `after` that differ from the line at the same position in
/// `before`.
fn changed_lines<'a>(before: &str, after: &'a str) -> Vec<&'a str> {
    assert_eq!(before.lines().count(), after.lines().count());
    before
        .lines()
        .zip(after.lines())
        .filter(|(a, b)| a != b)
        .map(|(_, b)| b)
        .collect()
}

fn write_archive(path: &Path, files: &[(&str, &[u8], CompressionMethod)]) {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in files {
        writer
            .start_file(*name, SimpleFileOptions::default().compression_method(*method))
            .unwrap();
        writer.write_all(data).unwrap();
    }
    fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
}

#[test_case(MINIMAL; "minimal")]
#[test_case(UNKNOWN_EXTENSION; "unknown extension")]
#[test_case(XHTML; "xhtml and vendor attributes")]
fn unedited_documents_are_reproduced_exactly(source: &str) {
    let output = codec::round_trip(source.as_bytes()).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), source);
}

#[test]
fn dangling_references_fail_a_strict_load() {
    let error = codec::round_trip(DANGLING.as_bytes()).unwrap_err();
    assert!(matches!(
        error,
        Error::UnresolvedReference(reference) if reference.identifier.as_str() == "SOT-MISSING"
    ));
}

#[test]
fn malformed_xml_reports_its_position() {
    let error = codec::round_trip(b"<REQ-IF>\n  <THE-HEADER>\n</REQ-IF>").unwrap_err();
    let Error::Parse(error) = error else {
        panic!("expected a parse error, got {error:?}");
    };
    assert_eq!(error.line, 3);
}

#[test]
fn an_edit_changes_only_what_it_touches() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.reqif");
    fs::write(&path, XHTML).unwrap();

    let mut session = Session::default();
    let handle = session.open_document(&path).unwrap();
    session
        .apply_mutation(
            handle,
            Mutation::SetAttributeValue {
                owner: id("SO-1"),
                definition: id("AD-RISK"),
                value: Value::Integer(8),
            },
        )
        .unwrap();

    let out = dir.path().join("edited.reqif");
    fs::create_dir(dir.path().join("files")).unwrap();
    fs::write(dir.path().join("files/pic.png"), "png").unwrap();
    fs::write(dir.path().join("files/logo.svg"), "<svg/>").unwrap();
    session.save_document(handle, &out).unwrap();

    let written = fs::read_to_string(&out).unwrap();
    let changed = changed_lines(XHTML, &written);
    assert_eq!(changed.len(), 2, "{changed:#?}");
    assert!(changed[0].contains(r#"IDENTIFIER="SO-1""#));
    assert!(changed[0].contains(r#"vnd:colour="red""#));
    assert!(!changed[0].contains("2024-05-02T12:00:00Z"));
    assert!(changed[1].contains(r#"THE-VALUE="8""#));
}

#[test]
fn archives_keep_their_attachments_through_an_edit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bundle.reqifz");
    write_archive(
        &path,
        &[
            ("bundle.reqif", XHTML.as_bytes(), CompressionMethod::Deflated),
            ("files/pic.png", b"png", CompressionMethod::Stored),
            ("files/logo.svg", b"<svg/>", CompressionMethod::Deflated),
            ("readme.txt", b"unreferenced", CompressionMethod::Deflated),
        ],
    );

    let mut session = Session::default();
    let handle = session.open_document(&path).unwrap();
    session
        .apply_mutation(
            handle,
            Mutation::SetAttributeValue {
                owner: id("SO-1"),
                definition: id("AD-NAME"),
                value: Value::String("Stop <now>".to_owned()),
            },
        )
        .unwrap();
    session.save_document(handle, &path).unwrap();

    let mut archive = ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
    let names: Vec<_> = archive.file_names().map(str::to_owned).collect();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"readme.txt".to_owned()));

    let mut document = String::new();
    archive
        .by_name("bundle.reqif")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();
    assert!(document.contains(r#"THE-VALUE="Stop &lt;now&gt;""#));
    assert_eq!(changed_lines(XHTML, &document).len(), 2);

    let pic = archive.by_name("files/pic.png").unwrap();
    assert_eq!(pic.compression(), CompressionMethod::Stored);
}

#[test]
fn pruning_drops_unreferenced_attachments() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bundle.reqifz");
    write_archive(
        &path,
        &[
            ("bundle.reqif", XHTML.as_bytes(), CompressionMethod::Deflated),
            ("files/pic.png", b"png", CompressionMethod::Deflated),
            ("files/logo.svg", b"<svg/>", CompressionMethod::Deflated),
            ("readme.txt", b"unreferenced", CompressionMethod::Deflated),
        ],
    );

    let package = reqif::load(&path, &LoadOptions::default()).unwrap();
    let out = dir.path().join("pruned.reqifz");
    let options = SaveOptions {
        prune: true,
        ..SaveOptions::default()
    };
    reqif::save(&out, &package, &options).unwrap();

    let reloaded = reqif::load(&out, &LoadOptions::default()).unwrap();
    assert_eq!(
        reloaded.attachments.paths().collect::<Vec<_>>(),
        ["files/logo.svg", "files/pic.png"]
    );
}

#[test]
fn cascading_removal_takes_relations_and_placements_with_it() {
    let tree = xml::parse(XHTML.as_bytes()).unwrap();
    let mut document = codec::decode(&tree).unwrap();

    let refused = document.apply(Mutation::RemoveSpecObject {
        object: id("SO-2"),
        cascade: false,
    });
    assert!(refused.is_err());

    document
        .apply(Mutation::RemoveSpecObject {
            object: id("SO-2"),
            cascade: true,
        })
        .unwrap();

    assert!(document.entity("SO-2").is_none());
    assert!(document.entity("REL-1").is_none());
    assert!(document.entity("H-2").is_none());
    assert!(document.relation_group("RG-1").unwrap().relations.is_empty());

    let written = String::from_utf8(codec::to_bytes(&document)).unwrap();
    assert!(!written.contains("SO-2"));
    assert!(written.contains("<vnd:settings"));

    let reread = codec::decode(&xml::parse(written.as_bytes()).unwrap()).unwrap();
    assert_eq!(reread.spec_objects().len(), 1);
}

#[test]
fn lenient_loads_keep_going_but_refuse_a_plain_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dangling.reqif");
    fs::write(&path, DANGLING).unwrap();

    let mut session = Session::default();
    assert!(session.open_document(&path).is_err());

    let options = LoadOptions {
        mode: Mode::Lenient,
        ..LoadOptions::default()
    };
    let handle = session.open_document_with(&path, &options).unwrap();
    let package = session.package(handle).unwrap();
    assert!(package.document.is_partial());
    assert!(!package.warnings.is_empty());

    let out = dir.path().join("out.reqif");
    assert!(matches!(
        session.save_document(handle, &out),
        Err(Error::PartialDocument)
    ));

    let allow = SaveOptions {
        allow_partial: true,
        ..SaveOptions::default()
    };
    session.save_document_with(handle, &out, &allow).unwrap();
    assert_eq!(fs::read_to_string(out).unwrap(), DANGLING);
}
