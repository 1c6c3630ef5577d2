use std::io::{Cursor, Read, Write};

use tracing::debug;
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

use super::{Attachments, ContainerError};
use crate::Error;

/// The contents of a `.reqifz` archive.
#[derive(Debug)]
pub(super) struct Unpacked {
    pub(super) entry: String,
    pub(super) document: Vec<u8>,
    pub(super) attachments: Attachments,
    /// Every file entry in archive order, with its compression method.
    pub(super) entries: Vec<(String, CompressionMethod)>,
}

fn is_document(name: &str) -> bool {
    !name.contains('/')
        && std::path::Path::new(name)
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("reqif"))
}

pub(super) fn read(bytes: &[u8]) -> Result<Unpacked, Error> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut documents = Vec::new();
    let mut attachments = Attachments::new();
    let mut entries = Vec::with_capacity(archive.len());
    let mut document = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_owned();
        if file.enclosed_name().is_none() {
            return Err(ContainerError::UnsafePath(name).into());
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|error| ContainerError::Entry {
                name: name.clone(),
                message: error.to_string(),
            })?;
        entries.push((name.clone(), file.compression()));

        if is_document(&name) {
            documents.push(name);
            document = data;
        } else {
            attachments.insert(&name, data)?;
        }
    }

    let entry = match documents.len() {
        1 => documents.remove(0),
        0 => return Err(ContainerError::NoDocument.into()),
        _ => return Err(ContainerError::MultipleDocuments(documents).into()),
    };
    debug!(entry = %entry, attachments = attachments.len(), "read archive");
    Ok(Unpacked {
        entry,
        document,
        attachments,
        entries,
    })
}

/// Compression for a rewritten entry: the source method where it can be
/// written, deflate otherwise.
fn compression(name: &str, entries: &[(String, CompressionMethod)]) -> CompressionMethod {
    match entries.iter().find(|(entry, _)| entry == name) {
        Some((_, CompressionMethod::Stored)) => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    }
}

/// Writes the document and `attachments` as an archive.
///
/// Entries that were in the source archive keep their order; new entries
/// follow in path order.
pub(super) fn write(
    entry: &str,
    document: &[u8],
    attachments: &[(&str, &[u8])],
    entries: &[(String, CompressionMethod)],
) -> Result<Vec<u8>, Error> {
    let mut ordered: Vec<(&str, &[u8])> = Vec::with_capacity(attachments.len() + 1);
    ordered.push((entry, document));
    ordered.extend_from_slice(attachments);
    ordered.sort_by_key(|(name, _)| {
        entries
            .iter()
            .position(|(existing, _)| existing == name)
            .unwrap_or(usize::MAX)
    });

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in ordered {
        let options =
            SimpleFileOptions::default().compression_method(compression(name, entries));
        writer.start_file(name, options)?;
        writer
            .write_all(data)
            .map_err(|error| ContainerError::Entry {
                name: name.to_owned(),
                message: error.to_string(),
            })?;
    }
    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(files: &[(&str, &str, CompressionMethod)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data, method) in files {
            writer
                .start_file(*name, SimpleFileOptions::default().compression_method(*method))
                .unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn document_and_attachments_are_separated() {
        let bytes = archive(&[
            ("files/pic.png", "png", CompressionMethod::Stored),
            ("doc.reqif", "<REQ-IF/>", CompressionMethod::Deflated),
        ]);
        let unpacked = read(&bytes).unwrap();

        assert_eq!(unpacked.entry, "doc.reqif");
        assert_eq!(unpacked.document, b"<REQ-IF/>");
        assert_eq!(unpacked.attachments.get("files/pic.png"), Some(&b"png"[..]));
        assert_eq!(unpacked.entries[0].1, CompressionMethod::Stored);
    }

    #[test]
    fn an_archive_needs_exactly_one_document() {
        let none = archive(&[("files/pic.png", "png", CompressionMethod::Stored)]);
        assert!(matches!(
            read(&none),
            Err(Error::Container(ContainerError::NoDocument))
        ));

        let two = archive(&[
            ("a.reqif", "<REQ-IF/>", CompressionMethod::Deflated),
            ("b.reqif", "<REQ-IF/>", CompressionMethod::Deflated),
        ]);
        assert!(matches!(
            read(&two),
            Err(Error::Container(ContainerError::MultipleDocuments(names))) if names.len() == 2
        ));
    }

    #[test]
    fn nested_reqif_files_are_attachments() {
        let bytes = archive(&[
            ("doc.reqif", "<REQ-IF/>", CompressionMethod::Deflated),
            ("old/doc.reqif", "<REQ-IF/>", CompressionMethod::Deflated),
        ]);
        let unpacked = read(&bytes).unwrap();
        assert!(unpacked.attachments.contains("old/doc.reqif"));
    }

    #[test]
    fn rewritten_archives_keep_entry_order_and_compression() {
        let bytes = archive(&[
            ("files/b.png", "b", CompressionMethod::Stored),
            ("doc.reqif", "<REQ-IF/>", CompressionMethod::Deflated),
        ]);
        let unpacked = read(&bytes).unwrap();

        let written = write(
            &unpacked.entry,
            &unpacked.document,
            &[("files/a.png", "a".as_bytes()), ("files/b.png", "b".as_bytes())],
            &unpacked.entries,
        )
        .unwrap();
        let reread = read(&written).unwrap();

        let names: Vec<_> = reread.entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["files/b.png", "doc.reqif", "files/a.png"]);
        assert_eq!(reread.entries[0].1, CompressionMethod::Stored);
        assert_eq!(reread.entries[2].1, CompressionMethod::Deflated);
    }
}
