//! Reading and writing ReqIF files.
//!
//! A `.reqif` file is a bare XML document; the files it refers to live next
//! to it on disk. A `.reqifz` file is a ZIP archive holding one document and
//! the files it refers to. The format of an input is detected from its first
//! bytes, and the format of an output follows the file extension.

mod archive;
mod attachments;
mod io;

use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

pub use attachments::{Attachments, normalise};
pub use io::{CancelToken, Retry};
use tracing::{debug, instrument};
use zip::CompressionMethod;

use crate::{
    Error,
    codec::{self, DecodeError, Decoded, Mode},
    domain::{Config, Document},
    xml::{self, ParseOptions},
};

/// Problems with the container around a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    /// An archive holds no top-level `.reqif` entry.
    #[error("the archive does not contain a .reqif document")]
    NoDocument,

    /// An archive holds more than one top-level `.reqif` entry.
    #[error("the archive contains more than one .reqif document: {}", .0.join(", "))]
    MultipleDocuments(Vec<String>),

    /// A path is absolute or leaves the document's directory.
    #[error("the path {0:?} is outside the document's directory")]
    UnsafePath(String),

    /// An archive entry could not be read or written.
    #[error("archive entry {name}: {message}")]
    Entry {
        /// The entry name.
        name: String,
        /// What went wrong.
        message: String,
    },
}

/// The two file formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// `.reqif`
    #[default]
    Xml,
    /// `.reqifz`
    Archive,
}

impl Format {
    /// The format of a file, from its first bytes.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
            Self::Archive
        } else {
            Self::Xml
        }
    }

    /// The format to write to a path, from its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("reqifz"))
        {
            Self::Archive
        } else {
            Self::Xml
        }
    }
}

/// Where a package was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    /// The format of the source.
    pub format: Format,
    /// The name of the document entry in a source archive.
    pub entry: Option<String>,
    /// The directory of the source file.
    pub directory: Option<PathBuf>,
    entries: Vec<(String, CompressionMethod)>,
}

/// A document with the files that travel with it.
#[derive(Debug, Clone)]
pub struct Package {
    /// The document.
    pub document: Document,
    /// Files held in memory: the contents of a source archive, and anything
    /// added since.
    pub attachments: Attachments,
    /// Where the package was read from.
    pub origin: Origin,
    /// Problems tolerated by a lenient load.
    pub warnings: Vec<DecodeError>,
}

impl Package {
    /// A package with no attachments and no source.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            attachments: Attachments::new(),
            origin: Origin::default(),
            warnings: Vec::new(),
        }
    }
}

/// How to load a file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Whether undecodable content is an error or a warning.
    pub mode: Mode,
    /// Checked after reading and after parsing.
    pub cancel: Option<CancelToken>,
    /// Retry policy for reading the file.
    pub retry: Retry,
    /// XML parser options.
    pub parse: ParseOptions,
}

impl From<&Config> for LoadOptions {
    fn from(config: &Config) -> Self {
        Self {
            mode: Mode::Strict,
            cancel: None,
            retry: Retry::from(config),
            parse: config.parse_options(),
        }
    }
}

/// How to save a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Save a document that a lenient load left partial.
    pub allow_partial: bool,
    /// Leave out in-memory attachments the document does not refer to.
    pub prune: bool,
    /// Retry policy for writing files.
    pub retry: Retry,
}

impl From<&Config> for SaveOptions {
    fn from(config: &Config) -> Self {
        Self {
            allow_partial: false,
            prune: config.prune_unreferenced_attachments,
            retry: Retry::from(config),
        }
    }
}

/// Loads a `.reqif` or `.reqifz` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a well-formed
/// container or document, or (in strict mode) does not decode.
#[instrument(skip_all, fields(path = %path.display(), mode = ?options.mode))]
pub fn load(path: &Path, options: &LoadOptions) -> Result<Package, Error> {
    let bytes = io::read(path, options.retry)?;
    let mut package = from_bytes(&bytes, options)?;
    package.origin.directory = Some(directory_of(path));
    Ok(package)
}

/// Loads a `.reqif` or `.reqifz` file from memory.
///
/// # Errors
///
/// See [`load`].
pub fn from_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Package, Error> {
    CancelToken::check(options.cancel.as_ref())?;

    let format = Format::detect(bytes);
    let (source, attachments, entry, entries) = match format {
        Format::Archive => {
            let unpacked = archive::read(bytes)?;
            (
                Cow::Owned(unpacked.document),
                unpacked.attachments,
                Some(unpacked.entry),
                unpacked.entries,
            )
        }
        Format::Xml => (Cow::Borrowed(bytes), Attachments::new(), None, Vec::new()),
    };

    let tree = xml::parse_with(&source, &options.parse)?;
    CancelToken::check(options.cancel.as_ref())?;

    let Decoded { document, warnings } = codec::decode_with(&tree, options.mode)?;
    debug!(
        ?format,
        attachments = attachments.len(),
        partial = document.is_partial(),
        "loaded package"
    );
    Ok(Package {
        document,
        attachments,
        origin: Origin {
            format,
            entry,
            directory: None,
            entries,
        },
        warnings,
    })
}

/// The document held by a `.reqif` or `.reqifz` file, without decoding it.
///
/// # Errors
///
/// Returns an error if an archive cannot be read or does not hold exactly
/// one document.
pub fn document_source(bytes: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
    match Format::detect(bytes) {
        Format::Archive => Ok(Cow::Owned(archive::read(bytes)?.document)),
        Format::Xml => Ok(Cow::Borrowed(bytes)),
    }
}

/// Saves a package. A path ending in `.reqifz` is written as an archive;
/// anything else as a bare document, with its attachments written next to
/// it.
///
/// Every file the document refers to must be available, either in the
/// package's attachments or next to the source file. Attachments the
/// document does not refer to are written too, unless pruned.
///
/// # Errors
///
/// Returns [`Error::PartialDocument`] for a partial document (unless
/// allowed), [`Error::MissingAttachment`] for a referenced file that is not
/// available, [`ContainerError::UnsafePath`] for a reference outside the
/// document's directory, and I/O errors.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn save(path: &Path, package: &Package, options: &SaveOptions) -> Result<(), Error> {
    let document = &package.document;
    if document.is_partial() && !options.allow_partial {
        return Err(Error::PartialDocument);
    }

    let bytes = codec::to_bytes(document);
    let files = gather(package, options)?;
    let format = Format::from_path(path);

    match format {
        Format::Archive => {
            let entry = package
                .origin
                .entry
                .clone()
                .unwrap_or_else(|| default_entry(path));
            let attachments: Vec<(&str, &[u8])> = files
                .iter()
                .map(|file| (file.path.as_str(), file.data.as_ref()))
                .collect();
            let archive = archive::write(&entry, &bytes, &attachments, &package.origin.entries)?;
            io::write_atomic(path, &archive, options.retry)?;
        }
        Format::Xml => {
            io::write_atomic(path, &bytes, options.retry)?;
            let directory = directory_of(path);
            for file in &files {
                let target = attachments::on_disk(&directory, &file.path)?;
                if file.source.as_deref().is_some_and(|source| same_file(source, &target)) {
                    continue;
                }
                if let Some(parent) = target.parent() {
                    io::retry(parent, options.retry, || fs::create_dir_all(parent))?;
                }
                io::write_atomic(&target, &file.data, options.retry)?;
            }
        }
    }

    debug!(?format, attachments = files.len(), "saved package");
    Ok(())
}

/// An attachment on its way out.
struct Outgoing<'a> {
    path: String,
    data: Cow<'a, [u8]>,
    /// The file it was read from, for attachments found next to the source.
    source: Option<PathBuf>,
}

fn gather<'a>(package: &'a Package, options: &SaveOptions) -> Result<Vec<Outgoing<'a>>, Error> {
    let referenced = package
        .document
        .attachment_references()
        .iter()
        .map(|reference| normalise(reference))
        .collect::<Result<Vec<_>, _>>()?;

    let mut mentioned: Vec<String> = Vec::new();
    for mention in package.document.tool_extension_mentions() {
        let Ok(mention) = normalise(&mention) else {
            continue;
        };
        if !referenced.contains(&mention) && !mentioned.contains(&mention) {
            mentioned.push(mention);
        }
    }

    let mut files: Vec<Outgoing<'a>> = package
        .attachments
        .iter()
        .filter(|(path, _)| {
            !options.prune
                || referenced.iter().chain(&mentioned).any(|r| r == path)
        })
        .map(|(path, data)| Outgoing {
            path: path.to_owned(),
            data: Cow::Borrowed(data),
            source: None,
        })
        .collect();

    for reference in referenced {
        if package.attachments.contains(&reference) {
            continue;
        }
        let on_disk = match &package.origin.directory {
            Some(directory) => Some(attachments::on_disk(directory, &reference)?),
            None => None,
        };
        let Some(source) = on_disk.filter(|candidate| candidate.is_file()) else {
            return Err(Error::MissingAttachment(reference));
        };
        let data = io::read(&source, options.retry)?;
        files.push(Outgoing {
            path: reference,
            data: Cow::Owned(data),
            source: Some(source),
        });
    }

    // a mention is only carried along if it names a file
    for mention in mentioned {
        if package.attachments.contains(&mention) {
            continue;
        }
        let Some(directory) = &package.origin.directory else {
            continue;
        };
        let Ok(source) = attachments::on_disk(directory, &mention) else {
            continue;
        };
        if !source.is_file() {
            continue;
        }
        let data = io::read(&source, options.retry)?;
        files.push(Outgoing {
            path: mention,
            data: Cow::Owned(data),
            source: Some(source),
        });
    }
    Ok(files)
}

fn directory_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn default_entry(path: &Path) -> String {
    path.file_stem().map_or_else(
        || "document.reqif".to_owned(),
        |stem| format!("{}.reqif", stem.to_string_lossy()),
    )
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const MINIMAL: &str = include_str!("../tests/fixtures/minimal.reqif");
    const XHTML: &str = include_str!("../tests/fixtures/xhtml.reqif");

    fn package(source: &str) -> Package {
        from_bytes(source.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn formats_are_detected_from_content_and_extension() {
        assert_eq!(Format::detect(b"<?xml version=\"1.0\"?>"), Format::Xml);
        assert_eq!(Format::detect(b"PK\x03\x04rest"), Format::Archive);
        assert_eq!(Format::from_path(Path::new("a/b.REQIFZ")), Format::Archive);
        assert_eq!(Format::from_path(Path::new("a/b.reqif")), Format::Xml);
    }

    #[test]
    fn bare_documents_load_and_save_unchanged() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("minimal.reqif");
        fs::write(&source, MINIMAL).unwrap();

        let package = load(&source, &LoadOptions::default()).unwrap();
        assert_eq!(package.origin.format, Format::Xml);
        assert_eq!(package.origin.directory.as_deref(), Some(dir.path()));

        let target = dir.path().join("copy.reqif");
        save(&target, &package, &SaveOptions::default()).unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), MINIMAL);
    }

    #[test]
    fn referenced_files_must_be_available() {
        let dir = TempDir::new().unwrap();
        let mut package = package(XHTML);
        let target = dir.path().join("out.reqifz");

        let error = save(&target, &package, &SaveOptions::default()).unwrap_err();
        assert!(matches!(error, Error::MissingAttachment(path) if path == "files/pic.png"));
        assert!(!target.exists());

        package
            .attachments
            .insert("files/pic.png", b"png".to_vec())
            .unwrap();
        save(&target, &package, &SaveOptions::default()).unwrap();

        let reloaded = load(&target, &LoadOptions::default()).unwrap();
        assert_eq!(reloaded.origin.format, Format::Archive);
        assert_eq!(reloaded.origin.entry.as_deref(), Some("out.reqif"));
        assert_eq!(reloaded.attachments.get("files/pic.png"), Some(&b"png"[..]));
        assert_eq!(codec::to_bytes(&reloaded.document), XHTML.as_bytes());
    }

    #[test]
    fn files_next_to_the_source_are_carried_into_an_archive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("files")).unwrap();
        fs::write(dir.path().join("files/pic.png"), "png").unwrap();
        let source = dir.path().join("doc.reqif");
        fs::write(&source, XHTML).unwrap();

        let package = load(&source, &LoadOptions::default()).unwrap();
        let target = dir.path().join("doc.reqifz");
        save(&target, &package, &SaveOptions::default()).unwrap();

        let reloaded = load(&target, &LoadOptions::default()).unwrap();
        assert_eq!(reloaded.origin.entry.as_deref(), Some("doc.reqif"));
        assert!(reloaded.attachments.contains("files/pic.png"));
    }

    #[test]
    fn attachments_are_written_next_to_a_bare_document() {
        let dir = TempDir::new().unwrap();
        let mut package = package(XHTML);
        package
            .attachments
            .insert("files/pic.png", b"png".to_vec())
            .unwrap();
        package
            .attachments
            .insert("notes/unused.txt", b"spare".to_vec())
            .unwrap();

        let target = dir.path().join("out").join("doc.reqif");
        fs::create_dir(dir.path().join("out")).unwrap();
        save(&target, &package, &SaveOptions::default()).unwrap();
        assert_eq!(fs::read(dir.path().join("out/files/pic.png")).unwrap(), b"png");
        assert!(dir.path().join("out/notes/unused.txt").exists());

        let pruned = dir.path().join("pruned.reqifz");
        let options = SaveOptions {
            prune: true,
            ..SaveOptions::default()
        };
        save(&pruned, &package, &options).unwrap();
        let reloaded = load(&pruned, &LoadOptions::default()).unwrap();
        assert_eq!(reloaded.attachments.paths().collect::<Vec<_>>(), ["files/pic.png"]);
    }

    #[test]
    fn pruning_keeps_files_named_by_tool_extensions() {
        let dir = TempDir::new().unwrap();
        let source = XHTML.replace(
            r#"<vnd:settings attachment="files/logo.svg"/>"#,
            r#"<vnd:settings attachment="files/logo.svg"><vnd:baseline>./notes/base.csv</vnd:baseline></vnd:settings>"#,
        );
        let mut package = package(&source);
        for (path, data) in [
            ("files/pic.png", &b"png"[..]),
            ("files/logo.svg", b"<svg/>"),
            ("notes/base.csv", b"a,b"),
            ("notes/unused.txt", b"spare"),
        ] {
            package.attachments.insert(path, data.to_vec()).unwrap();
        }
        assert!(
            package
                .document
                .tool_extension_mentions()
                .contains(&"./notes/base.csv".to_owned())
        );

        let pruned = dir.path().join("pruned.reqifz");
        let options = SaveOptions {
            prune: true,
            ..SaveOptions::default()
        };
        save(&pruned, &package, &options).unwrap();
        let reloaded = load(&pruned, &LoadOptions::default()).unwrap();
        assert_eq!(
            reloaded.attachments.paths().collect::<Vec<_>>(),
            ["files/logo.svg", "files/pic.png", "notes/base.csv"]
        );
    }

    #[test]
    fn tool_extension_mentions_are_not_required() {
        let dir = TempDir::new().unwrap();
        let mut package = package(XHTML);
        package
            .attachments
            .insert("files/pic.png", b"png".to_vec())
            .unwrap();

        let target = dir.path().join("out.reqifz");
        save(&target, &package, &SaveOptions::default()).unwrap();
        let reloaded = load(&target, &LoadOptions::default()).unwrap();
        assert!(!reloaded.attachments.contains("files/logo.svg"));
    }

    #[test]
    fn references_outside_the_directory_are_refused() {
        let dir = TempDir::new().unwrap();
        let package = package(&XHTML.replace("files/pic.png", "../pic.png"));

        let error = save(&dir.path().join("out.reqif"), &package, &SaveOptions::default())
            .unwrap_err();
        assert!(matches!(
            error,
            Error::Container(ContainerError::UnsafePath(path)) if path == "../pic.png"
        ));
    }

    #[test]
    fn partial_documents_are_only_saved_on_request() {
        let dir = TempDir::new().unwrap();
        let dangling = MINIMAL.replace(">SOT</SPEC-OBJECT-TYPE-REF>", ">GONE</SPEC-OBJECT-TYPE-REF>");
        let options = LoadOptions {
            mode: Mode::Lenient,
            ..LoadOptions::default()
        };
        let package = from_bytes(dangling.as_bytes(), &options).unwrap();
        assert_eq!(package.warnings.len(), 1);

        let target = dir.path().join("partial.reqif");
        let error = save(&target, &package, &SaveOptions::default()).unwrap_err();
        assert!(matches!(error, Error::PartialDocument));

        let allow = SaveOptions {
            allow_partial: true,
            ..SaveOptions::default()
        };
        save(&target, &package, &allow).unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), dangling);
    }

    #[test]
    fn a_cancelled_load_stops_before_decoding() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let options = LoadOptions {
            cancel: Some(cancel),
            ..LoadOptions::default()
        };
        assert!(matches!(
            from_bytes(MINIMAL.as_bytes(), &options),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn missing_files_report_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.reqif");
        let error = load(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(error, Error::Io { path: p, attempts: 1, .. } if p == path));
    }
}
