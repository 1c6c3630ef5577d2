//! Open documents, addressed by handle.
//!
//! A [`Session`] owns every document it opens. Callers hold only
//! [`DocumentHandle`]s and entity identifiers, and go through the session for
//! every read and change. Reads borrow the session shared and mutations
//! borrow it exclusively, so a document is never read while a change to it
//! is half applied.

use std::{collections::HashMap, fmt, path::Path};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    Error,
    container::{self, Attachments, LoadOptions, Package, SaveOptions},
    domain::{Config, Document, EntityRef, Mutation, Version},
};

/// Refers to a document open in a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentHandle(u64);

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The documents open in an application.
#[derive(Debug, Default)]
pub struct Session {
    config: Config,
    next: u64,
    open: HashMap<DocumentHandle, Package>,
}

impl Session {
    /// A session with no open documents.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            next: 0,
            open: HashMap::new(),
        }
    }

    /// The configuration documents are loaded and saved with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Opens a file in strict mode.
    ///
    /// # Errors
    ///
    /// See [`container::load`].
    pub fn open_document(&mut self, path: &Path) -> Result<DocumentHandle, Error> {
        let options = LoadOptions::from(&self.config);
        self.open_document_with(path, &options)
    }

    /// Opens a file with explicit options, such as lenient decoding or a
    /// cancellation token.
    ///
    /// # Errors
    ///
    /// See [`container::load`].
    #[instrument(skip(self, options), fields(path = %path.display()))]
    pub fn open_document_with(
        &mut self,
        path: &Path,
        options: &LoadOptions,
    ) -> Result<DocumentHandle, Error> {
        let package = container::load(path, options)?;
        Ok(self.insert(package))
    }

    /// Adds a package that was built or loaded elsewhere.
    pub fn insert(&mut self, package: Package) -> DocumentHandle {
        self.next += 1;
        let handle = DocumentHandle(self.next);
        self.open.insert(handle, package);
        debug!(%handle, "document opened");
        handle
    }

    /// Saves an open document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandle`] for a handle that is not open, and
    /// otherwise see [`container::save`].
    pub fn save_document(&self, handle: DocumentHandle, path: &Path) -> Result<(), Error> {
        let package = self.package(handle)?;
        container::save(path, package, &SaveOptions::from(&self.config))
    }

    /// Saves an open document with explicit options.
    ///
    /// # Errors
    ///
    /// See [`Session::save_document`].
    pub fn save_document_with(
        &self,
        handle: DocumentHandle,
        path: &Path,
        options: &SaveOptions,
    ) -> Result<(), Error> {
        container::save(path, self.package(handle)?, options)
    }

    /// Looks up an entity by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the document declares no such
    /// identifier.
    pub fn get_entity(
        &self,
        handle: DocumentHandle,
        identifier: &str,
    ) -> Result<EntityRef<'_>, Error> {
        self.document(handle)?
            .entity(identifier)
            .ok_or_else(|| Error::NotFound(identifier.to_owned()))
    }

    /// Applies a mutation, returning the new document version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the mutation is rejected; the
    /// document is then unchanged.
    pub fn apply_mutation(
        &mut self,
        handle: DocumentHandle,
        mutation: Mutation,
    ) -> Result<Version, Error> {
        let package = self
            .open
            .get_mut(&handle)
            .ok_or(Error::UnknownHandle(handle))?;
        Ok(package.document.apply(mutation)?)
    }

    /// The document behind a handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandle`] for a handle that is not open.
    pub fn document(&self, handle: DocumentHandle) -> Result<&Document, Error> {
        self.package(handle).map(|package| &package.document)
    }

    /// The package behind a handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandle`] for a handle that is not open.
    pub fn package(&self, handle: DocumentHandle) -> Result<&Package, Error> {
        self.open.get(&handle).ok_or(Error::UnknownHandle(handle))
    }

    /// The attachments of an open document, for adding or replacing files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandle`] for a handle that is not open.
    pub fn attachments_mut(&mut self, handle: DocumentHandle) -> Result<&mut Attachments, Error> {
        self.open
            .get_mut(&handle)
            .map(|package| &mut package.attachments)
            .ok_or(Error::UnknownHandle(handle))
    }

    /// Handles of every open document, in the order they were opened.
    #[must_use]
    pub fn handles(&self) -> Vec<DocumentHandle> {
        let mut handles: Vec<_> = self.open.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    /// Closes a document, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHandle`] for a handle that is not open.
    pub fn close(&mut self, handle: DocumentHandle) -> Result<Package, Error> {
        let package = self
            .open
            .remove(&handle)
            .ok_or(Error::UnknownHandle(handle))?;
        debug!(%handle, "document closed");
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        codec,
        domain::{Identifier, Value, ValidationError},
    };

    const MINIMAL: &str = include_str!("../tests/fixtures/minimal.reqif");

    fn open() -> (TempDir, Session, DocumentHandle) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("minimal.reqif");
        fs::write(&path, MINIMAL).unwrap();
        let mut session = Session::default();
        let handle = session.open_document(&path).unwrap();
        (dir, session, handle)
    }

    fn id(value: &str) -> Identifier {
        Identifier::new(value).unwrap()
    }

    #[test]
    fn entities_are_found_by_identifier() {
        let (_dir, session, handle) = open();

        let entity = session.get_entity(handle, "SO-1").unwrap();
        assert_eq!(entity.kind_name(), "SPEC-OBJECT");
        assert!(matches!(
            session.get_entity(handle, "NOPE"),
            Err(Error::NotFound(identifier)) if identifier == "NOPE"
        ));
    }

    #[test]
    fn mutations_advance_the_version() {
        let (dir, mut session, handle) = open();

        let version = session
            .apply_mutation(
                handle,
                Mutation::SetAttributeValue {
                    owner: id("SO-1"),
                    definition: id("AD-DONE"),
                    value: Value::Boolean(false),
                },
            )
            .unwrap();
        assert_eq!(version.get(), 1);

        let out = dir.path().join("out.reqif");
        session.save_document(handle, &out).unwrap();
        assert!(fs::read_to_string(out).unwrap().contains(r#"THE-VALUE="false""#));
    }

    #[test]
    fn rejected_mutations_leave_the_document_unchanged() {
        let (_dir, mut session, handle) = open();
        let before = codec::to_bytes(session.document(handle).unwrap());

        let error = session
            .apply_mutation(
                handle,
                Mutation::SetAttributeValue {
                    owner: id("SO-1"),
                    definition: id("AD-DONE"),
                    value: Value::String("yes".to_owned()),
                },
            )
            .unwrap_err();

        assert!(matches!(
            error,
            Error::Validation(ValidationError::KindMismatch { .. })
        ));
        let document = session.document(handle).unwrap();
        assert_eq!(codec::to_bytes(document), before);
        assert_eq!(document.version().get(), 0);
    }

    #[test]
    fn closed_handles_are_unknown() {
        let (_dir, mut session, handle) = open();
        assert_eq!(session.handles(), [handle]);

        let package = session.close(handle).unwrap();
        assert_eq!(package.document.spec_objects().len(), 1);
        assert!(session.handles().is_empty());
        assert!(matches!(
            session.document(handle),
            Err(Error::UnknownHandle(h)) if h == handle
        ));
        assert!(matches!(session.close(handle), Err(Error::UnknownHandle(_))));
    }

    #[test]
    fn handles_are_not_reused() {
        let mut session = Session::default();
        let first = session.insert(Package::new(Document::new()));
        session.close(first).unwrap();
        let second = session.insert(Package::new(Document::new()));
        assert_ne!(first, second);
    }
}
