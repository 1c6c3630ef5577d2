use std::{io, path::PathBuf};

use crate::{
    codec::DecodeError,
    container::ContainerError,
    domain::{SchemaError, UnresolvedReference, ValidationError},
    session::DocumentHandle,
    xml::ParseError,
};

/// Everything that can go wrong between a file on disk and a document in
/// memory.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file operation failed.
    #[error("{}: {source} (after {attempts} attempt(s))", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// How many times the operation was tried.
        attempts: u32,
        /// The last failure.
        #[source]
        source: io::Error,
    },

    /// The document is not well-formed XML.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The document does not have the ReqIF structure.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The document refers to an identifier it does not declare.
    #[error(transparent)]
    UnresolvedReference(#[from] UnresolvedReference),

    /// A mutation was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The document refers to a file that is not available.
    #[error("attachment {0:?} is referenced but not available")]
    MissingAttachment(String),

    /// The container around the document is not valid.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A `.reqifz` archive could not be read or written.
    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The load was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The document was loaded leniently and is missing content.
    #[error("the document is partial; saving it would drop content")]
    PartialDocument,

    /// No entity has the identifier.
    #[error("no element with identifier {0}")]
    NotFound(String),

    /// The handle does not refer to an open document.
    #[error("no open document for handle {0}")]
    UnknownHandle(DocumentHandle),
}

impl From<DecodeError> for Error {
    fn from(error: DecodeError) -> Self {
        match error {
            DecodeError::Schema(error) => Self::Schema(error),
            DecodeError::Unresolved(error) => Self::UnresolvedReference(error),
        }
    }
}
