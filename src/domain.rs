//! The typed ReqIF model.
//!
//! Every entity of a ReqIF 1.2 document has a plain data type here, owned by
//! a [`Document`]. Entities refer to each other by [`Identifier`], never by
//! pointer. Each entity also keeps an [`OpaqueExtra`] recording whatever the
//! typed fields do not capture, so that an unedited document encodes back to
//! its source.

mod config;
pub use config::Config;

mod datatype;
pub use datatype::{DatatypeDefinition, DatatypeKind, EmbeddedValue, EnumValue, ValueKind};

mod document;
pub use document::{
    Document, EntityRef, Placement, REQIF_NAMESPACE, SchemaError, SchemaErrorKind,
    UnresolvedReference, Version,
};
pub(crate) use document::Envelope;

mod header;
pub use header::{Header, ToolExtension};

mod identifier;
pub use identifier::{EmptyIdentifier, Identifier, Reference};

mod index;
pub use index::{Index, Location};

mod metadata;
pub use metadata::{Identifiable, Metadata};

/// Validated changes to a document.
pub mod mutation;
pub use mutation::{Mutation, ValidationError};

mod opaque;
pub use opaque::{AttributeSlot, ChildSlot, OpaqueExtra, Sequence};

mod relation;
pub use relation::{RelationGroup, SpecRelation};

mod spec_object;
pub use spec_object::{Attributed, SpecObject};

mod spec_type;
pub use spec_type::{AttributeDefinition, DefaultValue, SpecType, SpecTypeKind};

mod specification;
pub use specification::{SpecHierarchy, Specification};

/// Traceability queries over spec relations.
pub mod trace;
pub use trace::TraceGraph;

mod value;
pub(crate) use value::parse_boolean;
pub use value::{AttributeValue, Value, XhtmlValue};

mod xhtml;
pub use xhtml::XhtmlContent;
