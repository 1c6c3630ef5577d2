//! Lossless ReqIF
//!
//! Reads ReqIF 1.2 documents (`.reqif`, or `.reqifz` archives) into a typed
//! model, applies validated changes, and writes them back. Anything the model
//! does not understand survives the trip: an unedited document is written
//! back byte for byte, and an edit changes only what it touches.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use reqif::{Session, domain::{Identifier, Mutation, Value}};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::default();
//! let handle = session.open_document(Path::new("spec.reqif"))?;
//! session.apply_mutation(
//!     handle,
//!     Mutation::SetAttributeValue {
//!         owner: Identifier::new("SO-1")?,
//!         definition: Identifier::new("AD-DONE")?,
//!         value: Value::Boolean(true),
//!     },
//! )?;
//! session.save_document(handle, Path::new("spec.reqif"))?;
//! # Ok(())
//! # }
//! ```

pub mod codec;

pub mod container;
pub use container::{LoadOptions, Package, SaveOptions, load, save};

pub mod domain;
pub use domain::{Config, Document};

mod error;
pub use error::Error;

pub mod session;
pub use session::{DocumentHandle, Session};

pub mod xml;
