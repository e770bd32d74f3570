//! # Reconcile
//!
//! Schema-driven documents and desired-state merging for hierarchical
//! configuration resources.
//!
//! This crate performs no I/O. It provides the pieces a remote client needs
//! to decide *what* to send:
//!
//! - **ResourceType**: declarative per-type metadata (ordered fields with
//!   defaults, preserved and CDATA rules, attributes, child collections)
//! - **Document**: an XML-shaped tree built from a schema, with a namespaced
//!   quick-xml codec
//! - **Address**: the hierarchical path of a resource derived from its
//!   parents, type segment and name
//! - **merge**: applies a [`DesiredState`] to a document and reports every
//!   [`Change`], which doubles as the idempotence check
//! - **Version**: segment-wise version ordering
//! - **Validator**: the swappable document validation seam
//!
//! ## Example
//!
//! ```
//! use reconcile::{merge, DesiredState, Document, FieldDef, MergeMode, ResourceType};
//!
//! static NOTE: ResourceType = ResourceType::new("note", "notes")
//!     .with_fields(&[
//!         FieldDef::text("title"),
//!         FieldDef::text("description").preserved(),
//!     ]);
//!
//! let current = Document::template(&NOTE);
//! let desired = DesiredState::new().set("title", "hello");
//! let merged = merge(&NOTE, &current, &desired, Some("n1"), MergeMode::Create);
//!
//! assert!(merged.changed());
//! assert_eq!(merged.document.field("title"), Some("hello"));
//! assert_eq!(merged.document.name(), Some("n1"));
//! ```

pub mod address;
pub mod document;
pub mod error;
pub mod merge;
pub mod schema;
pub mod types;
pub mod validate;
pub mod version;

pub use address::Address;
pub use document::{Document, Element, NAMESPACE};
pub use error::{Error, ErrorCategory, Result};
pub use merge::{Change, ChangeSummary, DesiredState, Merge, MergeMode, Target, Value, merge};
pub use schema::{
    AttributeDef, CollectionDef, Encoding, FieldDef, FieldKind, FieldSource, ResourceType,
};
pub use types::Outcome;
pub use validate::{AcceptAll, SchemaValidator, Validator};
pub use version::{Version, compare_versions};
