//! Documents and the collection engine behind [`crate::Datastore`].
//!
//! A [Document] is an insertion-ordered map from field names to
//! [`crate::common::Value`]s. Nested fields are addressed with dotted paths,
//! which also reach into arrays by position (`items.0`) or across all of
//! their elements (`items.sku`).
//!
//! ```rust
//! use tidedb::{doc, val};
//!
//! let mut doc = doc! { name: "Alice", address: { city: "Paris" } };
//! doc.put("address.zip", 75001).unwrap();
//! assert_eq!(doc.get("address.city"), val!("Paris"));
//! assert!(doc.get("phone").is_undefined());
//! ```
//!
//! # Primary key
//!
//! Every stored document has an `_id`. It is generated (16 random
//! alphanumeric characters) when a document without one is inserted, can't
//! be changed afterwards and is unique across the datastore.
//!
//! # Reads
//!
//! Reads go through a [Cursor] or the [FindOptions] of a read: matching, then
//! sort, skip, limit and finally projection.

mod cursor;
mod document;
mod find_options;
pub(crate) mod modifier;
pub(crate) mod operation;
pub(crate) mod snapshot;
mod update_options;
mod write_result;

pub use cursor::*;
pub use document::*;
pub use find_options::*;
pub use update_options::*;
pub use write_result::*;
