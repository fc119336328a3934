//! Ordered secondary indexes.
//!
//! An [Index] maps field values to the primary keys of the documents holding
//! them. Indexes are unique or non-unique, optionally sparse, and may span
//! several fields (a compound index, declared as `"name,age"`). An indexed
//! array field contributes one key per distinct element.
//!
//! ```rust
//! use tidedb::doc;
//! use tidedb::index::{unique_index, Index};
//! use tidedb::val;
//!
//! let mut index = Index::new(unique_index("email"));
//! index.insert(&doc! { _id: 1, email: "john@example.com" }).unwrap();
//! assert_eq!(index.find(&val!("john@example.com")), vec![val!(1)]);
//! assert!(index.insert(&doc! { _id: 2, email: "john@example.com" }).is_err());
//! ```

#[allow(clippy::module_inception)]
mod index;
mod index_set;
mod options;

pub use index::*;
pub use index_set::*;
pub use options::*;
