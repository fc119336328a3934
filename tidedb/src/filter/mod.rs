//! Query matching.
//!
//! A query is a [`crate::collection::Document`] in the familiar MongoDB style.
//! [parse_query] turns it into a [Filter] tree that can be applied to
//! documents.
//!
//! ```rust
//! use tidedb::doc;
//! use tidedb::filter::parse_query;
//!
//! let filter = parse_query(&doc! {
//!     "$or": [{ age: { "$gte": 30 } }, { name: { "$in": ["John", "Mary"] } }]
//! }).unwrap();
//!
//! assert!(filter.apply(&doc! { name: "Mary", age: 25 }).unwrap());
//! assert!(!filter.apply(&doc! { name: "Zoe", age: 25 }).unwrap());
//! ```
//!
//! # Supported Operators
//!
//! - **Logical**: `$and`, `$or`, `$not`
//! - **Comparison**: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`
//! - **Membership**: `$in`, `$nin`, `$exists`
//! - **Pattern**: `$regex` (or a regular expression literal)
//! - **Array**: `$size`, `$elemMatch`
//!
//! When a field holds an array, an array literal is compared with the whole
//! array, `$size` and `$elemMatch` look at the whole array, and every other
//! condition matches if any element matches.

#[allow(clippy::module_inception)]
mod filter;
mod field_filters;
mod logical_filters;
mod query_parser;

pub use filter::*;
pub(crate) use logical_filters::*;
pub use query_parser::*;
