#![allow(clippy::approx_constant)]
//! # tidedb - embedded document store
//!
//! tidedb keeps schemaless documents in memory, indexes them with ordered
//! per-field indexes and persists them to an append-only datafile, one JSON
//! document per line, that is compacted on load and on demand.
//!
//! ## Quick Start
//!
//! ```rust
//! use tidedb::collection::{multi, remove_all};
//! use tidedb::index::unique_index;
//! use tidedb::{doc, val, Datastore};
//!
//! # fn main() -> tidedb::errors::TideResult<()> {
//! let db = Datastore::builder().open()?;
//! db.ensure_index(unique_index("email"))?;
//!
//! db.insert(doc! { name: "John", email: "john@example.com", age: 20 })?;
//! db.insert(doc! { name: "Mary", email: "mary@example.com", age: 25 })?;
//!
//! // a second John is rejected by the unique index
//! assert!(db.insert(doc! { name: "John", email: "john@example.com" }).is_err());
//!
//! db.update(doc! {}, doc! { "$inc": { age: 1 } }, multi())?;
//! let mary = db.find_one(&doc! { name: "Mary" }, None)?.unwrap();
//! assert_eq!(mary.get("age"), val!(26));
//!
//! assert_eq!(db.remove(doc! {}, remove_all())?, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Persistence
//!
//! Give the builder a filename to persist the data. With `autoload` the
//! datafile is loaded when the datastore is built; [`DatastoreBuilder::open`]
//! waits for that load while [`DatastoreBuilder::build`] reports it through
//! the `onload` callback.
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, cursors and read/update options
//! - [`common`] - Values, processors and utilities
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Query documents and their evaluation
//! - [`index`] - Ordered field indexes
//! - [`store`] - Datafile format and persistence

pub mod collection;
pub mod common;
pub mod datastore;
pub mod datastore_builder;
pub mod datastore_config;
pub mod errors;
pub mod filter;
pub mod index;
pub mod store;

pub use datastore::{Datastore, LoadState};
pub use datastore_builder::DatastoreBuilder;
pub use datastore_config::{DatastoreConfig, LoadPolicy, OnloadCallback};
