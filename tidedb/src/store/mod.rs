//! Persistence.
//!
//! Documents are persisted to an append-only datafile: one JSON object per
//! line, each line being a full document, a deletion marker or an index
//! definition change. See [codec] for the line format and [Datafile] for the
//! load, append and compaction protocol.

pub mod codec;
mod datafile;

pub use codec::*;
pub use datafile::*;
