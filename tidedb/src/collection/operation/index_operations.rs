use crate::collection::snapshot::Snapshot;
use crate::common::DOC_ID;
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::index::IndexOptions;
use crate::store::LogRecord;

/// Builds an index over the live documents.
///
/// Returns `None` when an index on the same field already exists. A document
/// breaking the uniqueness of the new index fails the whole call and the
/// index is not created.
pub(crate) fn ensure_index(
    snapshot: &mut Snapshot,
    options: IndexOptions,
) -> TideResult<Option<LogRecord>> {
    let options = options.normalized();
    if options.field_name().is_empty() {
        log::error!("Cannot create an index without a fieldName");
        return Err(TideError::new(
            "Cannot create an index without a fieldName",
            ErrorKind::ValidationError,
        ));
    }

    if snapshot.indexes().contains(options.field_name()) {
        return Ok(None);
    }

    snapshot.create_index(options.clone())?;
    log::debug!("Created index on {}", options.field_name());
    Ok(Some(LogRecord::IndexCreated(options)))
}

pub(crate) fn remove_index(snapshot: &mut Snapshot, field_name: &str) -> TideResult<LogRecord> {
    let field_name = IndexOptions::new(field_name).field_name().to_string();
    if field_name == DOC_ID {
        log::error!("Cannot remove the index on _id");
        return Err(TideError::new(
            "Cannot remove the index on _id",
            ErrorKind::InvalidOperation,
        ));
    }

    if snapshot.remove_index(&field_name).is_none() {
        log::debug!("No index on {} to remove", field_name);
    }
    Ok(LogRecord::IndexRemoved(field_name))
}
