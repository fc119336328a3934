use crate::collection::snapshot::Snapshot;
use crate::collection::{Document, FindOptions};
use crate::errors::TideResult;
use crate::filter::parse_query;

/// Runs match, sort, skip, limit and projection, in that order.
pub(crate) fn find(
    snapshot: &Snapshot,
    query: &Document,
    options: &FindOptions,
) -> TideResult<Vec<Document>> {
    let filter = parse_query(query)?;
    let matched = snapshot.find(&filter)?;
    let selected = options.select(matched)?;
    options.project(selected)
}

pub(crate) fn find_one(
    snapshot: &Snapshot,
    query: &Document,
    options: &FindOptions,
) -> TideResult<Option<Document>> {
    let options = options.clone().limit(1);
    Ok(find(snapshot, query, &options)?.into_iter().next())
}

/// Counts matching documents. Skip and limit apply, sort and projection
/// don't change the count and are ignored.
pub(crate) fn count(
    snapshot: &Snapshot,
    query: &Document,
    options: &FindOptions,
) -> TideResult<usize> {
    let filter = parse_query(query)?;
    let matched = snapshot.find(&filter)?.len();
    let remaining = matched.saturating_sub(options.skip.unwrap_or(0));
    Ok(options.limit.map_or(remaining, |limit| remaining.min(limit)))
}
