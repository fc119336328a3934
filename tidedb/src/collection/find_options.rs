use crate::collection::Document;
use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, TideError, TideResult};
use std::cmp::Ordering;

/// Sort, skip, limit and projection of a read.
///
/// They are applied after matching, in that order: the matching documents are
/// sorted, `skip` of them are dropped, at most `limit` are kept and finally
/// projected.
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub(crate) sort_by: Option<Document>,
    pub(crate) skip: Option<usize>,
    pub(crate) limit: Option<usize>,
    pub(crate) projection: Option<Document>,
}

/// Sorts by the fields of `sort`, `1` for ascending and `-1` for descending.
pub fn order_by(sort: Document) -> FindOptions {
    FindOptions::new().sort(sort)
}

pub fn skip_by(skip: usize) -> FindOptions {
    FindOptions::new().skip(skip)
}

pub fn limit_to(limit: usize) -> FindOptions {
    FindOptions::new().limit(limit)
}

pub fn project(projection: Document) -> FindOptions {
    FindOptions::new().projection(projection)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn sort(mut self, sort: Document) -> FindOptions {
        self.sort_by = Some(sort);
        self
    }

    pub fn skip(mut self, skip: usize) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Document) -> FindOptions {
        self.projection = Some(projection);
        self
    }

    /// Applies sort, skip and limit.
    pub(crate) fn select(&self, mut documents: Vec<Document>) -> TideResult<Vec<Document>> {
        if let Some(sort) = &self.sort_by {
            sort_documents(&mut documents, sort)?;
        }

        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        Ok(documents.into_iter().skip(skip).take(limit).collect())
    }

    pub(crate) fn project(&self, documents: Vec<Document>) -> TideResult<Vec<Document>> {
        match &self.projection {
            Some(projection) => apply_projection(documents, projection),
            None => Ok(documents),
        }
    }
}

/// Stable sort, so documents that compare equal keep their insertion order.
pub(crate) fn sort_documents(documents: &mut [Document], sort: &Document) -> TideResult<()> {
    let mut criteria = Vec::with_capacity(sort.size());
    for (field, direction) in sort.iter() {
        let direction = match direction.as_f64() {
            Some(d) if d > 0.0 => Ordering::Less,
            Some(d) if d < 0.0 => Ordering::Greater,
            _ => {
                log::error!("Invalid sort direction {} for field {}", direction, field);
                return Err(TideError::new(
                    &format!("Invalid sort direction {} for field {}", direction, field),
                    ErrorKind::InvalidQuery,
                ));
            }
        };
        criteria.push((field.as_str(), direction));
    }

    documents.sort_by(|a, b| {
        for (field, direction) in &criteria {
            let ordering = a.get(field).cmp(&b.get(field));
            if ordering != Ordering::Equal {
                return if *direction == Ordering::Less {
                    ordering
                } else {
                    ordering.reverse()
                };
            }
        }
        Ordering::Equal
    });
    Ok(())
}

/// Keeps (`{field: 1}`) or omits (`{field: 0}`) fields.
///
/// `_id` is kept unless the projection says `_id: 0`. Keeping and omitting
/// other fields in the same projection is an error.
pub(crate) fn apply_projection(
    documents: Vec<Document>,
    projection: &Document,
) -> TideResult<Vec<Document>> {
    if projection.is_empty() {
        return Ok(documents);
    }

    let keep_id = projection
        .field(DOC_ID)
        .map(Value::is_truthy)
        .unwrap_or(true);

    let mut include: Option<bool> = None;
    let mut fields = Vec::new();
    for (field, action) in projection.iter() {
        if field == DOC_ID {
            continue;
        }
        let keep = action.is_truthy();
        match include {
            Some(mode) if mode != keep => {
                log::error!("Can't both keep and omit fields except for _id");
                return Err(TideError::new(
                    "Can't both keep and omit fields except for _id",
                    ErrorKind::InvalidQuery,
                ));
            }
            _ => include = Some(keep),
        }
        fields.push(field.as_str());
    }

    documents
        .into_iter()
        .map(|document| {
            let mut projected = if include == Some(true) {
                let mut kept = Document::new();
                for field in &fields {
                    let value = document.get(field);
                    if !value.is_undefined() {
                        kept.put(field, value)?;
                    }
                }
                kept
            } else {
                let mut kept = document.clone();
                for field in &fields {
                    kept.remove(field);
                }
                kept
            };

            if keep_id {
                if let Some(id) = document.id() {
                    projected.put(DOC_ID, id.clone())?;
                }
            } else {
                projected.remove(DOC_ID);
            }
            Ok(projected.id_first())
        })
        .collect()
}
