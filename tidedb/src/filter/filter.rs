use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::index::RangeQuery;
use std::any::Any;
use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;

use super::AllFilter;
use super::AndFilter;
use super::NotFilter;
use super::OrFilter;

/// How an index can narrow down the candidates of a filter.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexScan {
    Equals(Value),
    In(Vec<Value>),
    Range(RangeQuery),
}

/// Contract of a node in a filter tree.
pub trait FilterProvider: Any + Send + Sync + Display {
    /// Evaluates the filter against a document.
    fn apply(&self, entry: &Document) -> TideResult<bool>;

    /// Index lookups that yield a superset of the matching documents, as
    /// `(field name, scan)` pairs. Empty when no index can help.
    fn index_scans(&self) -> Vec<(String, IndexScan)> {
        vec![]
    }

    fn logical_filters(&self) -> TideResult<Vec<Filter>> {
        log::error!("Filter {} is not a logical filter", self);
        Err(TideError::new(
            "Filter is not a logical filter",
            ErrorKind::InvalidOperation,
        ))
    }

    fn as_any(&self) -> &dyn Any;
}

/// A parsed query.
///
/// Build one from a query document with [`super::parse_query`], or combine
/// filters with [all], [and], [or] and [not].
#[derive(Clone)]
pub struct Filter {
    inner: Arc<dyn FilterProvider>,
}

impl Filter {
    pub fn new<T: FilterProvider + 'static>(inner: T) -> Self {
        Filter {
            inner: Arc::new(inner),
        }
    }

    pub fn and(&self, filter: Filter) -> Self {
        Filter::new(AndFilter::new(vec![self.clone(), filter]))
    }

    pub fn or(&self, filter: Filter) -> Self {
        Filter::new(OrFilter::new(vec![self.clone(), filter]))
    }

    pub fn not(&self) -> Self {
        Filter::new(NotFilter::new(self.clone()))
    }
}

impl Display for Filter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Deref for Filter {
    type Target = Arc<dyn FilterProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// A filter matching every document.
pub fn all() -> Filter {
    Filter::new(AllFilter {})
}

pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::new(AndFilter::new(filters))
}

pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::new(OrFilter::new(filters))
}

pub fn not(filter: Filter) -> Filter {
    Filter::new(NotFilter::new(filter))
}

pub(crate) fn is_all_filter(filter: &Filter) -> bool {
    filter.as_any().is::<AllFilter>()
}
