use std::{any::Any, fmt::Display};

use itertools::Itertools;

use crate::{collection::Document, errors::TideResult};

use super::{Filter, FilterProvider, IndexScan};

pub(crate) struct AllFilter {}

impl Display for AllFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AllFilter")
    }
}

impl FilterProvider for AllFilter {
    #[inline]
    fn apply(&self, _entry: &Document) -> TideResult<bool> {
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct AndFilter {
    filters: Vec<Filter>,
}

impl AndFilter {
    pub(crate) fn new(filters: Vec<Filter>) -> Self {
        AndFilter { filters }
    }
}

impl Display for AndFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.filters.iter().join(" && "))
    }
}

impl FilterProvider for AndFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> TideResult<bool> {
        for filter in &self.filters {
            if !filter.apply(entry)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // every branch must hold, so any branch's scan narrows the whole
    fn index_scans(&self) -> Vec<(String, IndexScan)> {
        self.filters
            .iter()
            .flat_map(|filter| filter.index_scans())
            .collect()
    }

    fn logical_filters(&self) -> TideResult<Vec<Filter>> {
        Ok(self.filters.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct OrFilter {
    filters: Vec<Filter>,
}

impl OrFilter {
    pub(crate) fn new(filters: Vec<Filter>) -> Self {
        OrFilter { filters }
    }
}

impl Display for OrFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.filters.iter().join(" || "))
    }
}

impl FilterProvider for OrFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> TideResult<bool> {
        for filter in &self.filters {
            if filter.apply(entry)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn logical_filters(&self) -> TideResult<Vec<Filter>> {
        Ok(self.filters.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct NotFilter {
    filter: Filter,
}

impl NotFilter {
    pub(crate) fn new(filter: Filter) -> Self {
        NotFilter { filter }
    }
}

impl Display for NotFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(not {})", self.filter)
    }
}

impl FilterProvider for NotFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> TideResult<bool> {
        Ok(!self.filter.apply(entry)?)
    }

    fn logical_filters(&self) -> TideResult<Vec<Filter>> {
        Ok(vec![self.filter.clone()])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
