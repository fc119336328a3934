use std::any::Any;
use std::fmt::Display;

use itertools::Itertools;

use crate::collection::Document;
use crate::common::{RegexValue, Value};
use crate::errors::TideResult;
use crate::index::RangeQuery;

use super::{Filter, FilterProvider, IndexScan};

/// A single condition on a field value.
#[derive(Clone)]
pub(crate) enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Regex(RegexValue),
    Size(i64),
    ElemMatch(Filter),
    Not(Vec<Condition>),
}

impl Condition {
    /// Whether the condition is evaluated on an array as a whole rather than
    /// on each of its elements.
    fn applies_to_whole_value(&self) -> bool {
        match self {
            Condition::Eq(value) | Condition::Ne(value) => value.is_array(),
            Condition::Exists(_)
            | Condition::Size(_)
            | Condition::ElemMatch(_)
            | Condition::Not(_) => true,
            _ => false,
        }
    }

    fn matches(&self, value: &Value) -> TideResult<bool> {
        if let Value::Array(items) = value {
            if !self.applies_to_whole_value() {
                for item in items {
                    if self.matches_value(item)? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
        }
        self.matches_value(value)
    }

    fn matches_value(&self, value: &Value) -> TideResult<bool> {
        let result = match self {
            Condition::Eq(expected) => value == expected,
            Condition::Ne(expected) => value != expected,
            Condition::Gt(bound) => value.is_comparable_with(bound) && value > bound,
            Condition::Gte(bound) => value.is_comparable_with(bound) && value >= bound,
            Condition::Lt(bound) => value.is_comparable_with(bound) && value < bound,
            Condition::Lte(bound) => value.is_comparable_with(bound) && value <= bound,
            Condition::In(values) => values.contains(value),
            Condition::Nin(values) => !values.contains(value),
            Condition::Exists(expected) => !value.is_undefined() == *expected,
            Condition::Regex(regex) => value.as_str().map(|s| regex.is_match(s)).unwrap_or(false),
            Condition::Size(size) => value
                .as_array()
                .map(|items| items.len() as i64 == *size)
                .unwrap_or(false),
            Condition::ElemMatch(filter) => match value.as_array() {
                Some(items) => {
                    for item in items {
                        if let Value::Document(doc) = item {
                            if filter.apply(doc)? {
                                return Ok(true);
                            }
                        }
                    }
                    false
                }
                None => false,
            },
            Condition::Not(conditions) => {
                for condition in conditions {
                    if !condition.matches(value)? {
                        return Ok(true);
                    }
                }
                false
            }
        };
        Ok(result)
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Eq(value) => write!(f, "== {}", value),
            Condition::Ne(value) => write!(f, "!= {}", value),
            Condition::Gt(value) => write!(f, "> {}", value),
            Condition::Gte(value) => write!(f, ">= {}", value),
            Condition::Lt(value) => write!(f, "< {}", value),
            Condition::Lte(value) => write!(f, "<= {}", value),
            Condition::In(values) => write!(f, "in [{}]", values.iter().join(", ")),
            Condition::Nin(values) => write!(f, "not in [{}]", values.iter().join(", ")),
            Condition::Exists(expected) => write!(f, "exists {}", expected),
            Condition::Regex(regex) => write!(f, "=~ /{}/", regex.pattern()),
            Condition::Size(size) => write!(f, "size {}", size),
            Condition::ElemMatch(filter) => write!(f, "elemMatch {}", filter),
            Condition::Not(conditions) => {
                write!(f, "not ({})", conditions.iter().join(" && "))
            }
        }
    }
}

/// Conditions on one (possibly dotted) field; all of them must hold.
pub(crate) struct FieldFilter {
    field_name: String,
    conditions: Vec<Condition>,
}

impl FieldFilter {
    pub(crate) fn new(field_name: &str, conditions: Vec<Condition>) -> Self {
        FieldFilter {
            field_name: field_name.to_string(),
            conditions,
        }
    }

    fn range_scan(&self) -> Option<IndexScan> {
        let mut range = RangeQuery::default();
        for condition in &self.conditions {
            match condition {
                Condition::Gt(v) => range.gt = Some(v.clone()),
                Condition::Gte(v) => range.gte = Some(v.clone()),
                Condition::Lt(v) => range.lt = Some(v.clone()),
                Condition::Lte(v) => range.lte = Some(v.clone()),
                _ => {}
            }
        }

        let bounds: Vec<&Value> = [&range.gt, &range.gte, &range.lt, &range.lte]
            .into_iter()
            .flatten()
            .collect();
        let same_class = bounds
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.is_comparable_with(b));
        let orderable = bounds
            .iter()
            .all(|v| v.is_number() || v.as_str().is_some() || v.as_date().is_some());

        if range.is_empty() || !same_class || !orderable {
            None
        } else {
            Some(IndexScan::Range(range))
        }
    }
}

impl Display for FieldFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = self
            .conditions
            .iter()
            .map(|condition| format!("{} {}", self.field_name, condition))
            .join(" && ");
        write!(f, "({})", parts)
    }
}

impl FilterProvider for FieldFilter {
    fn apply(&self, entry: &Document) -> TideResult<bool> {
        let value = entry.get(&self.field_name);
        for condition in &self.conditions {
            if !condition.matches(&value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn index_scans(&self) -> Vec<(String, IndexScan)> {
        for condition in &self.conditions {
            match condition {
                // an index holds array elements, not whole arrays
                Condition::Eq(value) if !value.is_array() => {
                    return vec![(self.field_name.clone(), IndexScan::Equals(value.clone()))];
                }
                Condition::In(values) if !values.iter().any(Value::is_array) => {
                    return vec![(self.field_name.clone(), IndexScan::In(values.clone()))];
                }
                _ => {}
            }
        }

        match self.range_scan() {
            Some(scan) => vec![(self.field_name.clone(), scan)],
            None => vec![],
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
