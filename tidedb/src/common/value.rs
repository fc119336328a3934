use crate::collection::Document;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

/// Compare two floats with proper NaN and total ordering.
#[inline]
fn num_cmp_float(a: f64, b: f64) -> Ordering {
    // NaN sorts after every other number
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Compares an integer with a float without rounding the integer.
fn num_cmp_int_float(int: i64, float: f64) -> Ordering {
    // 2^63, the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() || float >= LIMIT {
        return Ordering::Less;
    }
    if float < -LIMIT {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)).unwrap_or(Ordering::Equal),
        ordering => ordering,
    }
}

/// A compiled regular expression stored as a document value.
///
/// Two `RegexValue`s are equal when their source patterns are equal.
#[derive(Clone)]
pub struct RegexValue {
    regex: Regex,
}

impl RegexValue {
    pub fn new(pattern: &str) -> crate::errors::TideResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            log::error!("Invalid regular expression '{}': {}", pattern, e);
            crate::errors::TideError::from(e)
        })?;
        Ok(RegexValue { regex })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl From<Regex> for RegexValue {
    fn from(regex: Regex) -> Self {
        RegexValue { regex }
    }
}

impl Debug for RegexValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/", self.regex.as_str())
    }
}

/// Represents a [Document] value.
///
/// The variant set is closed: besides the JSON types it carries `Undefined`
/// (an absent field), `Date` and `Regex`, which the record codec stores as
/// tagged envelopes so they survive a round trip through the datafile.
///
/// Values are totally ordered across types:
/// `Undefined < Null < numbers < strings < booleans < dates < regexes < arrays < documents`.
/// Integers and floats compare numerically with each other, so `val!(30) == val!(30.0)`.
///
/// ```rust
/// use tidedb::common::Value;
/// use tidedb::val;
///
/// assert_eq!(val!(30), Value::I64(30));
/// assert_eq!(val!(30), val!(30.0));
/// assert!(val!("abc") > val!(100));
/// ```
#[derive(Clone, Default, Debug)]
pub enum Value {
    /// An absent field.
    Undefined,
    /// Represents a null value.
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    /// A UTC instant with millisecond precision.
    Date(DateTime<Utc>),
    Regex(RegexValue),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    fn type_rank(&self) -> u8 {
        match self {
            Value::Undefined => 0,
            Value::Null => 1,
            Value::I64(_) | Value::F64(_) => 2,
            Value::String(_) => 3,
            Value::Bool(_) => 4,
            Value::Date(_) => 5,
            Value::Regex(_) => 6,
            Value::Array(_) => 7,
            Value::Document(_) => 8,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            Value::F64(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_regex(&self) -> Option<&RegexValue> {
        match self {
            Value::Regex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::I64(_) | Value::F64(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    /// Whether two values belong to the same ordered class (numbers, strings
    /// or dates) and can be compared with `$lt`/`$gt` style operators.
    pub fn is_comparable_with(&self, other: &Value) -> bool {
        matches!(
            (self, other),
            (Value::I64(_) | Value::F64(_), Value::I64(_) | Value::F64(_))
                | (Value::String(_), Value::String(_))
                | (Value::Date(_), Value::Date(_))
        )
    }

    /// Loose truthiness used by `$exists`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(v) => *v,
            Value::I64(v) => *v != 0,
            Value::F64(v) => *v != 0.0 && !v.is_nan(),
            Value::String(v) => !v.is_empty(),
            _ => true,
        }
    }

    /// Useful for moving a value out of a document field without cloning.
    pub fn take(&mut self) -> Value {
        std::mem::replace(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::I64(a), Value::F64(b)) => num_cmp_int_float(*a, *b),
            (Value::F64(a), Value::I64(b)) => num_cmp_int_float(*b, *a).reverse(),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Regex(a), Value::Regex(b)) => a.pattern().cmp(b.pattern()),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Document(a), Value::Document(b)) => {
                let left = a.iter().sorted_by(|x, y| x.0.cmp(y.0));
                let right = b.iter().sorted_by(|x, y| x.0.cmp(y.0));
                left.cmp(right)
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => num_cmp_float(x, y),
                // same rank, no payload: Undefined/Undefined or Null/Null
                _ => Ordering::Equal,
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::Date(v) => write!(f, "Date({})", v.to_rfc3339()),
            Value::Regex(v) => write!(f, "/{}/", v.pattern()),
            Value::Array(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::Document(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(value: i32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<u32> for Value {
    #[inline]
    fn from(value: u32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(value: usize) -> Self {
        Value::I64(value as i64)
    }
}

impl From<f32> for Value {
    #[inline]
    fn from(value: f32) -> Self {
        Value::F64(value as f64)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<RegexValue> for Value {
    fn from(value: RegexValue) -> Self {
        Value::Regex(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

/// A macro to create a `Value` from a given expression.
///
/// ```rust
/// use tidedb::common::Value;
/// use tidedb::val;
///
/// assert_eq!(val!(42), Value::I64(42));
/// assert_eq!(val!("hello"), Value::String("hello".to_string()));
/// assert_eq!(val!(true), Value::Bool(true));
/// ```
#[macro_export]
macro_rules! val {
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
