use crate::collection::Document;
use crate::common::{RegexValue, Value};
use crate::errors::{ErrorKind, TideError, TideResult};

use super::field_filters::{Condition, FieldFilter};
use super::{all, and, not, or, Filter};

/// Parses a query document into a [Filter].
///
/// Top level keys are field paths or the logical operators `$and`, `$or` and
/// `$not`. A field maps to a literal (equality), a regular expression, or an
/// operator document such as `{ "$gt": 10, "$lt": 20 }`.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidQuery`] for unknown operators, operator
/// documents mixing `$` and plain keys, and operators given an argument of
/// the wrong type.
///
/// ```rust
/// use tidedb::doc;
/// use tidedb::filter::parse_query;
///
/// let filter = parse_query(&doc! { age: { "$gt": 25 } }).unwrap();
/// assert!(filter.apply(&doc! { name: "Emily", age: 30 }).unwrap());
/// assert!(parse_query(&doc! { age: { "$foo": 1 } }).is_err());
/// ```
pub fn parse_query(query: &Document) -> TideResult<Filter> {
    let mut filters = Vec::with_capacity(query.size());
    for (key, value) in query.iter() {
        if key.starts_with('$') {
            filters.push(parse_logical(key, value)?);
        } else {
            filters.push(parse_field(key, value)?);
        }
    }

    match filters.len() {
        0 => Ok(all()),
        1 => Ok(filters.remove(0)),
        _ => Ok(and(filters)),
    }
}

fn parse_logical(operator: &str, value: &Value) -> TideResult<Filter> {
    match operator {
        "$and" | "$or" => {
            let clauses = value.as_array().ok_or_else(|| {
                invalid_query(&format!("{} operator used without an array", operator))
            })?;
            let mut filters = Vec::with_capacity(clauses.len());
            for clause in clauses {
                let clause = clause.as_document().ok_or_else(|| {
                    invalid_query(&format!("{} operator expects an array of queries", operator))
                })?;
                filters.push(parse_query(clause)?);
            }
            if operator == "$and" {
                Ok(and(filters))
            } else {
                Ok(or(filters))
            }
        }
        "$not" => {
            let clause = value
                .as_document()
                .ok_or_else(|| invalid_query("$not operator expects a query"))?;
            Ok(not(parse_query(clause)?))
        }
        _ => Err(invalid_query(&format!("Unknown logical operator {}", operator))),
    }
}

fn parse_field(field_name: &str, value: &Value) -> TideResult<Filter> {
    let conditions = match value {
        Value::Regex(regex) => vec![Condition::Regex(regex.clone())],
        Value::Document(doc) if is_operator_document(doc)? => parse_conditions(doc)?,
        _ => vec![Condition::Eq(value.clone())],
    };
    Ok(Filter::new(FieldFilter::new(field_name, conditions)))
}

fn is_operator_document(doc: &Document) -> TideResult<bool> {
    let dollar_keys = doc.keys().filter(|k| k.starts_with('$')).count();
    if dollar_keys == 0 {
        Ok(false)
    } else if dollar_keys == doc.size() {
        Ok(true)
    } else {
        Err(invalid_query("You cannot mix operators and normal fields"))
    }
}

fn parse_conditions(operators: &Document) -> TideResult<Vec<Condition>> {
    let mut conditions = Vec::with_capacity(operators.size());
    for (operator, argument) in operators.iter() {
        let condition = match operator.as_str() {
            "$eq" => Condition::Eq(argument.clone()),
            "$ne" => Condition::Ne(argument.clone()),
            "$gt" => Condition::Gt(argument.clone()),
            "$gte" => Condition::Gte(argument.clone()),
            "$lt" => Condition::Lt(argument.clone()),
            "$lte" => Condition::Lte(argument.clone()),
            "$in" => Condition::In(array_argument(operator, argument)?),
            "$nin" => Condition::Nin(array_argument(operator, argument)?),
            "$exists" => Condition::Exists(argument.is_truthy()),
            "$regex" => Condition::Regex(regex_argument(argument)?),
            "$size" => match argument.as_i64() {
                Some(size) => Condition::Size(size),
                None => return Err(invalid_query("$size operator called without an integer")),
            },
            "$elemMatch" => match argument.as_document() {
                Some(query) => Condition::ElemMatch(parse_query(query)?),
                None => return Err(invalid_query("$elemMatch operator expects a query")),
            },
            "$not" => match argument {
                Value::Regex(regex) => Condition::Not(vec![Condition::Regex(regex.clone())]),
                Value::Document(doc) if is_operator_document(doc)? => {
                    Condition::Not(parse_conditions(doc)?)
                }
                _ => Condition::Not(vec![Condition::Eq(argument.clone())]),
            },
            _ => {
                return Err(invalid_query(&format!(
                    "Unknown comparison function {}",
                    operator
                )))
            }
        };
        conditions.push(condition);
    }
    Ok(conditions)
}

fn array_argument(operator: &str, argument: &Value) -> TideResult<Vec<Value>> {
    match argument.as_array() {
        Some(values) => Ok(values.clone()),
        None => Err(invalid_query(&format!(
            "{} operator called with a non-array",
            operator
        ))),
    }
}

fn regex_argument(argument: &Value) -> TideResult<RegexValue> {
    match argument {
        Value::Regex(regex) => Ok(regex.clone()),
        Value::String(pattern) => RegexValue::new(pattern),
        _ => Err(invalid_query("$regex operator called with non regular expression")),
    }
}

fn invalid_query(message: &str) -> TideError {
    log::error!("{}", message);
    TideError::new(message, ErrorKind::InvalidQuery)
}
