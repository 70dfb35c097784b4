//! Grid-style filter model.
//!
//! Filters arrive as a JSON object keyed by exposed column name:
//!
//! ```json
//! {
//!   "age":      { "filterType": "number", "type": "inRange", "filter": 18, "filterTo": 30 },
//!   "lastName": { "filterType": "text", "operator": "OR",
//!                 "conditions": [{ "type": "startsWith", "filter": "D" }, { "type": "blank" }] }
//! }
//! ```
//!
//! [`FilterTree::parse`] turns that into typed conditions, rejecting every malformed
//! aspect with a dedicated [`FilterError`] variant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Number, Value};

use std::cmp::Ordering;

use crate::{error::FilterError, registry::FieldMap};

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Text,
    Number,
    Date,
    Set,
    Boolean,
}

impl FilterKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "text" => Some(FilterKind::Text),
            "number" => Some(FilterKind::Number),
            "date" => Some(FilterKind::Date),
            "set" => Some(FilterKind::Set),
            "boolean" => Some(FilterKind::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Text => "text",
            FilterKind::Number => "number",
            FilterKind::Date => "date",
            FilterKind::Set => "set",
            FilterKind::Boolean => "boolean",
        }
    }

    pub fn supports(&self, condition: ConditionType) -> bool {
        use ConditionType::*;
        match self {
            FilterKind::Text => matches!(
                condition,
                Equals | NotEqual | Contains | NotContains | StartsWith | EndsWith | Blank | NotBlank
            ),
            FilterKind::Number => matches!(
                condition,
                Equals
                    | NotEqual
                    | LessThan
                    | LessThanOrEqual
                    | GreaterThan
                    | GreaterThanOrEqual
                    | InRange
                    | Blank
                    | NotBlank
            ),
            FilterKind::Date => matches!(
                condition,
                Equals | NotEqual | LessThan | GreaterThan | InRange | Blank | NotBlank
            ),
            FilterKind::Set => matches!(condition, In),
            FilterKind::Boolean => matches!(condition, Equals | NotEqual | Blank | NotBlank),
        }
    }

    fn value_key(&self) -> &'static str {
        match self {
            FilterKind::Date => "dateFrom",
            FilterKind::Set => "values",
            _ => "filter",
        }
    }

    fn range_end_key(&self) -> &'static str {
        match self {
            FilterKind::Date => "dateTo",
            _ => "filterTo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    Equals,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InRange,
    Blank,
    NotBlank,
    In,
}

impl ConditionType {
    fn parse(name: &str) -> Option<Self> {
        use ConditionType::*;
        let condition = match name {
            "equals" => Equals,
            "notEqual" => NotEqual,
            "contains" => Contains,
            "notContains" => NotContains,
            "startsWith" => StartsWith,
            "endsWith" => EndsWith,
            "lessThan" => LessThan,
            "lessThanOrEqual" => LessThanOrEqual,
            "greaterThan" => GreaterThan,
            "greaterThanOrEqual" => GreaterThanOrEqual,
            "inRange" => InRange,
            "blank" => Blank,
            "notBlank" => NotBlank,
            "in" => In,
            _ => return None,
        };
        Some(condition)
    }

    pub fn as_str(&self) -> &'static str {
        use ConditionType::*;
        match self {
            Equals => "equals",
            NotEqual => "notEqual",
            Contains => "contains",
            NotContains => "notContains",
            StartsWith => "startsWith",
            EndsWith => "endsWith",
            LessThan => "lessThan",
            LessThanOrEqual => "lessThanOrEqual",
            GreaterThan => "greaterThan",
            GreaterThanOrEqual => "greaterThanOrEqual",
            InRange => "inRange",
            Blank => "blank",
            NotBlank => "notBlank",
            In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("and") {
            Some(LogicalOperator::And)
        } else if name.eq_ignore_ascii_case("or") {
            Some(LogicalOperator::Or)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(Number),
    Date(NaiveDateTime),
    Boolean(bool),
}

impl FilterValue {
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::Number(n) => Value::Number(n.clone()),
            FilterValue::Date(d) => Value::String(d.format(DATE_TIME_FORMAT).to_string()),
            FilterValue::Boolean(b) => Value::Bool(*b),
        }
    }

    fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (FilterValue::Number(a), FilterValue::Number(b)) => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (FilterValue::Date(a), FilterValue::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Single(FilterValue),
    Range(FilterValue, FilterValue),
    List(Vec<FilterValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub kind: FilterKind,
    pub condition: ConditionType,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    Single(FilterCondition),
    Combined {
        operator: LogicalOperator,
        conditions: Vec<FilterCondition>,
    },
}

/// Parsed filters, keyed by exposed column name, in request order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterTree {
    columns: Vec<(String, ColumnFilter)>,
}

impl FilterTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, filter: ColumnFilter) -> Self {
        self.columns.push((column.into(), filter));
        self
    }

    pub fn parse(value: &Value) -> Result<Self, FilterError> {
        let columns = match value {
            Value::String(_) => {
                return Err(FilterError::StringWhere {
                    column: "filters".to_string(),
                });
            }
            Value::Object(columns) => columns,
            other => {
                return Err(FilterError::InvalidArgument {
                    column: "filters".to_string(),
                    argument: "filters",
                    reason: format!("expected an object, found {}", json_type(other)),
                });
            }
        };

        let columns = columns
            .iter()
            .map(|(column, node)| Ok((column.clone(), parse_column(column, node)?)))
            .collect::<Result<Vec<_>, FilterError>>()?;
        Ok(Self { columns })
    }

    /// Checks every column against `map`.
    pub fn validate(&self, map: &FieldMap) -> Result<(), FilterError> {
        for (column, _) in &self.columns {
            let Some((_, entry)) = map.lookup(column) else {
                return Err(FilterError::InvalidProperty {
                    entity: map.entity(),
                    column: column.clone(),
                });
            };
            if entry.deny_filter() {
                return Err(FilterError::FilterProhibited {
                    column: column.clone(),
                });
            }
            if entry.mode().is_virtual() {
                return Err(FilterError::NotPossible {
                    column: column.clone(),
                    reason: "virtual fields have no storage counterpart",
                });
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnFilter)> {
        self.columns.iter().map(|(c, f)| (c.as_str(), f))
    }

    pub fn get(&self, column: &str) -> Option<&ColumnFilter> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn parse_column(column: &str, node: &Value) -> Result<ColumnFilter, FilterError> {
    let obj = as_filter_object(column, node)?;
    let kind = parse_kind(column, obj.get("filterType"))?;

    if !(obj.contains_key("operator")
        || obj.contains_key("conditions")
        || obj.contains_key("condition1"))
    {
        return Ok(ColumnFilter::Single(parse_condition(column, kind, obj)?));
    }

    let operator = match obj.get("operator") {
        None => {
            return Err(FilterError::MissingArguments {
                column: column.to_string(),
                argument: "operator",
            });
        }
        Some(Value::String(op)) => {
            LogicalOperator::parse(op).ok_or_else(|| FilterError::InvalidOperator {
                column: column.to_string(),
                operator: op.clone(),
            })?
        }
        Some(other) => {
            return Err(FilterError::InvalidOperator {
                column: column.to_string(),
                operator: other.to_string(),
            });
        }
    };

    let nodes: Vec<&Value> = match obj.get("conditions") {
        Some(Value::Array(nodes)) => nodes.iter().collect(),
        Some(other) => {
            return Err(FilterError::InvalidArgument {
                column: column.to_string(),
                argument: "conditions",
                reason: format!("expected an array, found {}", json_type(other)),
            });
        }
        None => ["condition1", "condition2"]
            .iter()
            .filter_map(|key| obj.get(*key))
            .collect(),
    };
    if nodes.is_empty() {
        return Err(FilterError::MissingArguments {
            column: column.to_string(),
            argument: "conditions",
        });
    }

    let conditions = nodes
        .into_iter()
        .map(|node| {
            let obj = as_filter_object(column, node)?;
            if let Some(declared) = obj.get("filterType") {
                let nested = parse_kind(column, Some(declared))?;
                if nested != kind {
                    return Err(FilterError::BadFilterType {
                        column: column.to_string(),
                        expected: kind.as_str().to_string(),
                        found: nested.as_str().to_string(),
                    });
                }
            }
            parse_condition(column, kind, obj)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ColumnFilter::Combined {
        operator,
        conditions,
    })
}

fn as_filter_object<'a>(
    column: &str,
    node: &'a Value,
) -> Result<&'a Map<String, Value>, FilterError> {
    match node {
        Value::Object(obj) => Ok(obj),
        Value::String(_) => Err(FilterError::StringWhere {
            column: column.to_string(),
        }),
        other => Err(FilterError::InvalidArgument {
            column: column.to_string(),
            argument: "filter",
            reason: format!("expected an object, found {}", json_type(other)),
        }),
    }
}

fn parse_kind(column: &str, value: Option<&Value>) -> Result<FilterKind, FilterError> {
    match value {
        None => Err(FilterError::MissingArguments {
            column: column.to_string(),
            argument: "filterType",
        }),
        Some(Value::String(name)) => {
            FilterKind::parse(name).ok_or_else(|| FilterError::FilterNotSupported {
                column: column.to_string(),
                filter_type: name.clone(),
            })
        }
        Some(other) => Err(FilterError::BadFilterType {
            column: column.to_string(),
            expected: "a filter type name".to_string(),
            found: json_type(other).to_string(),
        }),
    }
}

fn parse_condition(
    column: &str,
    kind: FilterKind,
    obj: &Map<String, Value>,
) -> Result<FilterCondition, FilterError> {
    let condition = match obj.get("type") {
        None if kind == FilterKind::Set => ConditionType::In,
        None => {
            return Err(FilterError::MissingArguments {
                column: column.to_string(),
                argument: "type",
            });
        }
        Some(Value::String(name)) => {
            ConditionType::parse(name).ok_or_else(|| FilterError::InvalidOperator {
                column: column.to_string(),
                operator: name.clone(),
            })?
        }
        Some(other) => {
            return Err(FilterError::InvalidOperator {
                column: column.to_string(),
                operator: other.to_string(),
            });
        }
    };

    if !kind.supports(condition) {
        return Err(FilterError::ConditionNotSupported {
            column: column.to_string(),
            kind: kind.as_str(),
            condition: condition.as_str(),
        });
    }

    let value_key = kind.value_key();
    let operand = match condition {
        ConditionType::Blank | ConditionType::NotBlank => Operand::None,
        ConditionType::In => Operand::List(parse_list(column, obj.get(value_key))?),
        ConditionType::InRange => {
            let end_key = kind.range_end_key();
            let from = parse_value(column, kind, value_key, obj.get(value_key))?;
            let to = parse_value(column, kind, end_key, obj.get(end_key))?;
            if from.compare(&to) == Some(Ordering::Greater) {
                return Err(FilterError::InvalidArgument {
                    column: column.to_string(),
                    argument: end_key,
                    reason: "range end precedes range start".to_string(),
                });
            }
            Operand::Range(from, to)
        }
        _ => Operand::Single(parse_value(column, kind, value_key, obj.get(value_key))?),
    };

    Ok(FilterCondition {
        kind,
        condition,
        operand,
    })
}

fn parse_value(
    column: &str,
    kind: FilterKind,
    argument: &'static str,
    value: Option<&Value>,
) -> Result<FilterValue, FilterError> {
    let invalid = |reason: String| FilterError::InvalidArgument {
        column: column.to_string(),
        argument,
        reason,
    };
    let value = match value {
        None | Some(Value::Null) => {
            return Err(FilterError::MissingArguments {
                column: column.to_string(),
                argument,
            });
        }
        Some(value) => value,
    };

    match (kind, value) {
        (FilterKind::Text, Value::String(s)) => Ok(FilterValue::Text(s.clone())),
        (FilterKind::Number, Value::Number(n)) => Ok(FilterValue::Number(n.clone())),
        (FilterKind::Number, Value::String(s)) => parse_number(s)
            .map(FilterValue::Number)
            .ok_or_else(|| invalid(format!("'{s}' is not a number"))),
        (FilterKind::Date, Value::String(s)) => parse_date(s)
            .map(FilterValue::Date)
            .ok_or_else(|| invalid(format!("'{s}' is not a date"))),
        (FilterKind::Boolean, Value::Bool(b)) => Ok(FilterValue::Boolean(*b)),
        (kind, other) => Err(invalid(format!(
            "expected a {} value, found {}",
            kind.as_str(),
            json_type(other)
        ))),
    }
}

fn parse_list(column: &str, value: Option<&Value>) -> Result<Vec<FilterValue>, FilterError> {
    let items = match value {
        None | Some(Value::Null) => {
            return Err(FilterError::MissingArguments {
                column: column.to_string(),
                argument: "values",
            });
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FilterError::InvalidArgument {
                column: column.to_string(),
                argument: "values",
                reason: format!("expected an array, found {}", json_type(other)),
            });
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(FilterValue::Text(s.clone())),
            Value::Number(n) => Ok(FilterValue::Number(n.clone())),
            Value::Bool(b) => Ok(FilterValue::Boolean(*b)),
            other => Err(FilterError::InvalidArgument {
                column: column.to_string(),
                argument: "values",
                reason: format!("set members must be scalars, found {}", json_type(other)),
            }),
        })
        .collect()
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
