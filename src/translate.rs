//! Translation of exposed argument names into storage names.

use crate::{
    error::{ArgumentMappingError, FilterError, RequestError},
    field::{FieldMapperEntry, Record},
    filter::{ColumnFilter, ConditionType, FilterCondition, FilterTree, LogicalOperator, Operand},
    list_params::{ListParams, QueryListParams, SortDirection, SortModel},
    registry::FieldMap,
};

/// Storage-facing predicate over destination names.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare {
        field: String,
        condition: ConditionType,
        operand: Operand,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslatedFilters {
    /// Conditions for the storage query. Symbolic fields never appear here.
    pub find_conditions: Option<Predicate>,
    /// Filters on symbolic fields, keyed by exposed property name.
    pub symbolic: Vec<(String, ColumnFilter)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Everything the external executor needs to run a list query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StorageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub filters: TranslatedFilters,
    pub order_by: Vec<OrderBy>,
}

/// Renames every known key of `input` to its storage name.
///
/// Unknown keys pass through unchanged. A key whose destination is extended has no
/// single storage name and fails the whole translation.
pub fn translate_keys(map: &FieldMap, input: &Record) -> Result<Record, ArgumentMappingError> {
    let mut output = Record::new();
    for (key, value) in input {
        let name = match map.lookup(key) {
            Some((property, entry)) => plain_destination(map, property, entry)?,
            None => {
                tracing::trace!(
                    entity = map.entity(),
                    key = key.as_str(),
                    "passing unmapped key through"
                );
                key.as_str()
            }
        };
        output.insert(name.to_string(), value.clone());
    }
    Ok(output)
}

pub fn translate_filters(
    map: &FieldMap,
    tree: &FilterTree,
) -> Result<TranslatedFilters, RequestError> {
    tree.validate(map)?;

    let mut predicates = Vec::new();
    let mut symbolic = Vec::new();
    for (column, filter) in tree.columns() {
        let Some((property, entry)) = map.lookup(column) else {
            return Err(FilterError::InvalidProperty {
                entity: map.entity(),
                column: column.to_string(),
            }
            .into());
        };
        let field = plain_destination(map, property, entry)?;
        if entry.is_symbolic() {
            symbolic.push((property.to_string(), filter.clone()));
            continue;
        }
        predicates.push(match filter {
            ColumnFilter::Single(condition) => compare(field, condition),
            ColumnFilter::Combined {
                operator,
                conditions,
            } => {
                let parts = conditions.iter().map(|c| compare(field, c)).collect();
                match operator {
                    LogicalOperator::And => Predicate::And(parts),
                    LogicalOperator::Or => Predicate::Or(parts),
                }
            }
        });
    }

    let find_conditions = match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(Predicate::And(predicates)),
    };
    Ok(TranslatedFilters {
        find_conditions,
        symbolic,
    })
}

pub fn translate_sorting(
    map: &FieldMap,
    sorting: &[SortModel],
) -> Result<Vec<OrderBy>, RequestError> {
    sorting
        .iter()
        .map(|sort| {
            let Some((property, entry)) = map.lookup(&sort.col_id) else {
                return Err(FilterError::InvalidProperty {
                    entity: map.entity(),
                    column: sort.col_id.clone(),
                }
                .into());
            };
            if entry.mode().is_virtual() {
                return Err(FilterError::NotPossible {
                    column: sort.col_id.clone(),
                    reason: "virtual fields cannot be sorted on",
                }
                .into());
            }
            Ok(OrderBy {
                field: plain_destination(map, property, entry)?.to_string(),
                direction: sort.sort,
            })
        })
        .collect()
}

pub fn translate_list_params(
    map: &FieldMap,
    params: &QueryListParams,
) -> Result<StorageQuery, RequestError> {
    Ok(StorageQuery {
        offset: Some(params.offset()),
        limit: Some(params.limit()),
        ..translate_unbounded(map, params.filters.as_ref(), params.sorting.as_deref())?
    })
}

pub fn translate_unpaginated_params(
    map: &FieldMap,
    params: &ListParams,
) -> Result<StorageQuery, RequestError> {
    translate_unbounded(map, params.filters.as_ref(), params.sorting.as_deref())
}

/// Storage names to select: the requested properties plus every required one.
///
/// Derived and virtual fields are never selected directly. Unknown names pass
/// through and duplicates are dropped.
pub fn select_fields(map: &FieldMap, requested: &[&str]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    let requested = requested.iter().map(|name| (*name, map.lookup(name)));
    let required = map.required().map(|(p, e)| (p, Some((p, e))));
    for (name, found) in requested.chain(required) {
        let storage = match found {
            None => name,
            Some((_, entry)) if entry.mode().is_derived() || entry.mode().is_virtual() => continue,
            Some((_, entry)) => entry.destination().name(),
        };
        if !selected.iter().any(|s| s == storage) {
            selected.push(storage.to_string());
        }
    }
    selected
}

fn translate_unbounded(
    map: &FieldMap,
    filters: Option<&FilterTree>,
    sorting: Option<&[SortModel]>,
) -> Result<StorageQuery, RequestError> {
    let filters = match filters {
        Some(tree) => translate_filters(map, tree)?,
        None => TranslatedFilters::default(),
    };
    let order_by = match sorting {
        Some(sorting) => translate_sorting(map, sorting)?,
        None => Vec::new(),
    };
    Ok(StorageQuery {
        offset: None,
        limit: None,
        filters,
        order_by,
    })
}

fn plain_destination<'a>(
    map: &FieldMap,
    property: &str,
    entry: &'a FieldMapperEntry,
) -> Result<&'a str, ArgumentMappingError> {
    entry
        .destination()
        .as_plain()
        .ok_or_else(|| ArgumentMappingError {
            entity: map.entity(),
            property: property.to_string(),
            destination: entry.describe_destination(),
        })
}

fn compare(field: &str, condition: &FilterCondition) -> Predicate {
    Predicate::Compare {
        field: field.to_string(),
        condition: condition.condition,
        operand: condition.operand.clone(),
    }
}
