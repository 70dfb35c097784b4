//! List request parameters.
//!
//! Two factories exist: [`PaginatedParamsFactory`] for row-window queries and
//! [`UnpaginatedParamsFactory`] for "fetch all" queries. The produced parameter
//! types have a static shape; a paginated request can never lack row bounds and an
//! unpaginated one never carries them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::sync::Arc;

use crate::{
    config::ListDefaults,
    error::FilterError,
    field::FieldMapperEntry,
    filter::FilterTree,
    registry::{FieldMap, FieldMapperRegistry},
    traits::EntityType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub enum SortDirection {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct SortModel {
    pub col_id: String,
    pub sort: SortDirection,
}

impl SortModel {
    pub fn new(col_id: impl Into<String>, sort: SortDirection) -> Self {
        Self {
            col_id: col_id.into(),
            sort,
        }
    }
}

/// Inbound arguments of a paginated list query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default)]
    pub start_row: Option<u64>,
    #[serde(default)]
    pub end_row: Option<u64>,
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default)]
    pub sorting: Option<Vec<SortModel>>,
}

/// Inbound arguments of an unpaginated list query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct UnpaginatedListRequest {
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default)]
    pub sorting: Option<Vec<SortModel>>,
}

/// Validated arguments of a paginated list query. `start_row <= end_row` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryListParams {
    pub start_row: u64,
    pub end_row: u64,
    pub filters: Option<FilterTree>,
    pub sorting: Option<Vec<SortModel>>,
}

impl QueryListParams {
    pub fn offset(&self) -> u64 {
        self.start_row
    }

    pub fn limit(&self) -> u64 {
        self.end_row.saturating_sub(self.start_row)
    }
}

/// Validated arguments of an unpaginated list query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListParams {
    pub filters: Option<FilterTree>,
    pub sorting: Option<Vec<SortModel>>,
}

#[derive(Clone)]
pub struct PaginatedParamsFactory {
    defaults: ListDefaults,
    scope: Option<Arc<FieldMap>>,
}

impl PaginatedParamsFactory {
    pub fn new(mut defaults: ListDefaults, scope: Option<Arc<FieldMap>>) -> Self {
        if defaults.start_row > defaults.end_row {
            tracing::warn!(
                start_row = defaults.start_row,
                end_row = defaults.end_row,
                "default window is inverted, using an empty page"
            );
            defaults.end_row = defaults.start_row;
        }
        Self { defaults, scope }
    }

    pub fn defaults(&self) -> &ListDefaults {
        &self.defaults
    }

    pub fn scope(&self) -> Option<&FieldMap> {
        self.scope.as_deref()
    }

    /// Parameters carrying only the defaults.
    pub fn new_params(&self) -> QueryListParams {
        QueryListParams {
            start_row: self.defaults.start_row,
            end_row: self.defaults.end_row,
            filters: None,
            sorting: None,
        }
    }

    #[cfg_attr(feature = "instrument", tracing::instrument(name = "crud_gen.list_params.build", skip_all, fields(entity = self.scope.as_ref().map(|m| m.entity()))))]
    pub fn build(&self, request: ListRequest) -> Result<QueryListParams, FilterError> {
        let start_row = request.start_row.unwrap_or(self.defaults.start_row);
        let mut end_row = request
            .end_row
            .unwrap_or_else(|| start_row.saturating_add(self.defaults.page_size()));
        if start_row > end_row {
            return Err(FilterError::InvalidArgument {
                column: "startRow".to_string(),
                argument: "startRow",
                reason: format!("startRow {start_row} is past endRow {end_row}"),
            });
        }
        if let Some(max) = self.defaults.max_page_size
            && end_row - start_row > max
        {
            tracing::debug!(start_row, end_row, max, "clamping list window");
            end_row = start_row + max;
        }

        let (filters, sorting) =
            scoped_arguments(self.scope.as_deref(), request.filters, request.sorting)?;
        Ok(QueryListParams {
            start_row,
            end_row,
            filters,
            sorting,
        })
    }

    pub fn allowed_filter_fields(&self) -> Option<Vec<&str>> {
        self.scope.as_deref().map(allowed_filter_fields)
    }

    pub fn allowed_sort_fields(&self) -> Option<Vec<&str>> {
        self.scope.as_deref().map(allowed_sort_fields)
    }
}

#[derive(Clone, Default)]
pub struct UnpaginatedParamsFactory {
    scope: Option<Arc<FieldMap>>,
}

impl UnpaginatedParamsFactory {
    pub fn new(scope: Option<Arc<FieldMap>>) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> Option<&FieldMap> {
        self.scope.as_deref()
    }

    pub fn new_params(&self) -> ListParams {
        ListParams::default()
    }

    pub fn build(&self, request: UnpaginatedListRequest) -> Result<ListParams, FilterError> {
        let (filters, sorting) =
            scoped_arguments(self.scope.as_deref(), request.filters, request.sorting)?;
        Ok(ListParams { filters, sorting })
    }

    pub fn allowed_filter_fields(&self) -> Option<Vec<&str>> {
        self.scope.as_deref().map(allowed_filter_fields)
    }

    pub fn allowed_sort_fields(&self) -> Option<Vec<&str>> {
        self.scope.as_deref().map(allowed_sort_fields)
    }
}

impl FieldMapperRegistry {
    pub fn list_params(
        &self,
        defaults: Option<ListDefaults>,
        entity: Option<EntityType>,
    ) -> PaginatedParamsFactory {
        PaginatedParamsFactory::new(
            defaults.unwrap_or_default(),
            entity.map(|e| self.resolve(e)),
        )
    }

    pub fn unpaginated_list_params(&self, entity: Option<EntityType>) -> UnpaginatedParamsFactory {
        UnpaginatedParamsFactory::new(entity.map(|e| self.resolve(e)))
    }
}

/// Paginated factory backed by the global registry.
pub fn build_list_params(
    defaults: Option<ListDefaults>,
    entity: Option<EntityType>,
) -> PaginatedParamsFactory {
    FieldMapperRegistry::global().list_params(defaults, entity)
}

/// Unpaginated factory backed by the global registry.
pub fn build_unpaginated_list_params(entity: Option<EntityType>) -> UnpaginatedParamsFactory {
    FieldMapperRegistry::global().unpaginated_list_params(entity)
}

fn allowed_filter_fields(map: &FieldMap) -> Vec<&str> {
    map.iter()
        .filter(|(_, e)| !e.deny_filter() && has_storage_name(e))
        .map(|(p, _)| p)
        .collect()
}

fn allowed_sort_fields(map: &FieldMap) -> Vec<&str> {
    map.iter()
        .filter(|(_, e)| has_storage_name(e))
        .map(|(p, _)| p)
        .collect()
}

/// Virtual fields and extended destinations (derived or transformed) cannot be
/// translated into a storage argument.
fn has_storage_name(entry: &FieldMapperEntry) -> bool {
    !entry.mode().is_virtual() && !entry.destination().is_extended()
}

fn extended_column(column: &str, entry: &FieldMapperEntry) -> Result<(), FilterError> {
    if entry.destination().is_extended() {
        return Err(FilterError::NotPossible {
            column: column.to_string(),
            reason: "the field has no single storage name",
        });
    }
    Ok(())
}

fn scoped_arguments(
    scope: Option<&FieldMap>,
    filters: Option<Value>,
    sorting: Option<Vec<SortModel>>,
) -> Result<(Option<FilterTree>, Option<Vec<SortModel>>), FilterError> {
    let filters = match filters {
        None | Some(Value::Null) => None,
        Some(value) => {
            let tree = FilterTree::parse(&value)?;
            if let Some(map) = scope {
                tree.validate(map)?;
                for (column, _) in tree.columns() {
                    if let Some((_, entry)) = map.lookup(column) {
                        extended_column(column, entry)?;
                    }
                }
            }
            Some(tree)
        }
    };

    if let (Some(map), Some(sorting)) = (scope, &sorting) {
        for sort in sorting {
            let Some((_, entry)) = map.lookup(&sort.col_id) else {
                return Err(FilterError::InvalidProperty {
                    entity: map.entity(),
                    column: sort.col_id.clone(),
                });
            };
            if entry.mode().is_virtual() {
                return Err(FilterError::NotPossible {
                    column: sort.col_id.clone(),
                    reason: "virtual fields cannot be sorted on",
                });
            }
            extended_column(&sort.col_id, entry)?;
        }
    }

    Ok((filters, sorting))
}
