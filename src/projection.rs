//! Projection of derived field values from raw query rows onto hydrated entities.
//!
//! The caller adds [`Projection::derived_selects`] to its query, hydrates entities as
//! usual and then hands both the entities and the raw rows back to [`Projection::project`].
//! Entities and raw rows are paired by index.

use std::sync::Arc;

use crate::{error::ProjectionError, field::Record, registry::FieldMap, traits::AssignDerived};

/// One raw result row keyed by column alias.
pub type RawRow = Record;

/// Turns a `"<prefix>.<property>"` alias into what the storage dialect returns as
/// column name.
pub trait AliasEscape {
    fn escape(&self, alias: &str) -> String;
}

impl<F> AliasEscape for F
where
    F: Fn(&str) -> String,
{
    fn escape(&self, alias: &str) -> String {
        self(alias)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoEscape;

impl AliasEscape for NoEscape {
    fn escape(&self, alias: &str) -> String {
        alias.to_string()
    }
}

/// Double-quoted identifiers, as used by Postgres and SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotedIdentifiers;

impl AliasEscape for QuotedIdentifiers {
    fn escape(&self, alias: &str) -> String {
        format!("\"{}\"", alias.replace('"', "\"\""))
    }
}

pub struct Projection<E = NoEscape> {
    map: Arc<FieldMap>,
    table_prefix: String,
    escape: E,
}

impl<E: AliasEscape> Projection<E> {
    pub fn new(map: Arc<FieldMap>, table_prefix: impl Into<String>, escape: E) -> Self {
        Self {
            map,
            table_prefix: table_prefix.into(),
            escape,
        }
    }

    pub fn map(&self) -> &FieldMap {
        &self.map
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    pub fn column_alias(&self, property: &str) -> String {
        self.escape
            .escape(&format!("{}.{}", self.table_prefix, property))
    }

    /// `(expression, alias)` pairs for every derived field.
    pub fn derived_selects(&self) -> Vec<(String, String)> {
        self.map
            .derived()
            .map(|(property, expression)| (expression.to_string(), self.column_alias(property)))
            .collect()
    }

    /// Copies derived values from `raw_rows` onto `entities`, overwriting whatever
    /// default hydration put there.
    #[cfg_attr(feature = "instrument", tracing::instrument(name = "crud_gen.projection.project", skip_all, fields(entity = self.map.entity(), count = entities.len())))]
    pub fn project<T: AssignDerived>(
        &self,
        mut entities: Vec<T>,
        raw_rows: &[RawRow],
    ) -> Result<Vec<T>, ProjectionError> {
        if entities.is_empty() {
            return Ok(entities);
        }
        let aliases: Vec<_> = self
            .map
            .derived()
            .map(|(property, _)| (property, self.column_alias(property)))
            .collect();
        if aliases.is_empty() {
            return Ok(entities);
        }

        for (index, entity) in entities.iter_mut().enumerate() {
            let row = raw_rows
                .get(index)
                .ok_or(ProjectionError::MissingRawRow { index })?;
            for (property, alias) in aliases.iter() {
                let value = row
                    .get(alias)
                    .ok_or_else(|| ProjectionError::MissingColumn {
                        index,
                        alias: alias.clone(),
                    })?;
                entity.assign_derived(property, value.clone())?;
            }
        }
        tracing::trace!(
            entity = self.map.entity(),
            rows = entities.len(),
            derived = aliases.len(),
            "derived fields projected"
        );
        Ok(entities)
    }

    /// Single-entity variant of [`Self::project`]. Zero matched rows yield `None`.
    pub fn project_one<T: AssignDerived>(
        &self,
        entity: Option<T>,
        raw_rows: &[RawRow],
    ) -> Result<Option<T>, ProjectionError> {
        match entity {
            Some(entity) => Ok(self.project(vec![entity], raw_rows)?.pop()),
            None => Ok(None),
        }
    }
}

/// Runs a list or lookup query and returns both the raw rows and the hydrated
/// entities, in the same order.
pub trait QueryExecutor {
    type Entity: AssignDerived;
    type Err: From<ProjectionError>;

    /// `derived_selects` holds `(expression, alias)` pairs that must be added to the
    /// select list.
    fn fetch_raw_and_entities(
        &mut self,
        derived_selects: &[(String, String)],
    ) -> Result<(Vec<RawRow>, Vec<Self::Entity>), Self::Err>;
}

/// Wraps a [`QueryExecutor`] so every fetch comes back with derived fields filled in.
pub struct ProjectingExecutor<Q, E = NoEscape> {
    inner: Q,
    projection: Projection<E>,
}

impl<Q, E> ProjectingExecutor<Q, E>
where
    Q: QueryExecutor,
    E: AliasEscape,
{
    pub fn new(inner: Q, projection: Projection<E>) -> Self {
        Self { inner, projection }
    }

    pub fn projection(&self) -> &Projection<E> {
        &self.projection
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }

    pub fn get_many(&mut self) -> Result<Vec<Q::Entity>, Q::Err> {
        let selects = self.projection.derived_selects();
        let (raw_rows, entities) = self.inner.fetch_raw_and_entities(&selects)?;
        Ok(self.projection.project(entities, &raw_rows)?)
    }

    pub fn get_one(&mut self) -> Result<Option<Q::Entity>, Q::Err> {
        let selects = self.projection.derived_selects();
        let (raw_rows, entities) = self.inner.fetch_raw_and_entities(&selects)?;
        Ok(self
            .projection
            .project_one(entities.into_iter().next(), &raw_rows)?)
    }
}
