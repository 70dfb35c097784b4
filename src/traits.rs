use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use std::any::TypeId;

use crate::{
    error::ProjectionError,
    field::{FieldMapperEntry, Record},
};

/// Implemented by every type that exposes field mapper metadata.
///
/// Will be auto-implemented when [`#[derive(FieldMapper)]`](`crate::FieldMapper`) is used.
pub trait FieldMapped: 'static {
    const ENTITY_NAME: &'static str;

    /// The type's own declarations, in declaration order.
    fn declared_fields() -> Vec<(&'static str, FieldMapperEntry)>;

    /// The type whose declarations this one inherits.
    fn parent() -> Option<EntityType> {
        None
    }
}

/// Receives values for derived fields after hydration.
///
/// Generated by `#[derive(FieldMapper)]` for every field marked `derived`.
pub trait AssignDerived {
    fn assign_derived(&mut self, property: &str, value: Value) -> Result<(), ProjectionError>;
}

impl AssignDerived for Record {
    fn assign_derived(&mut self, property: &str, value: Value) -> Result<(), ProjectionError> {
        self.insert(property.to_string(), value);
        Ok(())
    }
}

/// Assigns a derived value `entity` inherits from its parent mapping.
///
/// The entity is patched through its serialized form, so `property` must be a key
/// of that form. Used by the derive for types with `extends`.
pub fn assign_inherited<T>(
    entity: &mut T,
    entity_name: &'static str,
    property: &str,
    value: Value,
) -> Result<(), ProjectionError>
where
    T: Serialize + DeserializeOwned,
{
    let unknown = || ProjectionError::UnknownDerivedField {
        entity: entity_name,
        property: property.to_string(),
    };
    let serialized =
        serde_json::to_value(&*entity).map_err(|source| ProjectionError::Serialization {
            property: property.to_string(),
            source,
        })?;
    let Value::Object(mut record) = serialized else {
        return Err(unknown());
    };
    match record.get_mut(property) {
        Some(slot) => *slot = value,
        None => return Err(unknown()),
    }
    *entity = serde_json::from_value(Value::Object(record)).map_err(|source| {
        ProjectionError::Deserialization {
            property: property.to_string(),
            source,
        }
    })?;
    Ok(())
}

/// Runtime descriptor of a [`FieldMapped`] type.
#[derive(Clone, Copy)]
pub struct EntityType {
    id: TypeId,
    name: &'static str,
    declared: fn() -> Vec<(&'static str, FieldMapperEntry)>,
    parent: fn() -> Option<EntityType>,
}

impl EntityType {
    pub fn of<T: FieldMapped>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::ENTITY_NAME,
            declared: T::declared_fields,
            parent: T::parent,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declared_fields(&self) -> Vec<(&'static str, FieldMapperEntry)> {
        (self.declared)()
    }

    pub fn parent(&self) -> Option<EntityType> {
        (self.parent)()
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl std::hash::Hash for EntityType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EntityType").field(&self.name).finish()
    }
}
