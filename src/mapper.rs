//! Maps records from one object model into another using field mapper metadata.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use std::sync::Arc;

use crate::{
    error::{DestinationMappingError, MappingError},
    field::{Destination, Record},
    registry::{FieldMap, FieldMapperRegistry},
    traits::FieldMapped,
};

/// Input to [`map_fields`]. Only `Registered` input is renamed.
#[derive(Debug, Clone)]
pub enum MapInput {
    Registered { map: Arc<FieldMap>, record: Record },
    Plain(Record),
}

impl MapInput {
    /// Serializes `entity` and pairs it with the resolved map of `T`.
    pub fn from_entity<T>(registry: &FieldMapperRegistry, entity: &T) -> Result<Self, MappingError>
    where
        T: FieldMapped + Serialize,
    {
        match serde_json::to_value(entity)? {
            Value::Object(record) => Ok(MapInput::Registered {
                map: registry.resolve_type::<T>(),
                record,
            }),
            _ => Err(MappingError::NotAnObject(T::ENTITY_NAME)),
        }
    }

    pub fn record(&self) -> &Record {
        match self {
            MapInput::Registered { record, .. } => record,
            MapInput::Plain(record) => record,
        }
    }
}

/// The key set an output object declares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputShape {
    keys: Vec<String>,
}

impl OutputShape {
    pub fn from_keys<K: Into<String>>(keys: impl IntoIterator<Item = K>) -> Self {
        let mut shape = Self::default();
        for key in keys {
            let key = key.into();
            if !shape.contains(&key) {
                shape.keys.push(key);
            }
        }
        shape
    }

    /// The shape of a mapped type: its exposed property names.
    pub fn of(map: &FieldMap) -> Self {
        Self::from_keys(map.properties())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn matches(&self, record: &Record) -> bool {
        record.len() == self.keys.len() && record.keys().all(|k| self.contains(k))
    }
}

/// Maps `input` onto `shape`.
///
/// Plain input is returned unchanged when its key set equals the shape and `None`
/// otherwise. Registered input is walked in declaration order so transforms see
/// every destination written before them. Keys without a mapping survive only if
/// the shape declares them.
#[cfg_attr(feature = "instrument", tracing::instrument(name = "crud_gen.mapper.map_fields", skip_all))]
pub fn map_fields(
    input: MapInput,
    shape: &OutputShape,
) -> Result<Option<Record>, DestinationMappingError> {
    let (map, mut record) = match input {
        MapInput::Plain(record) => {
            return Ok(shape.matches(&record).then_some(record));
        }
        MapInput::Registered { map, record } => (map, record),
    };

    let mut output = Record::new();
    for (property, entry) in map.iter() {
        let value = match record.shift_remove(property) {
            Some(value) => value,
            None => match entry.source_name().and_then(|s| record.shift_remove(s)) {
                Some(value) => value,
                None => continue,
            },
        };
        let destination = entry.destination();
        if !shape.contains(destination.name()) {
            return Err(DestinationMappingError {
                entity: map.entity(),
                property: property.to_string(),
                destination: destination.name().to_string(),
            });
        }
        let value = match destination {
            Destination::Extended {
                transform: Some(transform),
                ..
            } => transform.apply(&output, value),
            _ => value,
        };
        output.insert(destination.name().to_string(), value);
    }

    for (key, value) in record {
        if shape.contains(&key) {
            output.entry(key).or_insert(value);
        } else {
            tracing::trace!(
                entity = map.entity(),
                key = key.as_str(),
                "dropping key the output does not declare"
            );
        }
    }
    Ok(Some(output))
}

/// Maps a registered entity onto the mapped type `O`.
pub fn map_entity_into<T, O>(
    registry: &FieldMapperRegistry,
    entity: &T,
) -> Result<Option<O>, MappingError>
where
    T: FieldMapped + Serialize,
    O: FieldMapped + DeserializeOwned,
{
    let input = MapInput::from_entity(registry, entity)?;
    let shape = OutputShape::of(&registry.resolve_type::<O>());
    match map_fields(input, &shape)? {
        Some(record) => Ok(Some(serde_json::from_value(Value::Object(record))?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldMapperEntry, Transform};
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn label(accumulated: &Record, value: Value) -> Value {
        let code = accumulated
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("?");
        json!(format!("{code}-{}", value.as_str().unwrap_or_default()))
    }

    fn labelled(order: &[&'static str]) -> Arc<FieldMap> {
        let entries = order.iter().map(|p| match *p {
            "code" => ("code", FieldMapperEntry::new("code")),
            _ => (
                "name",
                FieldMapperEntry::new(Destination::extended(
                    "label",
                    Some(Transform::new("label", label)),
                )),
            ),
        });
        Arc::new(FieldMap::from_entries("Product", entries))
    }

    #[test]
    fn plain_input_needs_equal_key_set() {
        let shape = OutputShape::from_keys(["a", "b"]);
        let same = record(json!({ "b": 2, "a": 1 }));
        assert_eq!(
            map_fields(MapInput::Plain(same.clone()), &shape).unwrap(),
            Some(same)
        );

        let different = record(json!({ "a": 1, "c": 3 }));
        assert_eq!(map_fields(MapInput::Plain(different), &shape).unwrap(), None);
    }

    #[test]
    fn transforms_see_earlier_destinations() {
        let shape = OutputShape::from_keys(["code", "label"]);
        let input = record(json!({ "name": "widget", "code": "W1" }));

        let mapped = map_fields(
            MapInput::Registered {
                map: labelled(&["code", "name"]),
                record: input.clone(),
            },
            &shape,
        )
        .unwrap()
        .unwrap();
        assert_eq!(mapped["label"], json!("W1-widget"));

        let mapped = map_fields(
            MapInput::Registered {
                map: labelled(&["name", "code"]),
                record: input,
            },
            &shape,
        )
        .unwrap()
        .unwrap();
        assert_eq!(mapped["label"], json!("?-widget"));
    }

    #[test]
    fn unmapped_keys_follow_the_shape() {
        let map = Arc::new(FieldMap::from_entries(
            "Person",
            [("firstName", FieldMapperEntry::new("name"))],
        ));
        let shape = OutputShape::from_keys(["name", "age"]);
        let mapped = map_fields(
            MapInput::Registered {
                map,
                record: record(json!({ "firstName": "Jane", "age": 30, "secret": "x" })),
            },
            &shape,
        )
        .unwrap()
        .unwrap();
        assert_eq!(Value::Object(mapped), json!({ "name": "Jane", "age": 30 }));
    }

    #[test]
    fn undeclared_destination_is_fatal() {
        let map = Arc::new(FieldMap::from_entries(
            "Person",
            [("firstName", FieldMapperEntry::new("first_name"))],
        ));
        let err = map_fields(
            MapInput::Registered {
                map,
                record: record(json!({ "firstName": "Jane" })),
            },
            &OutputShape::from_keys(["name"]),
        )
        .unwrap_err();
        assert_eq!(err.destination, "first_name");
        assert_eq!(err.property, "firstName");
    }
}
