//! Process-wide field mapper registry.
//!
//! Every entity type is resolved at most once. The resulting [`FieldMap`] is shared
//! behind an [`Arc`] and never changes afterwards; later explicit registrations for
//! a resolved type are refused.

use parking_lot::RwLock;

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use crate::{error::RegistryError, field::FieldMapperEntry, traits::*};

/// Resolved mapping of one entity type, in declaration order.
#[derive(Debug, Clone)]
pub struct FieldMap {
    entity: &'static str,
    entries: Vec<(String, FieldMapperEntry)>,
    index: HashMap<String, usize>,
    sources: HashMap<String, usize>,
}

impl FieldMap {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            entries: Vec::new(),
            index: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    /// Builds a standalone map from explicit entries.
    pub fn from_entries<P: Into<String>>(
        entity: &'static str,
        entries: impl IntoIterator<Item = (P, FieldMapperEntry)>,
    ) -> Self {
        let mut map = Self::new(entity);
        for (property, entry) in entries {
            map.upsert(property.into(), entry);
        }
        map.reindex_sources();
        map
    }

    fn child_of(parent: &FieldMap, entity: &'static str) -> Self {
        Self {
            entity,
            ..parent.clone()
        }
    }

    // An override keeps the position of the declaration it replaces.
    fn upsert(&mut self, property: String, entry: FieldMapperEntry) {
        if let Some(&idx) = self.index.get(&property) {
            self.entries[idx].1 = entry;
        } else {
            self.index.insert(property.clone(), self.entries.len());
            self.entries.push((property, entry));
        }
    }

    fn reindex_sources(&mut self) {
        self.sources.clear();
        for (idx, (property, entry)) in self.entries.iter().enumerate() {
            if let Some(source) = entry.source_name()
                && let Some(previous) = self.sources.insert(source.to_string(), idx)
            {
                tracing::warn!(
                    entity = self.entity,
                    source,
                    property = property.as_str(),
                    shadowed = self.entries[previous].0.as_str(),
                    "source name declared twice, last declaration wins"
                );
            }
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn get(&self, property: &str) -> Option<&FieldMapperEntry> {
        self.index.get(property).map(|&idx| &self.entries[idx].1)
    }

    /// Finds the entry for an inbound name, matching the property name first and
    /// then any declared source name. Returns the canonical property name.
    pub fn lookup(&self, inbound: &str) -> Option<(&str, &FieldMapperEntry)> {
        self.index
            .get(inbound)
            .or_else(|| self.sources.get(inbound))
            .map(|&idx| {
                let (property, entry) = &self.entries[idx];
                (property.as_str(), entry)
            })
    }

    pub fn contains(&self, property: &str) -> bool {
        self.index.contains_key(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldMapperEntry)> {
        self.entries.iter().map(|(p, e)| (p.as_str(), e))
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    /// Derived fields with their raw expressions.
    pub fn derived(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(p, e)| e.mode().expression().map(|expr| (p.as_str(), expr)))
    }

    pub fn required(&self) -> impl Iterator<Item = (&str, &FieldMapperEntry)> {
        self.iter().filter(|(_, e)| e.is_required())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
pub struct FieldMapperRegistry {
    registered: RwLock<HashMap<TypeId, Vec<(String, FieldMapperEntry)>>>,
    resolved: RwLock<HashMap<TypeId, Arc<FieldMap>>>,
}

static GLOBAL: OnceLock<FieldMapperRegistry> = OnceLock::new();

impl FieldMapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static FieldMapperRegistry {
        GLOBAL.get_or_init(FieldMapperRegistry::new)
    }

    /// Adds a field to `entity` in addition to its declared fields.
    ///
    /// Registering an identical entry twice is a no-op. A different entry for a
    /// property that is already mapped is rejected, as is any new property once
    /// the type has been resolved.
    pub fn register(
        &self,
        entity: EntityType,
        property: impl Into<String>,
        entry: FieldMapperEntry,
    ) -> Result<(), RegistryError> {
        let property = property.into();

        if let Some((_, existing)) = entity
            .declared_fields()
            .into_iter()
            .find(|(p, _)| *p == property)
        {
            return check_same(entity, property, &existing, &entry);
        }

        let mut registered = self.registered.write();
        let for_type = registered.entry(entity.id()).or_default();
        if let Some((_, existing)) = for_type.iter().find(|(p, _)| *p == property) {
            return check_same(entity, property, existing, &entry);
        }
        if self.resolved.read().contains_key(&entity.id()) {
            return Err(RegistryError::AlreadyResolved {
                entity: entity.name(),
                property,
            });
        }

        tracing::trace!(
            entity = entity.name(),
            property = property.as_str(),
            "field registered"
        );
        for_type.push((property, entry));
        Ok(())
    }

    pub fn register_for<T: FieldMapped>(
        &self,
        property: impl Into<String>,
        entry: FieldMapperEntry,
    ) -> Result<(), RegistryError> {
        self.register(EntityType::of::<T>(), property, entry)
    }

    /// Returns the cached map for `entity`, building it on first use.
    #[cfg_attr(feature = "instrument", tracing::instrument(name = "crud_gen.registry.resolve", skip_all, fields(entity = entity.name())))]
    pub fn resolve(&self, entity: EntityType) -> Arc<FieldMap> {
        self.resolve_inner(entity, &mut Vec::new())
    }

    pub fn resolve_type<T: FieldMapped>(&self) -> Arc<FieldMap> {
        self.resolve(EntityType::of::<T>())
    }

    pub fn is_resolved(&self, entity: EntityType) -> bool {
        self.resolved.read().contains_key(&entity.id())
    }

    fn resolve_inner(&self, entity: EntityType, visiting: &mut Vec<TypeId>) -> Arc<FieldMap> {
        if let Some(map) = self.resolved.read().get(&entity.id()) {
            return Arc::clone(map);
        }

        visiting.push(entity.id());
        let parent = match entity.parent() {
            Some(parent) if visiting.contains(&parent.id()) => {
                tracing::warn!(
                    entity = entity.name(),
                    parent = parent.name(),
                    "cycle in entity inheritance, ignoring parent"
                );
                None
            }
            Some(parent) => Some(self.resolve_inner(parent, visiting)),
            None => None,
        };
        visiting.pop();

        let registered = self.registered.read();
        let mut resolved = self.resolved.write();
        if let Some(map) = resolved.get(&entity.id()) {
            return Arc::clone(map);
        }

        let mut map = match parent {
            Some(parent) => FieldMap::child_of(&parent, entity.name()),
            None => FieldMap::new(entity.name()),
        };
        for (property, entry) in entity.declared_fields() {
            map.upsert(property.to_string(), entry);
        }
        if let Some(extra) = registered.get(&entity.id()) {
            for (property, entry) in extra {
                map.upsert(property.clone(), entry.clone());
            }
        }
        map.reindex_sources();

        tracing::debug!(
            entity = entity.name(),
            fields = map.len(),
            derived = map.derived().count(),
            "field map resolved"
        );

        let map = Arc::new(map);
        resolved.insert(entity.id(), Arc::clone(&map));
        map
    }
}

fn check_same(
    entity: EntityType,
    property: String,
    existing: &FieldMapperEntry,
    attempted: &FieldMapperEntry,
) -> Result<(), RegistryError> {
    if existing == attempted {
        Ok(())
    } else {
        Err(RegistryError::ConflictingRegistration {
            entity: entity.name(),
            property,
            existing: existing.describe_destination(),
            attempted: attempted.describe_destination(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base;
    impl FieldMapped for Base {
        const ENTITY_NAME: &'static str = "Base";

        fn declared_fields() -> Vec<(&'static str, FieldMapperEntry)> {
            vec![
                ("id", FieldMapperEntry::new("id").required()),
                ("createdAt", FieldMapperEntry::new("created_at")),
            ]
        }
    }

    struct Account;
    impl FieldMapped for Account {
        const ENTITY_NAME: &'static str = "Account";

        fn declared_fields() -> Vec<(&'static str, FieldMapperEntry)> {
            vec![
                ("createdAt", FieldMapperEntry::new("account_created_at")),
                (
                    "owner",
                    FieldMapperEntry::new("owner_id").with_source_name("ownerId"),
                ),
            ]
        }

        fn parent() -> Option<EntityType> {
            Some(EntityType::of::<Base>())
        }
    }

    struct Ping;
    impl FieldMapped for Ping {
        const ENTITY_NAME: &'static str = "Ping";

        fn declared_fields() -> Vec<(&'static str, FieldMapperEntry)> {
            vec![("a", FieldMapperEntry::new("a"))]
        }

        fn parent() -> Option<EntityType> {
            Some(EntityType::of::<Pong>())
        }
    }

    struct Pong;
    impl FieldMapped for Pong {
        const ENTITY_NAME: &'static str = "Pong";

        fn declared_fields() -> Vec<(&'static str, FieldMapperEntry)> {
            vec![("b", FieldMapperEntry::new("b"))]
        }

        fn parent() -> Option<EntityType> {
            Some(EntityType::of::<Ping>())
        }
    }

    #[test]
    fn subtype_overrides_in_place() {
        let registry = FieldMapperRegistry::new();
        let map = registry.resolve_type::<Account>();

        assert_eq!(map.entity(), "Account");
        assert_eq!(
            map.properties().collect::<Vec<_>>(),
            vec!["id", "createdAt", "owner"]
        );
        assert_eq!(
            map.get("createdAt").unwrap().destination().as_plain(),
            Some("account_created_at")
        );
        assert!(map.get("id").unwrap().is_required());
        assert!(registry.is_resolved(EntityType::of::<Base>()));
    }

    #[test]
    fn lookup_matches_source_names() {
        let registry = FieldMapperRegistry::new();
        let map = registry.resolve_type::<Account>();

        let (property, entry) = map.lookup("ownerId").unwrap();
        assert_eq!(property, "owner");
        assert_eq!(entry.destination().as_plain(), Some("owner_id"));
        assert!(map.lookup("owner").is_some());
        assert!(map.lookup("unknown").is_none());
    }

    #[test]
    fn inheritance_cycle_is_cut() {
        let registry = FieldMapperRegistry::new();
        let map = registry.resolve_type::<Ping>();
        assert_eq!(map.properties().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn declared_fields_conflict_with_registration() {
        let registry = FieldMapperRegistry::new();
        assert!(
            registry
                .register_for::<Base>("id", FieldMapperEntry::new("id").required())
                .is_ok()
        );
        let err = registry
            .register_for::<Base>("id", FieldMapperEntry::new("base_id"))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::ConflictingRegistration { ref property, .. } if property == "id"
        ));
    }
}
