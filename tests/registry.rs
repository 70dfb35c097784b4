mod entities;

use std::sync::Arc;

use entities::{employee::*, person::*};
use crud_gen::*;
use serde_json::json;

#[test]
fn resolve_is_cached() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let first = registry.resolve_type::<Person>();
    let second = registry.resolve_type::<Person>();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.entity(), "Person");
    assert_eq!(
        first.properties().collect::<Vec<_>>(),
        vec!["id", "firstName", "lastName", "fullName", "team", "colId", "badge"]
    );
    Ok(())
}

#[test]
fn identical_registration_is_a_no_op() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    registry.register_for::<Person>("nickname", FieldMapperEntry::new("nick_name"))?;
    registry.register_for::<Person>("nickname", FieldMapperEntry::new("nick_name"))?;
    registry.register_for::<Person>("id", FieldMapperEntry::new("id").required())?;

    let map = registry.resolve_type::<Person>();
    assert_eq!(map.len(), 8);
    assert_eq!(
        map.get("nickname").and_then(|e| e.destination().as_plain()),
        Some("nick_name")
    );
    Ok(())
}

#[test]
fn conflicting_registration_is_rejected() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    registry.register_for::<Person>("nickname", FieldMapperEntry::new("nick_name"))?;

    let err = registry
        .register_for::<Person>("nickname", FieldMapperEntry::new("alias"))
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::ConflictingRegistration {
            entity: "Person",
            property: "nickname".to_string(),
            existing: "nick_name".to_string(),
            attempted: "alias".to_string(),
        }
    );

    let err = registry
        .register_for::<Person>("firstName", FieldMapperEntry::new("given_name"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::ConflictingRegistration { .. }));
    Ok(())
}

#[test]
fn registration_after_resolve_is_rejected() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let _ = registry.resolve_type::<Person>();

    let err = registry
        .register_for::<Person>("nickname", FieldMapperEntry::new("nick_name"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyResolved { entity: "Person", .. }));

    // re-declaring an existing field identically stays allowed
    registry.register_for::<Person>("firstName", FieldMapperEntry::new("first_name"))?;
    Ok(())
}

#[test]
fn subtype_extends_parent_mapping() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let map = registry.resolve_type::<Employee>();

    assert_eq!(map.entity(), "Employee");
    assert_eq!(
        map.properties().collect::<Vec<_>>(),
        vec![
            "id",
            "firstName",
            "lastName",
            "fullName",
            "team",
            "colId",
            "badge",
            "employeeNumber"
        ]
    );
    assert_eq!(
        map.get("lastName").and_then(|e| e.destination().as_plain()),
        Some("family_name")
    );
    assert!(map.lookup("surname").is_none());
    assert_eq!(
        map.derived().collect::<Vec<_>>(),
        vec![("fullName", "CONCAT(last_name, ', ', first_name)")]
    );
    assert_eq!(
        map.required().map(|(p, _)| p).collect::<Vec<_>>(),
        vec!["id", "employeeNumber"]
    );

    let parent = registry.resolve_type::<Person>();
    assert_eq!(
        parent.get("lastName").and_then(|e| e.destination().as_plain()),
        Some("last_name")
    );
    Ok(())
}

#[test]
fn entries_can_be_registered_from_json() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let raw = json!({ "destinationName": "hired_on", "sourceName": "hiredOn", "isRequired": true });
    assert!(is_field_mapper_entry(&raw));

    registry.register_for::<Employee>("hireDate", FieldMapperEntry::try_from(&raw)?)?;
    let map = registry.resolve_type::<Employee>();
    let (property, entry) = map.lookup("hiredOn").expect("registered by source name");
    assert_eq!(property, "hireDate");
    assert!(entry.is_required());
    Ok(())
}

#[test]
fn global_registry_is_shared() -> anyhow::Result<()> {
    let a = FieldMapperRegistry::global().resolve(EntityType::of::<Person>());
    let b = FieldMapperRegistry::global().resolve_type::<Person>();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(FieldMapperRegistry::global().is_resolved(EntityType::of::<Person>()));
    Ok(())
}
