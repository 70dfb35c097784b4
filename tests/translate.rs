mod entities;

use entities::{employee::*, person::*};
use crud_gen::*;
use serde_json::{Value, json};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

#[test]
fn keys_translate_to_destinations() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let map = registry.resolve_type::<Person>();

    let translated = translate_keys(&map, &record(json!({ "firstName": "Jane" })))?;
    assert_eq!(Value::Object(translated), json!({ "first_name": "Jane" }));

    let translated = translate_keys(&map, &record(json!({ "team": 3, "surname": "Doe" })))?;
    assert_eq!(
        Value::Object(translated),
        json!({ "team_id": 3, "last_name": "Doe" })
    );
    Ok(())
}

#[test]
fn derived_field_cannot_be_used_as_argument() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let map = registry.resolve_type::<Person>();

    let err = translate_keys(&map, &record(json!({ "fullName": "Jane Doe" }))).unwrap_err();
    assert_eq!(err.entity, "Person");
    assert_eq!(err.property, "fullName");
    assert_eq!(err.destination, "full_name = CONCAT(first_name, ' ', last_name)");
    Ok(())
}

#[test]
fn built_params_translate_to_storage_query() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let factory = registry.list_params(None, Some(EntityType::of::<Employee>()));
    let params = factory.build(ListRequest {
        start_row: Some(0),
        end_row: Some(10),
        filters: Some(json!({
            "lastName": { "filterType": "text", "type": "contains", "filter": "oe" },
            "team": { "filterType": "number", "type": "equals", "filter": 7 }
        })),
        sorting: Some(vec![SortModel::new("employeeNumber", SortDirection::Asc)]),
    })?;

    let map = registry.resolve_type::<Employee>();
    let query = translate_list_params(&map, &params)?;

    assert_eq!((query.offset, query.limit), (Some(0), Some(10)));
    assert_eq!(
        query.filters.find_conditions,
        Some(Predicate::Compare {
            field: "family_name".to_string(),
            condition: ConditionType::Contains,
            operand: Operand::Single(FilterValue::Text("oe".to_string())),
        })
    );
    assert_eq!(query.filters.symbolic.len(), 1);
    assert_eq!(query.filters.symbolic[0].0, "team");
    assert_eq!(
        query.order_by,
        vec![OrderBy {
            field: "employee_number".to_string(),
            direction: SortDirection::Asc
        }]
    );
    Ok(())
}

#[test]
fn filtering_a_derived_field_fails_translation() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let map = registry.resolve_type::<Person>();
    let tree = FilterTree::parse(&json!({
        "fullName": { "filterType": "text", "type": "equals", "filter": "Jane Doe" }
    }))?;

    let err = translate_filters(&map, &tree).unwrap_err();
    assert!(matches!(err, RequestError::ArgumentMapping(_)));
    assert!(err.is_client_error());
    Ok(())
}

#[test]
fn select_includes_required_fields() -> anyhow::Result<()> {
    let registry = FieldMapperRegistry::new();
    let map = registry.resolve_type::<Employee>();
    assert_eq!(
        select_fields(&map, &["lastName", "fullName"]),
        vec!["family_name", "id", "employee_number"]
    );
    Ok(())
}
