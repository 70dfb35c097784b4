#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crud_gen::*;

#[derive(FieldMapper, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[field_mapper(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[field_mapper(required)]
    pub id: i64,
    pub first_name: String,
    #[field_mapper(source = "surname")]
    pub last_name: String,
    #[field_mapper(derived = "CONCAT(first_name, ' ', last_name)")]
    pub full_name: Option<String>,
    #[field_mapper(destination = "team_id", symbolic)]
    pub team: Option<i64>,
    #[field_mapper(destination = "column_id", deny_filter)]
    pub col_id: Option<String>,
    #[field_mapper(virtual_only)]
    pub badge: Option<String>,
}

impl Person {
    pub fn jane() -> Self {
        Self {
            id: 1,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            ..Default::default()
        }
    }
}
