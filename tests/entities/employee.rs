#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crud_gen::*;

#[derive(FieldMapper, Debug, Clone, Default, Serialize, Deserialize)]
#[field_mapper(extends = "crate::entities::person::Person", rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[field_mapper(skip)]
    pub id: i64,
    #[field_mapper(skip)]
    pub first_name: String,
    #[field_mapper(destination = "family_name")]
    pub last_name: String,
    #[field_mapper(derived = "CONCAT(last_name, ', ', first_name)")]
    pub full_name: Option<String>,
    #[field_mapper(destination = "employee_number", required)]
    pub employee_number: String,
}
