#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use crud_gen::*;

#[derive(FieldMapper, Debug, Clone, Default, Serialize, Deserialize)]
#[field_mapper(extends = "crate::entities::person::Person", rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    #[field_mapper(skip)]
    pub id: i64,
    #[field_mapper(skip)]
    pub full_name: Option<String>,
    #[field_mapper(destination = "reports")]
    pub reports: u32,
}
