#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crud_gen::*;

pub fn display_name(accumulated: &Record, value: Value) -> Value {
    let name = value.as_str().unwrap_or_default();
    match accumulated.get("title").and_then(Value::as_str) {
        Some(title) if !title.is_empty() => json!(format!("{title} {name}")),
        _ => json!(name),
    }
}

#[derive(FieldMapper, Debug, Clone, Serialize, Deserialize)]
#[field_mapper(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[field_mapper(destination = "title")]
    pub salutation: String,
    #[field_mapper(destination = "displayName", transform = "display_name")]
    pub name: String,
    #[field_mapper(destination = "email")]
    pub email_address: String,
    #[field_mapper(skip)]
    pub internal_notes: String,
}

#[derive(FieldMapper, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[field_mapper(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct ContactCard {
    pub title: String,
    pub display_name: String,
    pub email: String,
}

impl Contact {
    pub fn doctor() -> Self {
        Self {
            salutation: "Dr".to_string(),
            name: "Jane Doe".to_string(),
            email_address: "jane@example.com".to_string(),
            internal_notes: "prefers email".to_string(),
        }
    }
}
