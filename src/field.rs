//! Per-field mapping metadata.

use derive_builder::Builder;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FieldMapperEntryError;

/// A loosely typed object, keyed by field name, iterating in insertion order.
pub type Record = serde_json::Map<String, Value>;

/// Signature of a destination transform: `(accumulated_output, raw_value) -> value`.
pub type TransformFn = fn(&Record, Value) -> Value;

/// A named transform attached to an extended destination.
///
/// The accumulator holds every destination field mapped before this one, so a
/// transform can compose its value from fields declared earlier.
#[derive(Clone, Copy)]
pub struct Transform {
    name: &'static str,
    func: TransformFn,
}

impl Transform {
    pub const fn new(name: &'static str, func: TransformFn) -> Self {
        Self { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, accumulated: &Record, value: Value) -> Value {
        (self.func)(accumulated, value)
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.func as usize == other.func as usize
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transform").field(&self.name).finish()
    }
}

/// Where an exposed field lands.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Direct rename to a storage / output key.
    Name(String),
    /// Extended descriptor, used by derived fields and by transforms.
    Extended {
        name: String,
        transform: Option<Transform>,
    },
}

impl Destination {
    pub fn extended(name: impl Into<String>, transform: Option<Transform>) -> Self {
        Destination::Extended {
            name: name.into(),
            transform,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Destination::Name(name) => name,
            Destination::Extended { name, .. } => name,
        }
    }

    /// The storage name if this is a plain rename.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Destination::Name(name) => Some(name),
            Destination::Extended { .. } => None,
        }
    }

    pub fn transform(&self) -> Option<&Transform> {
        match self {
            Destination::Name(_) => None,
            Destination::Extended { transform, .. } => transform.as_ref(),
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Destination::Extended { .. })
    }
}

impl From<&str> for Destination {
    fn from(name: &str) -> Self {
        Destination::Name(name.to_string())
    }
}

impl From<String> for Destination {
    fn from(name: String) -> Self {
        Destination::Name(name)
    }
}

/// How a field relates to storage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldMode {
    /// Stored and selected as a plain column.
    #[default]
    Regular,
    /// Computed from a raw expression at query time and filled in by projection.
    Derived { expression: String },
    /// Exists only in the exposed model.
    Virtual,
}

impl FieldMode {
    pub fn is_derived(&self) -> bool {
        matches!(self, FieldMode::Derived { .. })
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, FieldMode::Virtual)
    }

    pub fn expression(&self) -> Option<&str> {
        match self {
            FieldMode::Derived { expression } => Some(expression),
            _ => None,
        }
    }
}

/// Mapping metadata for one exposed field.
///
/// # Example
///
/// ```rust
/// use crud_gen::{Destination, FieldMapperEntry};
///
/// let entry = FieldMapperEntry::builder()
///     .destination("column_id")
///     .deny_filter(true)
///     .build()
///     .unwrap();
/// assert_eq!(entry.destination(), &Destination::Name("column_id".to_string()));
/// assert!(entry.deny_filter());
///
/// let derived = FieldMapperEntry::derived("fullName", "CONCAT(first_name, ' ', last_name)");
/// assert!(derived.mode().is_derived());
/// assert!(derived.destination().is_extended());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(
    pattern = "owned",
    build_fn(validate = "Self::validate", error = "FieldMapperEntryError")
)]
pub struct FieldMapperEntry {
    #[builder(default, setter(into, strip_option))]
    source_name: Option<String>,
    #[builder(setter(into))]
    destination: Destination,
    #[builder(default)]
    is_required: bool,
    #[builder(default)]
    is_symbolic: bool,
    #[builder(default)]
    deny_filter: bool,
    #[builder(default)]
    mode: FieldMode,
}

impl FieldMapperEntryBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(destination) = &self.destination
            && destination.name().is_empty()
        {
            return Err("destination name must not be empty".to_string());
        }
        if let Some(FieldMode::Derived { expression }) = &self.mode
            && expression.trim().is_empty()
        {
            return Err("derived fields need a non-empty expression".to_string());
        }
        if let Some(Some(source)) = &self.source_name
            && source.is_empty()
        {
            return Err("source name must not be empty when given".to_string());
        }
        Ok(())
    }
}

impl FieldMapperEntry {
    pub fn builder() -> FieldMapperEntryBuilder {
        FieldMapperEntryBuilder::default()
    }

    pub fn new(destination: impl Into<Destination>) -> Self {
        Self {
            source_name: None,
            destination: destination.into(),
            is_required: false,
            is_symbolic: false,
            deny_filter: false,
            mode: FieldMode::Regular,
        }
    }

    /// A field computed from `expression`, landing on an extended destination.
    pub fn derived(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            mode: FieldMode::Derived {
                expression: expression.into(),
            },
            ..Self::new(Destination::extended(name, None))
        }
    }

    pub fn virtual_field(name: impl Into<String>) -> Self {
        Self {
            mode: FieldMode::Virtual,
            ..Self::new(Destination::Name(name.into()))
        }
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn symbolic(mut self) -> Self {
        self.is_symbolic = true;
        self
    }

    pub fn filter_denied(mut self) -> Self {
        self.deny_filter = true;
        self
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn is_symbolic(&self) -> bool {
        self.is_symbolic
    }

    pub fn deny_filter(&self) -> bool {
        self.deny_filter
    }

    pub fn mode(&self) -> &FieldMode {
        &self.mode
    }

    /// Short description used in error messages.
    pub(crate) fn describe_destination(&self) -> String {
        match &self.destination {
            Destination::Name(name) => name.clone(),
            Destination::Extended {
                name,
                transform: Some(t),
            } => format!("{name} via {}", t.name()),
            Destination::Extended { name, .. } => match &self.mode {
                FieldMode::Derived { expression } => format!("{name} = {expression}"),
                _ => name.clone(),
            },
        }
    }
}

/// Returns true iff `value` carries a non-empty `destinationName`.
pub fn is_field_mapper_entry(value: &Value) -> bool {
    value
        .get("destinationName")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldMapperEntry {
    #[serde(default)]
    source_name: Option<String>,
    destination_name: String,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    is_symbolic: bool,
    #[serde(default)]
    deny_filter: bool,
    #[serde(default)]
    mode: RawMode,
    #[serde(default)]
    expression: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "lowercase")]
enum RawMode {
    #[default]
    Regular,
    Derived,
    Virtual,
}

impl TryFrom<&Value> for FieldMapperEntry {
    type Error = FieldMapperEntryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        if !is_field_mapper_entry(value) {
            return Err(FieldMapperEntryError::Invalid(
                "value has no destinationName".to_string(),
            ));
        }
        let raw = RawFieldMapperEntry::deserialize(value)
            .map_err(|e| FieldMapperEntryError::Invalid(e.to_string()))?;
        let (destination, mode) = match raw.mode {
            RawMode::Regular => (Destination::Name(raw.destination_name), FieldMode::Regular),
            RawMode::Virtual => (Destination::Name(raw.destination_name), FieldMode::Virtual),
            RawMode::Derived => (
                Destination::extended(raw.destination_name, None),
                FieldMode::Derived {
                    expression: raw.expression.unwrap_or_default(),
                },
            ),
        };
        let mut builder = FieldMapperEntry::builder()
            .destination(destination)
            .is_required(raw.is_required)
            .is_symbolic(raw.is_symbolic)
            .deny_filter(raw.deny_filter)
            .mode(mode);
        if let Some(source) = raw.source_name {
            builder = builder.source_name(source);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper(_: &Record, value: Value) -> Value {
        Value::String(value.as_str().unwrap_or_default().to_uppercase())
    }

    fn lower(_: &Record, value: Value) -> Value {
        Value::String(value.as_str().unwrap_or_default().to_lowercase())
    }

    #[test]
    fn builder_requires_destination() {
        let res = FieldMapperEntry::builder().is_required(true).build();
        assert!(matches!(
            res,
            Err(FieldMapperEntryError::UninitializedField(_))
        ));
    }

    #[test]
    fn builder_rejects_empty_names() {
        let res = FieldMapperEntry::builder().destination("").build();
        assert!(matches!(res, Err(FieldMapperEntryError::Invalid(_))));

        let res = FieldMapperEntry::builder()
            .destination(Destination::extended("full_name", None))
            .mode(FieldMode::Derived {
                expression: "  ".to_string(),
            })
            .build();
        assert!(matches!(res, Err(FieldMapperEntryError::Invalid(_))));
    }

    #[test]
    fn transforms_compare_by_name_and_function() {
        let a = Transform::new("upper", upper);
        let b = Transform::new("upper", upper);
        let c = Transform::new("upper", lower);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn type_guard() {
        assert!(is_field_mapper_entry(&json!({ "destinationName": "x" })));
        assert!(!is_field_mapper_entry(&json!({ "destinationName": "" })));
        assert!(!is_field_mapper_entry(&json!({ "sourceName": "x" })));
        assert!(!is_field_mapper_entry(&json!("x")));
    }

    #[test]
    fn entry_from_json() {
        let entry = FieldMapperEntry::try_from(&json!({
            "destinationName": "column_id",
            "sourceName": "col",
            "denyFilter": true
        }))
        .unwrap();
        assert_eq!(entry.destination().as_plain(), Some("column_id"));
        assert_eq!(entry.source_name(), Some("col"));
        assert!(entry.deny_filter());
        assert!(!entry.is_required());

        let derived = FieldMapperEntry::try_from(&json!({
            "destinationName": "fullName",
            "mode": "derived",
            "expression": "CONCAT(first_name, ' ', last_name)"
        }))
        .unwrap();
        assert_eq!(
            derived.mode().expression(),
            Some("CONCAT(first_name, ' ', last_name)")
        );

        let missing_expression = FieldMapperEntry::try_from(&json!({
            "destinationName": "fullName",
            "mode": "derived"
        }));
        assert!(missing_expression.is_err());
    }
}
