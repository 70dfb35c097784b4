//! Types for working with errors produced by crud-gen.

use thiserror::Error;

/// Error returned by [`FieldMapperRegistry::register`](crate::FieldMapperRegistry::register).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error(
        "RegistryError - ConflictingRegistration: '{property}' on '{entity}' is already mapped to '{existing}', refusing '{attempted}'"
    )]
    ConflictingRegistration {
        entity: &'static str,
        property: String,
        existing: String,
        attempted: String,
    },
    #[error(
        "RegistryError - AlreadyResolved: '{entity}' has been resolved, '{property}' can no longer be added"
    )]
    AlreadyResolved {
        entity: &'static str,
        property: String,
    },
}

/// Error produced by the validating [`FieldMapperEntryBuilder`](crate::FieldMapperEntryBuilder).
#[derive(Error, Debug)]
pub enum FieldMapperEntryError {
    #[error("FieldMapperEntryError - UninitializedField: {0}")]
    UninitializedField(#[from] derive_builder::UninitializedFieldError),
    #[error("FieldMapperEntryError - Invalid: {0}")]
    Invalid(String),
}

impl From<String> for FieldMapperEntryError {
    fn from(reason: String) -> Self {
        Self::Invalid(reason)
    }
}

/// An inbound argument resolved to an extended destination, which has no single
/// storage name to translate to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "ArgumentMappingError: '{property}' on '{entity}' maps to extended destination '{destination}'"
)]
pub struct ArgumentMappingError {
    pub entity: &'static str,
    pub property: String,
    pub destination: String,
}

/// The output shape lacks a key declared as destination by the field mapper.
///
/// This is a schema configuration defect and is never recovered from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "DestinationMappingError: '{property}' on '{entity}' maps to '{destination}' which the output shape does not declare"
)]
pub struct DestinationMappingError {
    pub entity: &'static str,
    pub property: String,
    pub destination: String,
}

/// Malformed list arguments (filters, sorting, row window).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("FilterError - MissingArguments: '{column}' is missing '{argument}'")]
    MissingArguments {
        column: String,
        argument: &'static str,
    },
    #[error("FilterError - InvalidArgument: '{argument}' on '{column}': {reason}")]
    InvalidArgument {
        column: String,
        argument: &'static str,
        reason: String,
    },
    #[error("FilterError - InvalidOperator: '{operator}' on '{column}'")]
    InvalidOperator { column: String, operator: String },
    #[error("FilterError - InvalidProperty: '{column}' is not a field of '{entity}'")]
    InvalidProperty {
        entity: &'static str,
        column: String,
    },
    #[error("FilterError - ConditionNotSupported: '{condition}' is not supported by {kind} filters on '{column}'")]
    ConditionNotSupported {
        column: String,
        kind: &'static str,
        condition: &'static str,
    },
    #[error("FilterError - FilterNotSupported: filter type '{filter_type}' on '{column}'")]
    FilterNotSupported { column: String, filter_type: String },
    #[error("FilterError - BadFilterType: '{column}' expected {expected}, found {found}")]
    BadFilterType {
        column: String,
        expected: String,
        found: String,
    },
    #[error("FilterError - StringWhere: raw string conditions are not accepted (on '{column}')")]
    StringWhere { column: String },
    #[error("FilterError - FilterProhibited: '{column}' cannot be filtered on")]
    FilterProhibited { column: String },
    #[error("FilterError - NotPossible: '{column}': {reason}")]
    NotPossible {
        column: String,
        reason: &'static str,
    },
}

impl FilterError {
    /// Every filter validation failure originates from client input.
    pub fn is_client_error(&self) -> bool {
        true
    }
}

/// Errors raised while turning request arguments into storage-facing arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("RequestError - ArgumentMapping: {0}")]
    ArgumentMapping(#[from] ArgumentMappingError),
    #[error("RequestError - Filter: {0}")]
    Filter(#[from] FilterError),
}

impl RequestError {
    pub fn is_client_error(&self) -> bool {
        match self {
            RequestError::ArgumentMapping(_) => true,
            RequestError::Filter(e) => e.is_client_error(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("ProjectionError - MissingRawRow: no raw row for entity at index {index}")]
    MissingRawRow { index: usize },
    #[error("ProjectionError - MissingColumn: raw row {index} has no column '{alias}'")]
    MissingColumn { index: usize, alias: String },
    #[error("ProjectionError - UnknownDerivedField: '{property}' is not a derived field of '{entity}'")]
    UnknownDerivedField {
        entity: &'static str,
        property: String,
    },
    #[error("ProjectionError - Serialization: '{property}': {source}")]
    Serialization {
        property: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("ProjectionError - Deserialization: '{property}': {source}")]
    Deserialization {
        property: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("MappingError - Destination: {0}")]
    Destination(#[from] DestinationMappingError),
    #[error("MappingError - Serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("MappingError - NotAnObject: '{0}' did not serialize to an object")]
    NotAnObject(&'static str),
}
