//! Field mapping and query translation for generated CRUD layers
//!
//! Exposed models rarely line up one-to-one with how their data is stored. This crate keeps
//! per-field mapping metadata for every entity type and uses it to translate list arguments
//! (filters, sorting, row windows) into storage terms, to project derived values from raw
//! query rows back onto hydrated entities and to map records between object models.
//!
//! # Features
//!
//! - Declarative field metadata via `#[derive(FieldMapper)]`
//! - Single-inheritance of mappings between entity types
//! - Grid-style filter parsing and validation
//! - Paginated and unpaginated list parameter factories
//! - Derived field projection from raw query rows
//! - Transforming object-to-object mapping

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod field;
pub mod filter;
pub mod list_params;
pub mod mapper;
pub mod projection;
pub mod registry;
pub mod traits;
pub mod translate;

pub mod prelude {
    //! Convenience re-export of crates that the derive macro references in generated code.

    pub use chrono;
    pub use serde;
    pub use serde_json;

    #[cfg(feature = "json-schema")]
    pub use schemars;
}

#[doc(inline)]
pub use config::*;
pub use crud_gen_macros::FieldMapper;
#[doc(inline)]
pub use error::*;
#[doc(inline)]
pub use field::*;
#[doc(inline)]
pub use filter::*;
#[doc(inline)]
pub use list_params::*;
#[doc(inline)]
pub use mapper::*;
#[doc(inline)]
pub use projection::*;
#[doc(inline)]
pub use registry::*;
#[doc(inline)]
pub use traits::*;
#[doc(inline)]
pub use translate::*;
