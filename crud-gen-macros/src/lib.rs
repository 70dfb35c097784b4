#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]
#![forbid(unsafe_code)]

mod field_mapper;

use proc_macro::TokenStream;
use syn::parse_macro_input;

/// Derives `crud_gen::FieldMapped` and `crud_gen::AssignDerived` for a struct with
/// named fields.
///
/// # Attributes
///
/// On the struct:
/// - `entity = "Name"`: entity name used in logs and errors (defaults to the type name)
/// - `extends = "path::To::Parent"`: inherit the parent's declarations. Inherited
///   derived fields are assigned through the type's serde form, so the type must
///   implement `Serialize` and `Deserialize`.
/// - `rename_all = "camelCase"`: case of the exposed property names
///
/// On fields:
/// - `destination = "column"`: storage / output name. Defaults to the raw field
///   name even when `rename_all` is set, so mapping between two renamed types needs
///   an explicit `destination` on every field whose name changes case.
/// - `source = "alias"`: alternative inbound name
/// - `required`, `symbolic`, `deny_filter`
/// - `derived = "EXPR"`: computed from a raw expression and filled in by projection
/// - `virtual_only`: exists only in the exposed model
/// - `transform = "path::to::fn"`: extended destination with a transform
/// - `skip`: not mapped
///
/// ```rust,ignore
/// #[derive(FieldMapper, Serialize, Deserialize)]
/// #[field_mapper(rename_all = "camelCase")]
/// struct Person {
///     #[field_mapper(required)]
///     id: i64,
///     #[field_mapper(destination = "first_name")]
///     first_name: String,
///     #[field_mapper(derived = "CONCAT(first_name, ' ', last_name)")]
///     full_name: Option<String>,
/// }
/// ```
#[proc_macro_derive(FieldMapper, attributes(field_mapper))]
pub fn field_mapper_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as syn::DeriveInput);
    match field_mapper::derive(ast) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.write_errors().into(),
    }
}
