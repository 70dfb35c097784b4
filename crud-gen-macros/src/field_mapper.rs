use convert_case::{Case, Casing};
use darling::{FromDeriveInput, FromField, ToTokens, ast::Data, util::Ignored};
use proc_macro2::TokenStream;
use quote::{TokenStreamExt, quote};
use syn::ext::IdentExt;

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(field_mapper), supports(struct_named))]
pub struct FieldMapper {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<Ignored, MappedField>,
    #[darling(default)]
    entity: Option<String>,
    #[darling(default)]
    extends: Option<syn::Path>,
    #[darling(default)]
    rename_all: Option<String>,
}

#[derive(Debug, FromField)]
#[darling(attributes(field_mapper))]
struct MappedField {
    ident: Option<syn::Ident>,
    #[darling(default)]
    destination: Option<String>,
    #[darling(default)]
    source: Option<String>,
    #[darling(default)]
    required: bool,
    #[darling(default)]
    symbolic: bool,
    #[darling(default)]
    deny_filter: bool,
    #[darling(default)]
    derived: Option<String>,
    #[darling(default)]
    virtual_only: bool,
    #[darling(default)]
    transform: Option<syn::Path>,
    #[darling(default)]
    skip: bool,
}

pub fn derive(ast: syn::DeriveInput) -> darling::Result<proc_macro2::TokenStream> {
    let mapper = FieldMapper::from_derive_input(&ast)?;
    mapper.validate()?;
    Ok(quote!(#mapper))
}

impl FieldMapper {
    fn validate(&self) -> darling::Result<()> {
        let mut errors = darling::Error::accumulator();
        if !self.generics.params.is_empty() {
            errors.push(
                darling::Error::custom("FieldMapper cannot be derived for generic types")
                    .with_span(&self.generics),
            );
        }
        if let Some(rule) = &self.rename_all
            && rename_rule(rule).is_none()
        {
            errors.push(darling::Error::unknown_value(rule).with_span(&self.ident));
        }
        for field in self.fields() {
            if let Err(e) = field.validate() {
                errors.push(e);
            }
        }
        errors.finish()
    }

    fn fields(&self) -> impl Iterator<Item = &MappedField> {
        self.data
            .as_ref()
            .take_struct()
            .map(|fields| fields.fields)
            .unwrap_or_default()
            .into_iter()
            .filter(|f| !f.skip)
    }

    fn entity_name(&self) -> String {
        self.entity
            .clone()
            .unwrap_or_else(|| self.ident.unraw().to_string())
    }
}

impl MappedField {
    fn validate(&self) -> darling::Result<()> {
        let conflict = |what: &str| {
            let err = darling::Error::custom(format!(
                "field_mapper: {what} cannot be combined on the same field"
            ));
            match &self.ident {
                Some(ident) => err.with_span(ident),
                None => err,
            }
        };
        if self.derived.is_some() && self.virtual_only {
            return Err(conflict("`derived` and `virtual_only`"));
        }
        if self.transform.is_some() && (self.derived.is_some() || self.virtual_only) {
            return Err(conflict("`transform` and `derived`/`virtual_only`"));
        }
        if let Some(expression) = &self.derived
            && expression.trim().is_empty()
        {
            return Err(darling::Error::custom("field_mapper: `derived` needs an expression"));
        }
        Ok(())
    }

    fn field_name(&self) -> String {
        self.ident
            .as_ref()
            .map(|ident| ident.unraw().to_string())
            .unwrap_or_default()
    }

    fn property(&self, case: Option<Case<'static>>) -> String {
        let name = self.field_name();
        match case {
            Some(case) => name.to_case(case),
            None => name,
        }
    }

    fn entry(&self) -> TokenStream {
        let destination = self.destination.clone().unwrap_or_else(|| self.field_name());
        let mut entry = if let Some(expression) = &self.derived {
            quote! { crud_gen::FieldMapperEntry::derived(#destination, #expression) }
        } else if self.virtual_only {
            quote! { crud_gen::FieldMapperEntry::virtual_field(#destination) }
        } else if let Some(path) = &self.transform {
            let name = path_name(path);
            quote! {
                crud_gen::FieldMapperEntry::new(crud_gen::Destination::extended(
                    #destination,
                    Some(crud_gen::Transform::new(#name, #path)),
                ))
            }
        } else {
            quote! { crud_gen::FieldMapperEntry::new(#destination) }
        };
        if let Some(source) = &self.source {
            entry.append_all(quote! { .with_source_name(#source) });
        }
        if self.required {
            entry.append_all(quote! { .required() });
        }
        if self.symbolic {
            entry.append_all(quote! { .symbolic() });
        }
        if self.deny_filter {
            entry.append_all(quote! { .filter_denied() });
        }
        entry
    }
}

impl ToTokens for FieldMapper {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let ident = &self.ident;
        let entity = self.entity_name();
        let case = self.rename_all.as_deref().and_then(rename_rule);

        let declarations = self.fields().map(|field| {
            let property = field.property(case);
            let entry = field.entry();
            quote! { (#property, #entry) }
        });

        let parent = self.extends.as_ref().map(|parent| {
            quote! {
                fn parent() -> Option<crud_gen::EntityType> {
                    Some(crud_gen::EntityType::of::<#parent>())
                }
            }
        });

        let derived_arms = self.fields().filter(|f| f.derived.is_some()).map(|field| {
            let property = field.property(case);
            let field_ident = &field.ident;
            quote! {
                #property => {
                    self.#field_ident = crud_gen::prelude::serde_json::from_value(value).map_err(|source| {
                        crud_gen::ProjectionError::Deserialization {
                            property: property.to_string(),
                            source,
                        }
                    })?;
                    Ok(())
                }
            }
        });

        let fallback = if self.extends.is_some() {
            quote! { crud_gen::assign_inherited(self, #entity, property, value) }
        } else {
            quote! {
                let _ = value;
                Err(crud_gen::ProjectionError::UnknownDerivedField {
                    entity: #entity,
                    property: property.to_string(),
                })
            }
        };

        tokens.append_all(quote! {
            impl crud_gen::FieldMapped for #ident {
                const ENTITY_NAME: &'static str = #entity;

                fn declared_fields() -> Vec<(&'static str, crud_gen::FieldMapperEntry)> {
                    vec![#(#declarations),*]
                }

                #parent
            }

            impl crud_gen::AssignDerived for #ident {
                fn assign_derived(
                    &mut self,
                    property: &str,
                    value: crud_gen::prelude::serde_json::Value,
                ) -> Result<(), crud_gen::ProjectionError> {
                    match property {
                        #(#derived_arms)*
                        _ => {
                            #fallback
                        }
                    }
                }
            }
        });
    }
}

fn rename_rule(s: &str) -> Option<Case<'static>> {
    match s {
        "lowercase" => Some(Case::Lower),
        "UPPERCASE" => Some(Case::Upper),
        "PascalCase" => Some(Case::Pascal),
        "camelCase" => Some(Case::Camel),
        "snake_case" => Some(Case::Snake),
        "SCREAMING_SNAKE_CASE" => Some(Case::Constant),
        "kebab-case" => Some(Case::Kebab),
        "SCREAMING-KEBAB-CASE" => Some(Case::Cobol),
        _ => None,
    }
}

fn path_name(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}
