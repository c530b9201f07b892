use crate::attributes::{FieldAttributes, ObjectAliasAttributes, ObjectAttributes};
use convert_case::{Case, Casing};
use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use std::ops::Deref;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Field, Fields, Index, Item, Member, Result,
    Type,
};

const OBJECT: &str = "object";

struct Property<'a> {
    name: String,
    member: Member,
    ty: &'a Type,
}

fn extract_field_attributes(field: &Field) -> Result<FieldAttributes> {
    field
        .attrs
        .iter()
        .filter(|attribute| attribute.path().is_ident(OBJECT))
        .map(FieldAttributes::try_from)
        .next()
        .transpose()
        .map(Option::unwrap_or_default)
}

fn extract_object_attributes(attributes: &[Attribute]) -> Result<Option<ObjectAttributes>> {
    attributes
        .iter()
        .filter_map(|attribute| {
            if attribute.path().is_ident(OBJECT) {
                Some(ObjectAttributes::try_from(attribute))
            } else {
                None
            }
        })
        .next()
        .transpose()
}

fn collect_properties<'a>(fields: &'a Fields, rename_all: Option<Case>) -> Result<Vec<Property<'a>>> {
    let properties: Vec<_> = fields
        .iter()
        .enumerate()
        .map(|(index, field)| -> Result<Option<Property<'a>>> {
            let attributes = extract_field_attributes(field)?;
            if attributes.ignore {
                return Ok(None);
            }

            let (member, default_name) = match &field.ident {
                Some(ident) => (Member::Named(ident.clone()), Some(ident.to_string())),
                None => (Member::Unnamed(Index::from(index)), None),
            };

            let name = match (attributes.name, default_name) {
                (Some(name), _) => name.value(),
                (None, Some(name)) => match rename_all {
                    Some(case) => name.to_case(case),
                    None => name,
                },
                // tuple fields are exposed only when explicitly named
                (None, None) => return Ok(None),
            };

            Ok(Some(Property {
                name,
                member,
                ty: &field.ty,
            }))
        })
        .filter_map_ok(|property| property)
        .try_collect()?;

    if let Some(duplicate) = properties.iter().map(|property| &property.name).duplicates().next() {
        return Err(Error::new(
            fields.span(),
            format!("Duplicated property name: {duplicate}"),
        ));
    }

    Ok(properties)
}

pub fn expand_object(input: &DeriveInput) -> Result<TokenStream> {
    if let Data::Struct(DataStruct { fields, .. }) = &input.data {
        let ident = &input.ident;
        let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

        let (constructor, rename_all) = match extract_object_attributes(&input.attrs)? {
            Some(ObjectAttributes {
                constructor,
                rename_all,
            }) => (constructor, rename_all),
            None => (None, None),
        };

        let construction = match constructor {
            Some(path) => quote! { #path(arguments) },
            None => quote! {
                let _ = arguments;
                Ok(<Self as std::default::Default>::default())
            },
        };

        let properties = collect_properties(fields, rename_all)?;
        let descriptors = properties.iter().map(|Property { name, ty, .. }| {
            quote! {
                spring_fluent::object::PropertyDescriptor::new::<#ty>(#name)
            }
        });
        let setters = properties.iter().map(|Property { name, member, .. }| {
            quote! {
                #name => {
                    self.#member = spring_fluent::object::FromResolvedValue::from_resolved_value(value)?;
                    Ok(())
                }
            }
        });

        Ok(quote! {
            #[automatically_derived]
            impl #impl_generics spring_fluent::object::Object for #ident #ty_generics #where_clause {
                fn instantiate(
                    arguments: &mut spring_fluent::object::ConstructorArguments,
                ) -> Result<Self, spring_fluent::error::ConstructorArgumentError> {
                    #construction
                }

                fn property_descriptors() -> Vec<spring_fluent::object::PropertyDescriptor> {
                    vec![#(#descriptors),*]
                }

                #[allow(unused_variables)]
                fn set_property(
                    &mut self,
                    name: &str,
                    value: spring_fluent::object::ResolvedValue,
                ) -> Result<(), spring_fluent::error::PropertyError> {
                    match name {
                        #(#setters)*
                        _ => Err(spring_fluent::error::PropertyError::UnknownProperty(name.to_string())),
                    }
                }
            }
        })
    } else {
        Err(Error::new(input.span(), "Can only derive Object on structs!"))
    }
}

pub fn register_object_alias(item: &Item, _args: &ObjectAliasAttributes) -> Result<TokenStream> {
    if let Item::Impl(item_impl) = item {
        let trait_type = item_impl
            .trait_
            .as_ref()
            .map(|(_, path, ..)| path)
            .ok_or_else(|| Error::new(item.span(), "Missing trait identifier!"))?;

        let target_type = if let Type::Path(path) = item_impl.self_ty.deref() {
            &path.path
        } else {
            return Err(Error::new(
                item.span(),
                "Aliases can only be registered for named object types!",
            ));
        };

        Ok(quote! {
            const _: () = {
                fn cast(
                    source: spring_fluent::instance_provider::ObjectInstanceAnyPtr,
                ) -> Result<Box<dyn std::any::Any>, spring_fluent::instance_provider::ObjectInstanceAnyPtr> {
                    source.downcast::<#target_type>().map(|instance| {
                        Box::new(instance as spring_fluent::instance_provider::ObjectPtr<dyn #trait_type>)
                            as Box<dyn std::any::Any>
                    })
                }

                fn register() -> spring_fluent::object_registry::internal::ObjectAliasDefinition {
                    use std::any::{type_name, TypeId};
                    spring_fluent::object_registry::internal::ObjectAliasDefinition {
                        alias_type: TypeId::of::<dyn #trait_type>(),
                        target_type: TypeId::of::<#target_type>(),
                        alias_name: type_name::<dyn #trait_type>(),
                        target_name: type_name::<#target_type>(),
                        cast,
                    }
                }

                spring_fluent::object_registry::internal::submit! {
                    spring_fluent::object_registry::internal::ObjectAliasRegisterer {
                        register
                    }
                };
            };
        })
    } else {
        Err(Error::new(
            item.span(),
            "Registering aliases is possible only on trait implementations!",
        ))
    }
}
