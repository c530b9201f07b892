use crate::attributes::ObjectAliasAttributes;
use crate::object::{expand_object, register_object_alias};
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error, Item};

mod attributes;
mod object;

#[proc_macro_derive(Object, attributes(object))]
pub fn generate_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_object(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

#[proc_macro_attribute]
pub fn object_alias(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ObjectAliasAttributes);
    let item = parse_macro_input!(item as Item);
    let registration = register_object_alias(&item, &args).unwrap_or_else(Error::into_compile_error);

    (quote::quote! {
        #item
        #registration
    })
    .into()
}
