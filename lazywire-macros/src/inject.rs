use darling::ast::Data;
use darling::util::Ignored;
use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Generics, Ident, Path, Visibility};

#[derive(FromDeriveInput)]
#[darling(attributes(inject), supports(struct_named))]
struct InjectInput {
    ident: Ident,
    generics: Generics,
    data: Data<Ignored, InjectField>,
    #[darling(default, rename = "crate")]
    krate: Option<Path>,
}

#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectField {
    ident: Option<Ident>,
    vis: Visibility,
    #[darling(default)]
    skip: bool,
}

impl InjectField {
    fn is_injected(&self) -> bool {
        !self.skip && !matches!(self.vis, Visibility::Inherited)
    }
}

pub(crate) fn expand(input: &DeriveInput) -> darling::Result<TokenStream> {
    let input = InjectInput::from_derive_input(input)?;

    let krate = input
        .krate
        .map(|path| quote!(#path))
        .unwrap_or_else(|| quote!(::lazywire));

    let fields = input
        .data
        .take_struct()
        .map(|fields| fields.fields)
        .unwrap_or_default();

    let injected = fields
        .iter()
        .filter(|field| field.is_injected())
        .filter_map(|field| field.ident.as_ref());

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Inject for #name #ty_generics #where_clause {
            fn inject_fields(&mut self, container: &#krate::Container) -> #krate::Result<()> {
                #( container.inject_as(&mut self.#injected)?; )*
                ::core::result::Result::Ok(())
            }
        }
    })
}
