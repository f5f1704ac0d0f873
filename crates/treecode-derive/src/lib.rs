//! # Treecode Derive
//!
//! `#[derive(Encode, Decode)]` for structs.
//!
//! - Named fields become a map keyed by field name.
//! - Tuple fields become an array in declaration order. Decoding requires
//!   the exact element count.
//! - Unit structs become nil.
//!
//! Every type parameter gets an `Encode` (or `Decode`) bound. Enums and
//! unions are rejected.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse_macro_input;
use syn::parse_quote;
use syn::Data;
use syn::DeriveInput;
use syn::Fields;
use syn::GenericParam;
use syn::Generics;
use syn::Index;
use syn::TypeParamBound;

#[proc_macro_derive(Encode)]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_encode(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

#[proc_macro_derive(Decode)]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_decode(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

fn expand_encode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let generics = with_bound(&input.generics, parse_quote!(::treecode::Encode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match fields(input, "Encode")? {
        Fields::Named(named) => {
            let writes = named.named.iter().filter_map(|field| {
                let ident = field.ident.as_ref()?;
                let key = ident.unraw().to_string();
                Some(quote! { map.encode(#key, &self.#ident)?; })
            });
            quote! {
                let mut map = enc.map()?;
                #(#writes)*
                map.finish()
            }
        }
        Fields::Unnamed(unnamed) => {
            let writes = (0..unnamed.unnamed.len()).map(|i| {
                let index = Index::from(i);
                quote! { array.encode(&self.#index)?; }
            });
            quote! {
                let mut array = enc.array()?;
                #(#writes)*
                array.finish()
            }
        }
        Fields::Unit => quote! { enc.value().nil() },
    };

    Ok(quote! {
        impl #impl_generics ::treecode::Encode for #name #ty_generics #where_clause {
            fn encode(&self, enc: &mut ::treecode::Encoder) -> ::treecode::Result<()> {
                #body
            }
        }
    })
}

fn expand_decode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let generics = with_bound(&input.generics, parse_quote!(::treecode::Decode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match fields(input, "Decode")? {
        Fields::Named(named) => {
            let reads = named.named.iter().filter_map(|field| {
                let ident = field.ident.as_ref()?;
                let key = ident.unraw().to_string();
                Some(quote! { #ident: map.decode(#key)?, })
            });
            quote! {
                let mut map = dec.map()?;
                ::std::result::Result::Ok(Self { #(#reads)* })
            }
        }
        Fields::Unnamed(unnamed) => {
            let len = unnamed.unnamed.len();
            let reads = (0..len).map(|_| quote! { array.decode()?, });
            quote! {
                let mut array = dec.array()?;
                let found = array.count();
                if found != #len {
                    let path = array.super_decoder().coding_path();
                    return ::std::result::Result::Err(::treecode::Error::DataCorrupted {
                        path,
                        cause: ::treecode::Corruption::Invalid(::std::format!(
                            "expected {} elements, found {}",
                            #len,
                            found
                        )),
                    });
                }
                ::std::result::Result::Ok(Self( #(#reads)* ))
            }
        }
        Fields::Unit => quote! {
            let _ = dec;
            ::std::result::Result::Ok(Self)
        },
    };

    Ok(quote! {
        impl #impl_generics ::treecode::Decode for #name #ty_generics #where_clause {
            fn decode(dec: &mut ::treecode::Decoder<'_>) -> ::treecode::Result<Self> {
                #body
            }
        }
    })
}

fn fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<&'a Fields> {
    match &input.data {
        Data::Struct(data) => Ok(&data.fields),
        Data::Enum(_) | Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{} can only be derived for structs", derive),
        )),
    }
}

fn with_bound(generics: &Generics, bound: TypeParamBound) -> Generics {
    let mut generics = generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(bound.clone());
        }
    }
    generics
}
