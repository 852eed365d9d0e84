//! Paths used in generated code.
//!
//! Generated impls name items through the `supaform` facade. The crate is
//! looked up in the caller's manifest so a renamed dependency still resolves.
//! The facade's own tests see it as `::supaform`, which it declares with
//! `extern crate self as supaform`.

use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::Ident;

pub fn facade() -> TokenStream {
    match crate_name("supaform") {
        Ok(FoundCrate::Itself) => quote!(::supaform),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::supaform),
    }
}

pub fn types() -> TokenStream {
    let krate = facade();
    quote!(#krate::types)
}

pub fn string() -> TokenStream {
    quote!(::std::string::String)
}

pub fn vec() -> TokenStream {
    quote!(::std::vec::Vec)
}
