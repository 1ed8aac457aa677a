//! Attribute macros that remove the derive boilerplate from `barrage` metrics
//! and aggregates.
//!
//! Both macros prepend the trait derives the engine expects. `#[metric]` also
//! implements the `barrage::Metric` marker trait for the annotated struct.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

extern crate proc_macro;

fn common_derives() -> TokenStream2 {
    quote! {
        #[derive(
            ::serde::Serialize,
            ::serde::Deserialize,
            ::std::cmp::PartialEq,
            ::std::fmt::Debug,
            ::std::clone::Clone
        )]
    }
}

/// Marks a struct as a single measurement emitted by a virtual user.
///
/// ```ignore
/// #[metric]
/// pub struct Sample {
///     pub latency: std::time::Duration,
/// }
/// ```
#[proc_macro_attribute]
pub fn metric(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    let ident = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let derives = common_derives();

    let expanded = quote! {
        #derives
        #ast

        impl #impl_generics ::barrage::Metric for #ident #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}

/// Marks a struct as a mergeable accumulator of metrics.
///
/// Aggregates start out empty, so `Default` is derived as well.
#[proc_macro_attribute]
pub fn aggregate(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(item as ItemStruct);
    let derives = common_derives();

    let expanded = quote! {
        #derives
        #[derive(::std::default::Default)]
        #ast
    };

    TokenStream::from(expanded)
}
