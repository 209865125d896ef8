//! # Waypost Macros
//!
//! Procedural macros for Waypost.
//!
//! `#[handler]` turns an `async fn` over references into a plain fn
//! returning a boxed future, which is the shape controller and middleware
//! registries take:
//!
//! ```ignore
//! #[handler]
//! async fn home(ctx: &mut RequestContext) -> Result<()> {
//!     ctx.response.send("ok")
//! }
//!
//! let controllers = ControllerRegistry::new().with("Home", home);
//! ```

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ItemFn, Lifetime, Pat, PatIdent, ReturnType, Type};

/// Box an `async fn` so it can be registered as a controller or middleware
///
/// Every reference argument without an explicit lifetime is tied to one
/// lifetime that the returned future borrows for.
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "#[handler] takes no arguments")
            .to_compile_error()
            .into();
    }
    let input = parse_macro_input!(item as ItemFn);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: ItemFn) -> syn::Result<TokenStream2> {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            sig.fn_token,
            "#[handler] requires an async fn",
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "#[handler] functions cannot be generic",
        ));
    }

    let lifetime = Lifetime::new("'__waypost", Span::call_site());
    let mut outer_args = Vec::new();
    let mut inner_args = Vec::new();
    let mut call_args = Vec::new();

    for (i, arg) in sig.inputs.iter().enumerate() {
        let FnArg::Typed(pat_type) = arg else {
            return Err(syn::Error::new_spanned(arg, "#[handler] cannot take self"));
        };
        let ty = &pat_type.ty;

        let (ident, inner) = match &*pat_type.pat {
            Pat::Ident(PatIdent {
                ident,
                by_ref: None,
                subpat: None,
                ..
            }) => (ident.clone(), {
                let pat = &pat_type.pat;
                quote!(#pat: #ty)
            }),
            Pat::Wild(_) => {
                let ident = format_ident!("__arg{}", i);
                (ident.clone(), quote!(#ident: #ty))
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "#[handler] arguments must be plain identifiers",
                ))
            }
        };

        let outer_ty = with_lifetime(ty, &lifetime);
        outer_args.push(quote!(#ident: #outer_ty));
        inner_args.push(inner);
        call_args.push(ident);
    }

    let output = match &sig.output {
        ReturnType::Default => quote!(()),
        ReturnType::Type(_, ty) => quote!(#ty),
    };
    let name = &sig.ident;

    Ok(quote! {
        #(#attrs)*
        #vis fn #name<#lifetime>(#(#outer_args),*)
            -> ::waypost_core::__private::BoxFuture<#lifetime, #output>
        {
            async fn __waypost_inner(#(#inner_args),*) -> #output #block
            ::waypost_core::__private::FutureExt::boxed(__waypost_inner(#(#call_args),*))
        }
    })
}

fn with_lifetime(ty: &Type, lifetime: &Lifetime) -> Type {
    match ty {
        Type::Reference(r) if r.lifetime.is_none() => {
            let mut r = r.clone();
            r.lifetime = Some(lifetime.clone());
            Type::Reference(r)
        }
        other => other.clone(),
    }
}
