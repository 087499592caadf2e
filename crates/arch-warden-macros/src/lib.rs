//! # arch-warden-macros
//!
//! Procedural macros for arch-warden's `cargo test` integration.
//!
//! [`enforce!`] expands to a `#[test]` function that runs whole-project
//! validation and panics with a formatted report on findings.

#![forbid(unsafe_code)]

use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitStr, Token};

struct EnforceArgs {
    config: Option<LitStr>,
    fail_on: Option<LitStr>,
}

impl Parse for EnforceArgs {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let mut args = Self {
            config: None,
            fail_on: None,
        };
        while !input.is_empty() {
            let name: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: LitStr = input.parse()?;
            match name.to_string().as_str() {
                "config" => args.config = Some(value),
                "fail_on" => args.fail_on = Some(value),
                other => {
                    return Err(syn::Error::new(
                        name.span(),
                        format!("unknown argument `{other}`, expected `config` or `fail_on`"),
                    ))
                }
            }
            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }
        Ok(args)
    }
}

fn optional(lit: Option<&LitStr>) -> proc_macro2::TokenStream {
    match lit {
        Some(value) => quote! { ::core::option::Option::Some(#value) },
        None => quote! { ::core::option::Option::None },
    }
}

/// Generates a `#[test]` that validates the project against its
/// `arch-warden.toml` registry.
///
/// # Arguments
///
/// - `config = "path/to/file.toml"`: explicit registry file, resolved
///   against the workspace root when relative.
/// - `fail_on = "error" | "warning"`: severity threshold for failure.
///
/// # Example
///
/// ```rust,ignore
/// // tests/architecture.rs
/// arch_warden::enforce!(fail_on = "warning");
/// ```
#[proc_macro]
pub fn enforce(input: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(input as EnforceArgs);
    let config = optional(args.config.as_ref());
    let fail_on = optional(args.fail_on.as_ref());

    quote! {
        #[test]
        fn arch_warden_enforce() {
            ::arch_warden::__internal::run_enforce(#config, #fail_on);
        }
    }
    .into()
}
