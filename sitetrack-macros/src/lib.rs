use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, ImplItem, ImplItemFn, ItemImpl, Stmt,
    Variant, Visibility,
};

/// Turns an enum into a sitetrack error type.
///
/// The macro:
/// 1. Adds `#[derive(Debug, thiserror::Error, uniffi::Error)]` and `#[uniffi(flat_error)]`
/// 2. Appends a `Generic { message: String }` variant unless the enum already has one
/// 3. Implements `From<anyhow::Error>`, flattening the error chain into the message
/// 4. Adds `from_anyhow_result` / `from_anyhow_result_with_prefix` helpers
///
/// Only one `#[sitetrack_error]` enum may live in a module, since the expansion
/// brings `anyhow::Context` into scope.
///
/// # Usage
///
/// ```rust,ignore
/// #[sitetrack_error]
/// pub enum StoreError {
///     #[error("record is corrupt: {message}")]
///     CorruptRecord { message: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn sitetrack_error(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(
            &input,
            "sitetrack_error can only be applied to enums",
        )
        .to_compile_error()
        .into();
    };

    let enum_name = &input.ident;
    let visibility = &input.vis;
    let generics = &input.generics;

    // Derives and uniffi attributes are regenerated below.
    let attrs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("derive") && !attr.path().is_ident("uniffi"))
        .collect();

    let mut variants = data_enum.variants.clone();
    if !variants.iter().any(|variant| variant.ident == "Generic") {
        let generic_variant: Variant = syn::parse_quote! {
            /// A generic error wrapping an `anyhow` error chain.
            #[error("Generic error: {message}")]
            Generic {
                /// The flattened error chain.
                message: String
            }
        };
        variants.push(generic_variant);
    }

    quote! {
        use anyhow::Context;

        #[derive(Debug, thiserror::Error, uniffi::Error)]
        #[uniffi(flat_error)]
        #(#attrs)*
        #visibility enum #enum_name #generics {
            #variants
        }

        impl #generics From<anyhow::Error> for #enum_name #generics {
            fn from(err: anyhow::Error) -> Self {
                Self::Generic {
                    message: Self::flatten_chain(&err),
                }
            }
        }

        impl #generics #enum_name #generics {
            fn flatten_chain(err: &anyhow::Error) -> String {
                let mut message = err.to_string();
                let chain: Vec<String> = err.chain().skip(1).map(|e| e.to_string()).collect();
                if !chain.is_empty() {
                    message.push_str(" (caused by: ");
                    message.push_str(&chain.join(" -> "));
                    message.push(')');
                }
                message
            }

            /// Convert an `anyhow::Result` into a result with this error type
            ///
            /// # Errors
            /// Returns `Self::Generic` when `result` is an error.
            pub fn from_anyhow_result<T>(result: anyhow::Result<T>) -> Result<T, Self> {
                result.map_err(Self::from)
            }

            /// Convert an `anyhow::Result` into a result with this error type, prefixing the message
            ///
            /// # Errors
            /// Returns `Self::Generic` when `result` is an error.
            pub fn from_anyhow_result_with_prefix<T>(
                result: anyhow::Result<T>,
                prefix: &str,
            ) -> Result<T, Self> {
                result.map_err(|err| Self::Generic {
                    message: format!("{}: {}", prefix, Self::flatten_chain(&err)),
                })
            }
        }
    }
    .into()
}

/// Wraps `uniffi::export` and injects a logging context into every public method.
///
/// Each `pub fn` in the impl block starts with
/// `let _sitetrack_logger_ctx = crate::primitives::logger::LogContext::new("TypeName");`
/// so log lines emitted while the method runs are prefixed with `[TypeName]`.
///
/// # Usage
///
/// ```rust,ignore
/// #[sitetrack_export]
/// impl SettingsManager {
///     pub fn load(&self, request_host: String) -> Result<Configuration, SettingsError> {
///         crate::info!("loading"); // logged as "[SettingsManager] loading"
///         // ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn sitetrack_export(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_impl = parse_macro_input!(input as ItemImpl);

    let type_name = match &*input_impl.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map_or_else(|| "Unknown".to_string(), |segment| segment.ident.to_string()),
        _ => "Unknown".to_string(),
    };

    let items = input_impl
        .items
        .iter()
        .map(|item| match item {
            ImplItem::Fn(method) if matches!(method.vis, Visibility::Public(_)) => {
                let mut method = method.clone();
                inject_logging_context(&mut method, &type_name);
                ImplItem::Fn(method)
            }
            other => other.clone(),
        })
        .collect();

    let new_impl = ItemImpl {
        items,
        ..input_impl
    };

    let args = proc_macro2::TokenStream::from(args);

    quote! {
        #[uniffi::export(#args)]
        #new_impl
    }
    .into()
}

fn inject_logging_context(method: &mut ImplItemFn, type_name: &str) {
    let context_stmt: Stmt = syn::parse_quote! {
        let _sitetrack_logger_ctx = crate::primitives::logger::LogContext::new(#type_name);
    };
    method.block.stmts.insert(0, context_stmt);
}
