use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, Fields, Lit, MetaNameValue,
    Path, Token, Type, TypePath,
};

/// Derives an `execute()` method routing each command variant to its handler.
///
/// # Usage
///
/// ```ignore
/// #[derive(Subcommand, CommandRouter)]
/// #[router(state = AppState)]
/// enum Commands {
///     #[router(handler = commands::version::run)]
///     Version,
///
///     #[router(handler = commands::apikey::run, plugin = "apiKey")]
///     ApiKey(ApiKeyArgs),
/// }
/// ```
///
/// This will generate:
///
/// ```ignore
/// impl Commands {
///     pub async fn execute(self, state: cloudctl::State<AppState>) -> cloudctl::Response {
///         match self {
///             Commands::Version => commands::version::run(state).await.into_response(),
///             Commands::ApiKey(args) => match cloudctl::load_plugin(&state, "apiKey").await {
///                 Ok(handle) => commands::apikey::run(state, handle, args).await.into_response(),
///                 Err(err) => cloudctl::CliResult::<()>::Err(err).into_response(),
///             },
///         }
///     }
/// }
/// ```
///
/// Variants tagged with `plugin` launch that plugin (or reuse the running one)
/// before their handler runs; commands without it never spawn anything.
#[proc_macro_derive(CommandRouter, attributes(router))]
pub fn derive_command_router(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let enum_name = &input.ident;

    let state_type = router_args(&input.attrs)?.state.ok_or_else(|| {
        syn::Error::new_spanned(
            enum_name,
            "Missing #[router(state = YourStateType)] attribute on enum",
        )
    })?;

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            enum_name,
            "CommandRouter can only be derived for enums",
        ));
    };

    let match_arms = data
        .variants
        .iter()
        .map(|variant| {
            let variant_name = &variant.ident;
            let args = router_args(&variant.attrs)?;
            let handler = args.handler.ok_or_else(|| {
                syn::Error::new_spanned(
                    variant_name,
                    format!(
                        "Missing #[router(handler = path::to::handler)] attribute on variant {}",
                        variant_name
                    ),
                )
            })?;

            let (pattern, extra) = match &variant.fields {
                Fields::Unit => (quote! { #enum_name::#variant_name }, quote! {}),
                Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                    (quote! { #enum_name::#variant_name(args) }, quote! { , args })
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "CommandRouter supports unit variants and single-field tuple variants",
                    ))
                }
            };

            Ok(match args.plugin {
                None => quote! {
                    #pattern => #handler(state #extra).await.into_response(),
                },
                Some(plugin) => quote! {
                    #pattern => match cloudctl::load_plugin(&state, #plugin).await {
                        Ok(handle) => #handler(state, handle #extra).await.into_response(),
                        Err(err) => cloudctl::CliResult::<()>::Err(err).into_response(),
                    },
                },
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #enum_name {
            pub async fn execute(self, state: cloudctl::State<#state_type>) -> cloudctl::Response {
                use cloudctl::IntoResponse;

                match self {
                    #(#match_arms)*
                }
            }
        }
    })
}

#[derive(Default)]
struct RouterArgs {
    state: Option<Type>,
    handler: Option<Path>,
    plugin: Option<String>,
}

/// Collect `#[router(key = value, ...)]` pairs from `attrs`
fn router_args(attrs: &[Attribute]) -> syn::Result<RouterArgs> {
    let mut args = RouterArgs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("router")) {
        let pairs =
            attr.parse_args_with(Punctuated::<MetaNameValue, Token![,]>::parse_terminated)?;

        for pair in pairs {
            let key = pair.path.get_ident().map(|i| i.to_string());
            match (key.as_deref(), pair.value) {
                (Some("state"), Expr::Path(expr)) => {
                    args.state = Some(Type::Path(TypePath {
                        qself: None,
                        path: expr.path,
                    }));
                }
                (Some("handler"), Expr::Path(expr)) => args.handler = Some(expr.path),
                (
                    Some("plugin"),
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(name),
                        ..
                    }),
                ) => args.plugin = Some(name.value()),
                _ => {
                    return Err(syn::Error::new_spanned(
                        &pair.path,
                        "expected `state = Type`, `handler = path` or `plugin = \"name\"`",
                    ))
                }
            }
        }
    }

    Ok(args)
}
