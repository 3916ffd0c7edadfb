use proc_macro2::TokenStream;
use quote::quote;
use syn::{Field, ItemStruct, LitStr, Type};

enum Member {
    Stmt {
        ident: syn::Ident,
        sql: Option<String>,
        sql_name: Option<String>,
        attrs: Vec<(String, String)>,
    },
    ErrorSink {
        ident: syn::Ident,
    },
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn decode_member(field: &Field) -> Member {
    let ident = field.ident.clone().expect("Dao derive needs named fields");
    match type_name(&field.ty).as_str() {
        "Stmt" => {}
        "ErrorSink" => return Member::ErrorSink { ident },
        other => panic!(
            "field `{}` has type `{}`: access-object members must be Stmt handles or an ErrorSink",
            ident, other
        ),
    }
    let mut sql = None;
    let mut sql_name = None;
    let mut attrs = Vec::new();
    for attr in &field.attrs {
        if attr.path().is_ident("sql") {
            let value: LitStr = attr
                .parse_args()
                .unwrap_or_else(|e| panic!("bad #[sql] on `{}`: {}", ident, e));
            sql = Some(value.value());
        } else if attr.path().is_ident("sql_name") {
            let value: LitStr = attr
                .parse_args()
                .unwrap_or_else(|e| panic!("bad #[sql_name] on `{}`: {}", ident, e));
            sql_name = Some(value.value());
        } else if attr.path().is_ident("dao") {
            let result = attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .map(|i| i.to_string())
                    .ok_or_else(|| meta.error("expected `key = \"value\"`"))?;
                let value = meta.value()?.parse::<LitStr>()?.value();
                attrs.push((key, value));
                Ok(())
            });
            if let Err(e) = result {
                panic!("bad #[dao] attribute on `{}`: {}", ident, e);
            }
        }
    }
    Member::Stmt {
        ident,
        sql,
        sql_name,
        attrs,
    }
}

pub(crate) fn derive_dao(item: &ItemStruct) -> TokenStream {
    let name = &item.ident;
    if !item.generics.params.is_empty() {
        panic!("Dao cannot be derived for generic structs");
    }
    let members: Vec<Member> = item.fields.iter().map(decode_member).collect();

    let decls = members.iter().filter_map(|m| match m {
        Member::Stmt {
            ident,
            sql,
            sql_name,
            attrs,
        } => {
            let member_name = ident.to_string();
            let sql = option_tokens(sql);
            let sql_name = option_tokens(sql_name);
            let attrs = attrs.iter().map(|(k, v)| quote!((#k, #v)));
            Some(quote! {
                ::quarry::MemberDecl {
                    name: #member_name,
                    sql: #sql,
                    sql_name: #sql_name,
                    attrs: &[#(#attrs),*],
                },
            })
        }
        Member::ErrorSink { .. } => None,
    });

    let inits = members.iter().map(|m| match m {
        Member::Stmt { ident, .. } => {
            let member_name = ident.to_string();
            quote! { #ident: ctx.stmt(#member_name, MEMBERS)?, }
        }
        Member::ErrorSink { ident } => {
            quote! { #ident: ctx.error_sink(), }
        }
    });

    quote! {
        impl ::quarry::Dao for #name {
            fn bind(
                driver: ::std::sync::Arc<dyn ::quarry::Driver>,
                options: ::quarry::DaoOptions,
            ) -> ::quarry::Result<Self> {
                const MEMBERS: &[::quarry::MemberDecl] = &[
                    #(#decls)*
                ];
                let ctx = ::quarry::BindContext::new(driver, options);
                ::core::result::Result::Ok(Self {
                    #(#inits)*
                })
            }
        }
    }
}

fn option_tokens(value: &Option<String>) -> TokenStream {
    match value {
        Some(v) => quote!(::core::option::Option::Some(#v)),
        None => quote!(::core::option::Option::None),
    }
}
