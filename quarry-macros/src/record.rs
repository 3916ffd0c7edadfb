use proc_macro2::TokenStream;
use quote::quote;
use syn::{Field, GenericArgument, ItemStruct, LitStr, PathArguments, Type};

pub(crate) struct FieldInfo {
    pub ident: syn::Ident,
    pub rename: Option<String>,
    pub sql: Option<String>,
    pub limit: LimitKind,
}

#[derive(PartialEq)]
pub(crate) enum LimitKind {
    Not,
    Plain,
    Optional,
}

pub(crate) fn field_info(field: &Field) -> FieldInfo {
    let ident = field
        .ident
        .clone()
        .expect("Record derive needs named fields");
    let mut rename = None;
    let mut sql = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("dao") {
            continue;
        }
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                rename = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("sql") {
                sql = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"` or `sql = \"...\"`"))
            }
        });
        if let Err(e) = result {
            panic!("bad #[dao] attribute on field `{}`: {}", ident, e);
        }
    }
    FieldInfo {
        ident,
        rename,
        sql,
        limit: limit_kind(&field.ty),
    }
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) => path.path.segments.last(),
        _ => None,
    }
}

fn limit_kind(ty: &Type) -> LimitKind {
    let Some(segment) = last_segment(ty) else {
        return LimitKind::Not;
    };
    if segment.ident == "Limit" {
        return LimitKind::Plain;
    }
    if segment.ident == "Option" {
        if let PathArguments::AngleBracketed(args) = &segment.arguments {
            if let Some(GenericArgument::Type(inner)) = args.args.first() {
                if last_segment(inner).is_some_and(|s| s.ident == "Limit") {
                    return LimitKind::Optional;
                }
            }
        }
    }
    LimitKind::Not
}

fn rename_tokens(rename: &Option<String>) -> TokenStream {
    match rename {
        Some(name) => quote!(::core::option::Option::Some(#name)),
        None => quote!(::core::option::Option::None),
    }
}

pub(crate) fn derive_record(item: &ItemStruct) -> TokenStream {
    let name = &item.ident;
    if !item.generics.params.is_empty() {
        panic!("Record cannot be derived for generic structs");
    }
    let fields: Vec<FieldInfo> = item.fields.iter().map(field_info).collect();

    let lookup_arms = fields
        .iter()
        .filter(|f| f.sql.is_none() && f.limit == LimitKind::Not)
        .map(|f| {
            let ident = &f.ident;
            let field_name = ident.to_string();
            let rename = rename_tokens(&f.rename);
            quote! {
                if ::quarry::name_matches(#field_name, #rename, param) {
                    return ::core::option::Option::Some(::quarry::AsValue::as_value(
                        ::core::clone::Clone::clone(&self.#ident),
                    ));
                }
            }
        });

    let contribution_stmts = fields
        .iter()
        .filter(|f| f.sql.is_some() || f.limit != LimitKind::Not)
        .map(|f| {
            let ident = &f.ident;
            match f.limit {
                LimitKind::Not => {
                    let fragment = f.sql.as_ref().expect("checked by filter");
                    quote! {
                        if !::quarry::AsValue::is_zero(&self.#ident) {
                            out.push(::quarry::FieldContribution {
                                sql: #fragment.to_string(),
                                values: ::std::vec![::quarry::AsValue::as_value(
                                    ::core::clone::Clone::clone(&self.#ident),
                                )],
                                joined: true,
                            });
                        }
                    }
                }
                LimitKind::Plain => {
                    let fragment = limit_fragment(&f.sql);
                    quote! {
                        if !self.#ident.is_zero() {
                            out.push(::quarry::FieldContribution {
                                sql: #fragment.to_string(),
                                values: self.#ident.values(),
                                joined: false,
                            });
                        }
                    }
                }
                LimitKind::Optional => {
                    let fragment = limit_fragment(&f.sql);
                    quote! {
                        if let ::core::option::Option::Some(limit) = &self.#ident {
                            if !limit.is_zero() {
                                out.push(::quarry::FieldContribution {
                                    sql: #fragment.to_string(),
                                    values: limit.values(),
                                    joined: false,
                                });
                            }
                        }
                    }
                }
            }
        });

    let scan_chain = fields
        .iter()
        .filter(|f| f.sql.is_none() && f.limit == LimitKind::Not)
        .rev()
        .fold(quote! {}, |acc, f| {
            let ident = &f.ident;
            let field_name = ident.to_string();
            let rename = rename_tokens(&f.rename);
            quote! {
                if ::quarry::name_matches(#field_name, #rename, __name) {
                    out.#ident = ::quarry::scan_value(::core::clone::Clone::clone(__value))?;
                } else {
                    #acc
                }
            }
        });

    quote! {
        impl ::quarry::Record for #name {
            fn lookup(&self, param: &str) -> ::core::option::Option<::quarry::Value> {
                #(#lookup_arms)*
                ::core::option::Option::None
            }

            fn contributions(&self) -> ::std::vec::Vec<::quarry::FieldContribution> {
                let mut out = ::std::vec::Vec::new();
                #(#contribution_stmts)*
                out
            }
        }

        impl ::quarry::FromRow for #name {
            fn from_row(row: &::quarry::RowLabeled) -> ::quarry::Result<Self> {
                let mut out = <#name as ::core::default::Default>::default();
                for (__name, __value) in ::std::iter::zip(row.labels.iter(), row.values.iter()) {
                    #scan_chain
                }
                ::core::result::Result::Ok(out)
            }
        }

        impl ::quarry::IntoArgs for #name {
            const SHAPE: ::quarry::ArgsShape = ::quarry::ArgsShape::Named;
            fn into_args(self) -> ::quarry::Args {
                ::quarry::Args::Record(::std::boxed::Box::new(self))
            }
        }

        impl ::quarry::Outcome for #name {
            const KIND: ::quarry::OutKind = ::quarry::OutKind::One;
            async fn materialize(
                rows: ::quarry::RowStream<'_>,
                cx: &::quarry::MaterializeCx<'_>,
            ) -> ::quarry::Result<Self> {
                ::quarry::materialize_one(rows, cx).await
            }
        }
    }
}

fn limit_fragment(sql: &Option<String>) -> TokenStream {
    match sql {
        Some(fragment) => quote!(#fragment),
        None => quote!(::quarry::Limit::DEFAULT_FRAGMENT),
    }
}
