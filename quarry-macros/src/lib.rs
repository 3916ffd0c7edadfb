mod dao;
mod record;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemStruct};

/// Derives the binding machinery for a structured argument / result record:
/// `Record` (named parameter lookup and field-SQL contributions), `FromRow`
/// (column-to-field materialisation), `IntoArgs` and a single-record
/// `Outcome`.
///
/// Field attributes:
/// - `#[dao(name = "col")]` — match override for parameter and column names.
/// - `#[dao(sql = "fragment")]` — optional field-SQL tail, spliced when the
///   field is non-zero.
///
/// A field of type `Limit` (or `Option<Limit>`) contributes its fragment
/// verbatim with offset and length values.
#[proc_macro_derive(Record, attributes(dao))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    record::derive_record(&item).into()
}

/// Derives `Dao` for an access object: a struct of `Stmt` members. Binding
/// resolves each member's SQL (inline `#[sql("...")]`, or the registry under
/// `#[sql_name("...")]` / the field's own name), classifies it, checks the
/// member's input/output shape, and installs the synthesised executor.
///
/// A field of type `ErrorSink` is wired to the shared error sink.
#[proc_macro_derive(Dao, attributes(sql, sql_name, dao))]
pub fn derive_dao(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    dao::derive_dao(&item).into()
}
