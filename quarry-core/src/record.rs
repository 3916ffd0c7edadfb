use crate::Value;
use convert_case::{Case, Casing};

/// A structured named argument: resolves parameter names to values and may
/// carry optional field-SQL contributions.
///
/// Implemented by `#[derive(Record)]`.
pub trait Record: Send + Sync {
    /// Resolve a statement parameter to a value, by rename override, by
    /// case-insensitive field-name equality, or by the camel-cased form of
    /// the parameter.
    fn lookup(&self, param: &str) -> Option<Value>;

    /// Field-SQL tails contributed by non-zero annotated fields, in field
    /// declaration order.
    fn contributions(&self) -> Vec<FieldContribution> {
        Vec::new()
    }
}

/// An optional SQL tail spliced onto a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldContribution {
    pub sql: String,
    pub values: Vec<Value>,
    /// Glued with `WHERE`/`AND` when true; appended verbatim otherwise.
    pub joined: bool,
}

/// Offset/length pair appended verbatim as a `limit` tail. A zero `Limit`
/// contributes nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limit {
    pub offset: i64,
    pub length: i64,
}

impl Limit {
    pub const DEFAULT_FRAGMENT: &'static str = "limit ?,?";

    pub fn new(offset: i64, length: i64) -> Self {
        Limit { offset, length }
    }

    pub fn is_zero(&self) -> bool {
        *self == Limit::default()
    }

    /// Offset first, then length.
    pub fn values(&self) -> Vec<Value> {
        vec![Value::Int64(Some(self.offset)), Value::Int64(Some(self.length))]
    }
}

/// The field/column match rule: a rename annotation matches exactly; without
/// one the field matches the name case-insensitively, directly or through
/// camel-cased forms (`user_name` matches `UserName` and `username`).
pub fn name_matches(field: &str, rename: Option<&str>, name: &str) -> bool {
    if let Some(rename) = rename {
        return rename == name;
    }
    field.eq_ignore_ascii_case(name)
        || field
            .to_case(Case::Pascal)
            .eq_ignore_ascii_case(&name.to_case(Case::Pascal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_rule() {
        assert!(name_matches("id", None, "id"));
        assert!(name_matches("Id", None, "id"));
        assert!(name_matches("user_name", None, "user_name"));
        assert!(name_matches("UserName", None, "user_name"));
        assert!(name_matches("user_name", None, "UserName"));
        assert!(name_matches("user_name", None, "username"));
        assert!(!name_matches("age", None, "id"));
        assert!(name_matches("my_name", Some("name"), "name"));
        assert!(!name_matches("name", Some("other"), "name"));
    }

    #[test]
    fn limit_values_are_offset_then_length() {
        let l = Limit::new(20, 10);
        assert_eq!(
            l.values(),
            vec![Value::Int64(Some(20)), Value::Int64(Some(10))]
        );
        assert!(Limit::default().is_zero());
        assert!(!l.is_zero());
    }
}
