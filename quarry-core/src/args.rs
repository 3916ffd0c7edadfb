use crate::statement::{BindMode, ParsedSql};
use crate::template::Env;
use crate::{AsValue, Error, Record, Result, Value};
use std::collections::HashMap;

/// Bind-time description of a member's input shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsShape {
    None,
    Positional(usize),
    Named,
    Batch,
}

/// Call-time arguments, classified.
pub enum Args {
    None,
    Positional(Vec<Value>),
    Record(Box<dyn Record>),
    Map(HashMap<String, Value>),
    Batch(Vec<Box<dyn Record>>),
}

/// Conversion from a call's inputs into [`Args`]. Implemented for `()`,
/// value tuples, mappings, records (via `#[derive(Record)]`) and `Vec` of
/// records.
pub trait IntoArgs: Send {
    const SHAPE: ArgsShape;
    fn into_args(self) -> Args;
}

impl IntoArgs for () {
    const SHAPE: ArgsShape = ArgsShape::None;
    fn into_args(self) -> Args {
        Args::None
    }
}

macro_rules! impl_into_args_tuple {
    ($count:expr $(, $ty:ident : $idx:tt)+) => {
        impl<$($ty,)+> IntoArgs for ($($ty,)+)
        where
            $($ty: AsValue + Send,)+
        {
            const SHAPE: ArgsShape = ArgsShape::Positional($count);
            fn into_args(self) -> Args {
                Args::Positional(vec![$(self.$idx.as_value(),)+])
            }
        }
    };
}

impl_into_args_tuple!(1, T1: 0);
impl_into_args_tuple!(2, T1: 0, T2: 1);
impl_into_args_tuple!(3, T1: 0, T2: 1, T3: 2);
impl_into_args_tuple!(4, T1: 0, T2: 1, T3: 2, T4: 3);
impl_into_args_tuple!(5, T1: 0, T2: 1, T3: 2, T4: 3, T5: 4);
impl_into_args_tuple!(6, T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5);
impl_into_args_tuple!(7, T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6);
impl_into_args_tuple!(8, T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6, T8: 7);

impl<V: AsValue + Send> IntoArgs for HashMap<String, V> {
    const SHAPE: ArgsShape = ArgsShape::Named;
    fn into_args(self) -> Args {
        Args::Map(self.into_iter().map(|(k, v)| (k, v.as_value())).collect())
    }
}

impl<R: Record + 'static> IntoArgs for Vec<R> {
    const SHAPE: ArgsShape = ArgsShape::Batch;
    fn into_args(self) -> Args {
        Args::Batch(
            self.into_iter()
                .map(|r| Box::new(r) as Box<dyn Record>)
                .collect(),
        )
    }
}

impl Args {
    /// Resolve one named parameter from the single structured argument.
    pub(crate) fn named(&self, id: &str, name: &str) -> Result<Value> {
        let found = match self {
            Args::Record(r) => r.lookup(name),
            Args::Map(m) => m.get(name).cloned(),
            _ => None,
        };
        found.ok_or_else(|| Error::UnresolvedParameter {
            id: id.to_string(),
            name: name.to_string(),
        })
    }
}

/// Template-evaluation environment over call arguments: `_N` for positional
/// values, parameter names for records and mappings.
pub(crate) struct ArgsEnv<'a>(pub &'a Args);

impl Env for ArgsEnv<'_> {
    fn get(&self, name: &str) -> Option<Value> {
        match self.0 {
            Args::Positional(values) => name
                .strip_prefix('_')?
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .and_then(|n| values.get(n - 1).cloned()),
            Args::Record(r) => r.lookup(name),
            Args::Map(m) => m.get(name).cloned(),
            Args::None | Args::Batch(_) => None,
        }
    }
}

pub(crate) struct RecordEnv<'a>(pub &'a dyn Record);

impl Env for RecordEnv<'_> {
    fn get(&self, name: &str) -> Option<Value> {
        self.0.lookup(name)
    }
}

/// Build the driver-level parameter vector for one call.
pub(crate) fn bind_vector(parsed: &ParsedSql, args: &Args) -> Result<Vec<Value>> {
    let mut vector = Vec::with_capacity(parsed.vars.len());
    match parsed.bind {
        BindMode::None => {}
        BindMode::Auto => {
            let Args::Positional(values) = args else {
                return Err(Error::shape(&parsed.id, "auto binding needs positional arguments"));
            };
            for (i, _) in parsed.vars.iter().enumerate() {
                let value = values.get(i).cloned().ok_or_else(|| {
                    Error::shape(&parsed.id, format!("missing positional argument {}", i + 1))
                })?;
                vector.push(value);
            }
        }
        BindMode::Seq => {
            let Args::Positional(values) = args else {
                return Err(Error::shape(&parsed.id, "seq binding needs positional arguments"));
            };
            for name in &parsed.vars {
                let seq: usize = name.parse().unwrap_or(0);
                let value = seq
                    .checked_sub(1)
                    .and_then(|i| values.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        Error::shape(&parsed.id, format!("missing positional argument {}", seq))
                    })?;
                vector.push(value);
            }
        }
        BindMode::Named => {
            for name in &parsed.vars {
                vector.push(args.named(&parsed.id, name)?);
            }
        }
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::parse_sql;

    struct Person {
        id: String,
        age: i64,
    }

    impl Record for Person {
        fn lookup(&self, param: &str) -> Option<Value> {
            if crate::name_matches("id", None, param) {
                Some(self.id.clone().as_value())
            } else if crate::name_matches("age", None, param) {
                Some(self.age.as_value())
            } else {
                None
            }
        }
    }

    #[test]
    fn auto_vector_by_occurrence() {
        let parsed = parse_sql("x", "select 1 from t where a=: and b=:").unwrap();
        let args = ("p".to_string(), 7i64).into_args();
        let vector = bind_vector(&parsed, &args).unwrap();
        assert_eq!(vector, vec![Value::from("p"), Value::Int64(Some(7))]);
    }

    #[test]
    fn seq_vector_by_index() {
        let parsed = parse_sql("x", "select 1 from t where a=:2 and b=:1 and c=:2").unwrap();
        let args = ("first".to_string(), "second".to_string()).into_args();
        let vector = bind_vector(&parsed, &args).unwrap();
        assert_eq!(
            vector,
            vec![
                Value::from("second"),
                Value::from("first"),
                Value::from("second")
            ]
        );
    }

    #[test]
    fn named_vector_from_record() {
        let parsed = parse_sql("add", "insert into person(id, age) values(:id, :age)").unwrap();
        let args = Args::Record(Box::new(Person {
            id: "300".into(),
            age: 300,
        }));
        let vector = bind_vector(&parsed, &args).unwrap();
        assert_eq!(vector, vec![Value::from("300"), Value::Int64(Some(300))]);
    }

    #[test]
    fn named_vector_from_map() {
        let parsed = parse_sql("add", "insert into t(a, b) values(:a, :b)").unwrap();
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1i64);
        map.insert("b".to_string(), 2i64);
        let args = map.into_args();
        let vector = bind_vector(&parsed, &args).unwrap();
        assert_eq!(vector, vec![Value::Int64(Some(1)), Value::Int64(Some(2))]);
    }

    #[test]
    fn named_duplicates_bind_twice() {
        let parsed = parse_sql("x", "select 1 from t where a=:id or b=:id").unwrap();
        let args = Args::Record(Box::new(Person {
            id: "7".into(),
            age: 0,
        }));
        let vector = bind_vector(&parsed, &args).unwrap();
        assert_eq!(vector.len(), 2);
    }

    #[test]
    fn unresolved_named_parameter() {
        let parsed = parse_sql("x", "select 1 from t where a=:missing").unwrap();
        let args = Args::Record(Box::new(Person {
            id: "7".into(),
            age: 0,
        }));
        let err = bind_vector(&parsed, &args).unwrap_err();
        assert!(matches!(err, Error::UnresolvedParameter { ref name, .. } if name == "missing"));
    }

    #[test]
    fn positional_env_exposes_underscore_names() {
        let args = ("x".to_string(), 42i64).into_args();
        let env = ArgsEnv(&args);
        assert_eq!(env.get("_1"), Some(Value::from("x")));
        assert_eq!(env.get("_2"), Some(Value::Int64(Some(42))));
        assert_eq!(env.get("_3"), None);
        assert_eq!(env.get("name"), None);
    }
}
