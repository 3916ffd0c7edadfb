//! Declarative data-access runtime.
//!
//! Declare an access object as a struct of typed statement handles, annotate
//! each member with its SQL (inline or by name in a dot-SQL registry), and
//! bind it against a database handle. The runtime classifies each statement's
//! binding discipline, evaluates dynamic SQL templates per call, binds the
//! parameter vector from the call's arguments, and materialises rows into the
//! declared result shape.
//!
//! ```ignore
//! #[derive(Debug, Default, Clone, PartialEq, Record)]
//! struct Person {
//!     id: String,
//!     age: i64,
//! }
//!
//! #[derive(Dao)]
//! struct PersonDao {
//!     #[sql("insert into person(id, age) values(:id, :age)")]
//!     add: Stmt<Person, ()>,
//!     #[sql("select id, age from person where id = :1")]
//!     find: Stmt<(String,), Person>,
//!     errors: ErrorSink,
//! }
//!
//! let dao = PersonDao::bind(driver, DaoOptions::new())?;
//! dao.add.call(Person { id: "100".into(), age: 100 }).await?;
//! let person = dao.find.call(("100".into(),)).await?;
//! ```

pub use quarry_core::*;
pub use quarry_macros::{Dao, Record};
