// ============================================================================
// sqlbind Library
// ============================================================================
//
// Binds named SQL templates to operation fields of application structs.
//
// ```ignore
// use sqlbind::{Binder, Db, Mapper, Op, Record};
//
// #[derive(Record, Clone)]
// struct User { id: i64, name: String }
//
// #[derive(Mapper)]
// #[sqlbind(type_name = "User")]
// struct UserDao {
//     db: Db,
//     #[sqlbind(name = "FindByName")]
//     find_by_name: Op<(String,), Vec<User>>,
// }
//
// let mut binder = Binder::new();
// binder.scan_dir("sql")?;
// binder.map(&mut dao)?;
// let users = dao.find_by_name.call(("bar".to_string(),)).await?;
// ```

// Derived code refers to `::sqlbind::...`, which has to resolve in here too.
extern crate self as sqlbind;

pub mod binder;
pub mod cache;
pub mod connection;
pub mod core;
pub mod executor;
pub mod interface;
pub mod result;
pub mod storage;
pub mod template;

// Re-export main types for convenience
pub use binder::{Arguments, Binder, BinderConfig, CacheField, Mapper, Op, OperationVisitor, Param};
pub use cache::{LruQueryCache, MemoryCache, QueryCache};
pub use core::{BindError, PlaceholderStyle, Result, StatementKind, Value};
pub use interface::{Db, SqlHandle};
pub use result::{ExecResult, FromRow, FromValue, Output, QueryResult, Record, RowRef};
pub use storage::{DefinitionSource, DefinitionStore};
pub use template::{BindContext, RenderedQuery};

// Derive macros live in the macro namespace, next to the traits they implement
pub use sqlbind_derive::{Mapper, Record};
