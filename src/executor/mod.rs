//! The body of a bound operation: render, run against the handle, decode.

mod cache;
mod read;
mod write;

use crate::binder::{Arguments, BinderConfig};
use crate::cache::QueryCache;
use crate::core::{Result, StatementKind, Value};
use crate::interface::Db;
use crate::result::Output;
use crate::storage::StatementDefinition;
use crate::template::{FunctionRegistry, RenderedQuery, Scope, Template};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a bound operation needs at call time. Shared by every clone
/// of the operation field and never mutated.
pub struct BoundOperation {
    pub(crate) owner_key: String,
    pub(crate) table: String,
    /// Backtick-quoted column list of the return type's record
    pub(crate) fields: String,
    pub(crate) statement: Arc<StatementDefinition>,
    pub(crate) template: Arc<Template>,
    pub(crate) handle: Db,
    pub(crate) functions: Arc<FunctionRegistry>,
    pub(crate) config: BinderConfig,
    pub(crate) cache_scope: String,
    /// Set on read operations of a cache-wrapped instance only
    pub(crate) cache: Option<Arc<dyn QueryCache>>,
}

impl BoundOperation {
    pub fn statement(&self) -> &StatementDefinition {
        &self.statement
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub(crate) async fn invoke<A: Arguments, R: Output>(&self, args: &mut A) -> Result<R> {
        let values = args.to_values();
        match (self.statement.kind, &self.cache) {
            (StatementKind::Read, Some(cache)) => cache::read_through(self, &**cache, values).await,
            (StatementKind::Read, None) => read::fetch(self, &values).await,
            (StatementKind::Insert, _) => write::insert(self, args, &values).await,
            (StatementKind::Execute, _) => write::execute(self, &values).await,
        }
    }

    /// Render the statement with the call's argument values.
    pub(crate) fn render(&self, values: &[Value]) -> Result<RenderedQuery> {
        let scope = build_scope(&self.statement.arg_names, values.to_vec(), &self.table, &self.fields);
        let rendered = self
            .template
            .render(&scope, &self.functions, self.config.placeholder)?;

        if self.config.show_sql {
            info!(statement = %self.cache_scope, sql = %rendered.sql, binds = ?rendered.binds, "rendered");
        } else {
            debug!(statement = %self.cache_scope, sql = %rendered.sql, binds = ?rendered.binds, "rendered");
        }
        Ok(rendered)
    }
}

impl fmt::Debug for BoundOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundOperation")
            .field("owner_key", &self.owner_key)
            .field("statement", &self.statement.name)
            .field("kind", &self.statement.kind)
            .field("table", &self.table)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

/// Template variables of one call: the declared argument names zipped with
/// the values, then `table` and `fields`, which win over arguments of the
/// same name.
pub(crate) fn build_scope(arg_names: &[String], values: Vec<Value>, table: &str, fields: &str) -> Scope {
    let mut scope: Scope = arg_names.iter().cloned().zip(values).collect();
    scope.insert("table".to_string(), Value::Text(table.to_string()));
    scope.insert("fields".to_string(), Value::Text(fields.to_string()));
    scope
}
