use crate::core::{Result, Value};
use crate::result::{ExecResult, QueryResult};
use async_trait::async_trait;
use std::sync::Arc;

/// The database handle a mapped struct carries in its `db` field.
///
/// Implement this for a real driver (usually around its connection pool).
/// Statements arrive fully rendered: `sql` holds placeholders and `binds`
/// the values for them, in order.
#[async_trait]
pub trait SqlHandle: Send + Sync {
    /// Run a statement that returns rows (SELECT).
    async fn query(&self, sql: &str, binds: &[Value]) -> Result<QueryResult>;

    /// Run a statement that modifies data (INSERT, UPDATE, DELETE).
    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ExecResult>;
}

/// Shared handle, cloned into every bound operation.
pub type Db = Arc<dyn SqlHandle>;
