use super::BoundOperation;
use crate::binder::Arguments;
use crate::core::{Result, Value};
use crate::result::Output;
use tracing::debug;

pub(super) async fn insert<A: Arguments, R: Output>(
    op: &BoundOperation,
    args: &mut A,
    values: &[Value],
) -> Result<R> {
    let rendered = op.render(values)?;
    let result = op.handle.execute(&rendered.sql, &rendered.binds).await?;

    if let Some(id) = result.last_insert_id {
        if args.assign_identity(id) {
            debug!(statement = %op.cache_scope, id, "assigned generated identity");
        }
    }
    R::from_affected(result.rows_affected)
}

pub(super) async fn execute<R: Output>(op: &BoundOperation, values: &[Value]) -> Result<R> {
    let rendered = op.render(values)?;
    let result = op.handle.execute(&rendered.sql, &rendered.binds).await?;
    R::from_affected(result.rows_affected)
}
