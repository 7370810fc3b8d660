use super::BoundOperation;
use crate::core::{Result, Value};
use crate::result::Output;

/// Render, query, decode into the declared return shape.
pub(super) async fn fetch<R: Output>(op: &BoundOperation, values: &[Value]) -> Result<R> {
    let rendered = op.render(values)?;
    let result = op.handle.query(&rendered.sql, &rendered.binds).await?;
    R::decode(result)
}
