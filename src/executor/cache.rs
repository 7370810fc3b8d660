use super::{BoundOperation, read};
use crate::cache::{QueryCache, cache_key};
use crate::core::{Result, Value};
use crate::result::Output;
use std::sync::Arc;
use tracing::trace;

/// Read through the cache: a hit returns a clone of the stored value without
/// touching the handle, a successful miss stores a clone of the result.
pub(super) async fn read_through<R: Output>(
    op: &BoundOperation,
    cache: &dyn QueryCache,
    values: Vec<Value>,
) -> Result<R> {
    let key = cache_key(&values)?;

    if let Some(entry) = cache.get(&op.cache_scope, &key) {
        match entry.downcast_ref::<R>() {
            Some(value) => {
                trace!(scope = %op.cache_scope, key = %key, "cache hit");
                return Ok(value.clone());
            }
            None => trace!(scope = %op.cache_scope, key = %key, "cache entry of another type"),
        }
    } else {
        trace!(scope = %op.cache_scope, key = %key, "cache miss");
    }

    let value: R = read::fetch(op, &values).await?;
    cache.put(&op.cache_scope, &key, Arc::new(value.clone()));
    Ok(value)
}
