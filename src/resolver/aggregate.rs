//! Ordered settle-all over many pending reads.
//!
//! Every operation is driven to completion, success or failure, and results
//! come back in input order no matter which read finished first. Nothing is
//! spawned: the futures are polled together on the caller's task, with at most
//! `limit` in flight.

use futures_util::stream::{self, StreamExt};
use std::future::Future;
use tracing::warn;

use crate::errors::ResolveError;
use crate::value::Value;

/// Await all `ops`, keeping each outcome at its input position.
pub async fn settle_all<T, F, I>(ops: I, limit: usize) -> Vec<Result<T, ResolveError>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, ResolveError>>,
{
    let ops: Vec<F> = ops.into_iter().collect();
    if ops.is_empty() {
        return Vec::new();
    }
    let limit = if limit == 0 { ops.len() } else { limit };
    stream::iter(ops).buffered(limit).collect().await
}

/// Await all `ops`, replacing failures with their placeholder value.
///
/// Each failure is logged with its position and does not affect its siblings.
pub async fn fetch_all<F, I>(ops: I, limit: usize) -> Vec<Value>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<Value, ResolveError>>,
{
    settle_all(ops, limit)
        .await
        .into_iter()
        .enumerate()
        .map(|(position, outcome)| match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(position, error = %err, "storage read degraded to placeholder");
                placeholder(&err)
            }
        })
        .collect()
}

/// Value standing in for a failed resolution.
pub fn placeholder(err: &ResolveError) -> Value {
    match err {
        ResolveError::Unsupported(reason) => Value::Skipped(reason.clone()),
        _ => Value::Empty,
    }
}
