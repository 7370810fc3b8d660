use crate::core::{BindError, Result, Value};
use crate::interface::SqlHandle;
use crate::result::{ExecResult, QueryResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Execute,
}

/// One statement received by a [`RecordingHandle`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub sql: String,
    pub binds: Vec<Value>,
}

#[derive(Debug)]
enum Response {
    Rows(QueryResult),
    Exec(ExecResult),
    Error(String),
}

/// Error replayed by [`RecordingHandle::push_error`].
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ScriptedError(pub String);

/// Scripted [`SqlHandle`] for tests.
///
/// Every call is recorded. Responses are replayed in the order they were
/// queued; once the queue is empty, queries return no rows and executes
/// report zero affected rows.
#[derive(Debug, Default)]
pub struct RecordingHandle {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<Response>>,
}

impl RecordingHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, result: QueryResult) -> Result<()> {
        self.responses.lock()?.push_back(Response::Rows(result));
        Ok(())
    }

    pub fn push_exec(&self, result: ExecResult) -> Result<()> {
        self.responses.lock()?.push_back(Response::Exec(result));
        Ok(())
    }

    pub fn push_error(&self, message: &str) -> Result<()> {
        self.responses
            .lock()?
            .push_back(Response::Error(message.to_string()));
        Ok(())
    }

    pub fn calls(&self) -> Result<Vec<RecordedCall>> {
        Ok(self.calls.lock()?.clone())
    }

    pub fn call_count(&self) -> Result<usize> {
        Ok(self.calls.lock()?.len())
    }

    pub fn last_call(&self) -> Result<Option<RecordedCall>> {
        Ok(self.calls.lock()?.last().cloned())
    }

    fn record(&self, kind: CallKind, sql: &str, binds: &[Value]) -> Result<Option<Response>> {
        trace!(?kind, sql, "recorded call");
        self.calls.lock()?.push(RecordedCall {
            kind,
            sql: sql.to_string(),
            binds: binds.to_vec(),
        });
        Ok(self.responses.lock()?.pop_front())
    }
}

#[async_trait]
impl SqlHandle for RecordingHandle {
    async fn query(&self, sql: &str, binds: &[Value]) -> Result<QueryResult> {
        match self.record(CallKind::Query, sql, binds)? {
            Some(Response::Rows(result)) => Ok(result),
            Some(Response::Error(message)) => Err(BindError::database(ScriptedError(message))),
            Some(Response::Exec(_)) => Err(BindError::database(ScriptedError(
                "query received an execute response".to_string(),
            ))),
            None => Ok(QueryResult::empty()),
        }
    }

    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ExecResult> {
        match self.record(CallKind::Execute, sql, binds)? {
            Some(Response::Exec(result)) => Ok(result),
            Some(Response::Error(message)) => Err(BindError::database(ScriptedError(message))),
            Some(Response::Rows(_)) => Err(BindError::database(ScriptedError(
                "execute received a rows response".to_string(),
            ))),
            None => Ok(ExecResult::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let handle = RecordingHandle::new();
        handle.push_exec(ExecResult::new(2, Some(9))).unwrap();
        handle.push_error("boom").unwrap();

        let exec = handle.execute("delete", &[Value::Integer(1)]).await.unwrap();
        assert_eq!(exec.rows_affected, 2);

        let err = handle.query("select", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Database error: boom");

        assert!(handle.query("select", &[]).await.unwrap().is_empty());
        assert_eq!(handle.call_count().unwrap(), 3);
        assert_eq!(
            handle.calls().unwrap()[0],
            RecordedCall {
                kind: CallKind::Execute,
                sql: "delete".to_string(),
                binds: vec![Value::Integer(1)],
            }
        );
    }
}
