//! Callback dispatch after a successful parse.
//!
//! The parse itself is synchronous; sync executors run inline on the
//! caller's thread. Async executors return a boxed future that the caller
//! awaits — the core never schedules concurrency.

use crate::result::ParseResult;
use crate::token::Value;
use std::future::Future;
use std::pin::Pin;

#[derive(Debug, thiserror::Error)]
#[error("executor failed: {reason}")]
pub struct ExecuteError {
    pub reason: String,
}

impl ExecuteError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Synchronous callback bound to a command.
pub trait Executor: Send + Sync {
    fn execute(&self, result: &ParseResult) -> Result<Value, ExecuteError>;
}

impl<F> Executor for F
where
    F: Fn(&ParseResult) -> Result<Value, ExecuteError> + Send + Sync,
{
    fn execute(&self, result: &ParseResult) -> Result<Value, ExecuteError> {
        self(result)
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Asynchronous callback bound to a command. The returned future is
/// awaited by the caller, not by the parser.
pub trait AsyncExecutor: Send + Sync {
    fn execute<'a>(&'a self, result: &'a ParseResult) -> BoxFuture<'a, Result<Value, ExecuteError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_executors() {
        let exec = |result: &ParseResult| {
            result
                .main_args
                .get("foo")
                .cloned()
                .ok_or_else(|| ExecuteError::new("foo missing"))
        };
        let mut result = ParseResult::default();
        assert!(exec.execute(&result).is_err());
        result.main_args.insert("foo".into(), Value::Int(1));
        assert_eq!(exec.execute(&result).unwrap(), Value::Int(1));
    }
}
