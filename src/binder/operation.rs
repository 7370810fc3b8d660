use super::args::Arguments;
use super::mapper::OperationSlot;
use crate::core::{BindError, Result, StatementKind};
use crate::executor::BoundOperation;
use crate::result::{Output, ReturnShape};
use crate::storage::StatementDefinition;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// An operation field: takes the argument tuple `A`, returns `R`.
///
/// Starts out unbound; [`Binder::map`](super::Binder::map) installs the
/// statement of the same name. Cloning shares the bound statement.
pub struct Op<A, R> {
    bound: Option<Arc<BoundOperation>>,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R> Op<A, R> {
    pub fn new() -> Self {
        Self {
            bound: None,
            _marker: PhantomData,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The statement this operation runs, once bound.
    pub fn statement(&self) -> Option<&StatementDefinition> {
        self.bound.as_deref().map(BoundOperation::statement)
    }

    fn bound(&self) -> Result<&BoundOperation> {
        self.bound
            .as_deref()
            .ok_or_else(|| BindError::Unbound(std::any::type_name::<Self>().to_string()))
    }
}

impl<A: Arguments, R: Output> Op<A, R> {
    pub async fn call(&self, mut args: A) -> Result<R> {
        self.call_mut(&mut args).await
    }

    /// Like [`call`](Self::call), but an insert writes the generated
    /// identity back into the first argument.
    pub async fn call_mut(&self, args: &mut A) -> Result<R> {
        self.bound()?.invoke(args).await
    }
}

impl<A, R> Default for Op<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> Clone for Op<A, R> {
    fn clone(&self) -> Self {
        Self {
            bound: self.bound.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A, R> fmt::Debug for Op<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bound {
            Some(bound) => write!(f, "Op({})", bound.statement().name),
            None => write!(f, "Op(unbound)"),
        }
    }
}

impl<A: Arguments, R: Output> OperationSlot for Op<A, R> {
    fn arity(&self) -> usize {
        A::ARITY
    }

    fn shape(&self) -> ReturnShape {
        R::shape()
    }

    fn accepts(&self, kind: StatementKind) -> bool {
        R::accepts(kind)
    }

    fn columns(&self) -> Vec<&'static str> {
        R::columns()
    }

    fn return_type(&self) -> &'static str {
        std::any::type_name::<R>()
    }

    fn install(&mut self, operation: Arc<BoundOperation>) {
        self.bound = Some(operation);
    }
}
