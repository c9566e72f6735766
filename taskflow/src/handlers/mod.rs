//! Named action backends.
//!
//! A unit that references a handler by name (`uses`) is dispatched through
//! the [`HandlerRegistry`] handed to the executor. Resolution happens when the
//! unit runs, so handlers may be registered after units are declared.

mod registry;
mod schema;

pub use registry::{HandlerDescriptor, HandlerRegistry};
pub use schema::{InputSchema, InputSpec, OutputSchema, ValueKind};

use crate::context::UnitContext;
use crate::core::ActionResult;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Trait for action backends.
#[async_trait]
pub trait Handler: Send + Sync + Debug {
    /// Runs the action.
    ///
    /// Inputs have already been validated and defaults filled; they are
    /// available through [`UnitContext::inputs`].
    async fn run(&self, ctx: UnitContext) -> ActionResult;
}

/// A handler backed by an async closure.
pub struct FnHandler<F, Fut>
where
    F: Fn(UnitContext) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult> + Send,
{
    name: String,
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(UnitContext) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult> + Send,
{
    /// Creates a new closure-backed handler.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for FnHandler<F, Fut>
where
    F: Fn(UnitContext) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F, Fut>
where
    F: Fn(UnitContext) -> Fut + Send + Sync,
    Fut: Future<Output = ActionResult> + Send,
{
    async fn run(&self, ctx: UnitContext) -> ActionResult {
        (self.func)(ctx).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn run(&self, ctx: UnitContext) -> ActionResult {
        (**self).run(ctx).await
    }
}
