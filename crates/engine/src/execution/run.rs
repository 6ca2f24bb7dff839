//! Starting tasks: argument coercion, resolver invocation and materialization of the raw value
//! into something value completion can consume.

use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use error::GraphqlError;
use futures_util::{
    future::{self, BoxFuture},
    stream::{self, BoxStream},
    FutureExt, StreamExt,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{
    context::OperationContext,
    task::{ExecutionTask, ResolverTask},
};
use crate::{
    operation::Selection,
    resolver::{LazyList, ResolvedValue, Resolver},
    response::ResponsePath,
};

/// What a task produced, handed back to the execution for completion.
pub(crate) enum TaskOutcome {
    /// Raw value to complete, and the remainder of a `@stream` field to deliver later.
    Value(ResolvedValue, Option<BoxStream<'static, ResolvedValue>>),
    Failed(GraphqlError),
    /// The operation was cancelled: nothing is written and nothing is reported.
    Cancelled,
    /// Outcomes of the children of a batch, in order.
    Batch(Vec<TaskOutcome>),
}

impl TaskOutcome {
    fn or_cancelled(self, cancellation: &CancellationToken) -> Self {
        match self {
            TaskOutcome::Failed(_) if cancellation.is_cancelled() => TaskOutcome::Cancelled,
            outcome => outcome,
        }
    }
}

pub(super) enum Started {
    Completed(TaskOutcome),
    Pending(BoxFuture<'static, TaskOutcome>),
}

pub(super) fn start(ctx: &OperationContext, task: &mut ExecutionTask) -> Started {
    task.mark_running();
    match task {
        ExecutionTask::Pure(task) => start_resolver(ctx, task, true),
        ExecutionTask::Parallel(task) | ExecutionTask::Serial(task) => start_resolver(ctx, task, false),
        ExecutionTask::Batch(batch) => start_batch(ctx, &mut batch.children),
    }
}

/// Pure children complete right away. If any child is asynchronous the whole batch is, and
/// completes once all of its children did.
fn start_batch(ctx: &OperationContext, children: &mut [ExecutionTask]) -> Started {
    let started = children.iter_mut().map(|child| start(ctx, child)).collect::<Vec<_>>();
    if started.iter().all(|started| matches!(started, Started::Completed(_))) {
        let outcomes = started
            .into_iter()
            .filter_map(|started| match started {
                Started::Completed(outcome) => Some(outcome),
                Started::Pending(_) => None,
            })
            .collect();
        return Started::Completed(TaskOutcome::Batch(outcomes));
    }

    let futures = started.into_iter().map(|started| match started {
        Started::Completed(outcome) => future::ready(outcome).boxed(),
        Started::Pending(future) => future,
    });
    Started::Pending(future::join_all(futures).map(TaskOutcome::Batch).boxed())
}

fn start_resolver(ctx: &OperationContext, task: &mut ResolverTask, inline: bool) -> Started {
    let cancellation = ctx.cancellation.clone();
    if cancellation.is_cancelled() {
        return Started::Completed(TaskOutcome::Cancelled);
    }
    let Some(selection) = task.context.selection().cloned() else {
        tracing::error!("resolver task started without a selection");
        return Started::Completed(TaskOutcome::Failed(GraphqlError::internal_server_error()));
    };

    if let Some(value) = task.prefetched.take() {
        return Started::Completed(materialize_inline(value, &cancellation));
    }

    match selection.arguments().try_coerce(&ctx.variables) {
        Ok(arguments) => task.context.set_arguments(arguments),
        Err(err) => return Started::Completed(TaskOutcome::Failed(err.into())),
    }

    let materialize = Materialize {
        initial_count: selection
            .active_stream(&ctx.variables)
            .map(|stream| stream.initial_count()),
        maybe_stream: selection.maybe_stream(),
        offload_lazy_lists: ctx.config.offload_lazy_lists,
        cancellation: cancellation.clone(),
    };
    let scope = ctx.diagnostics.resolve_field_value(&task.context);
    let path = task.context.path().clone();

    match &selection.definition().resolver {
        Resolver::Async(resolve) => {
            let future = match catch_unwind(AssertUnwindSafe(|| resolve(&task.context))) {
                Ok(future) => future,
                Err(panic) => return Started::Completed(panicked(&selection, &path, panic.as_ref())),
            };
            let span = scope.span().clone();
            Started::Pending(
                async move {
                    let _scope = scope;
                    let result = tokio::select! {
                        biased;
                        _ = cancellation.cancelled() => return TaskOutcome::Cancelled,
                        result = AssertUnwindSafe(future).catch_unwind() => result,
                    };
                    let outcome = match result {
                        Ok(Ok(value)) => materialize.run(value).await,
                        Ok(Err(err)) => TaskOutcome::Failed(err.into()),
                        Err(panic) => panicked(&selection, &path, panic.as_ref()),
                    };
                    outcome.or_cancelled(&cancellation)
                }
                .instrument(span)
                .boxed(),
            )
        }
        resolver => {
            let result = {
                let _entered = scope.span().enter();
                catch_unwind(AssertUnwindSafe(|| resolver.resolve_sync(&task.context)))
            };
            let value = match result {
                Ok(Some(Ok(value))) => value,
                Ok(Some(Err(err))) => {
                    return Started::Completed(TaskOutcome::Failed(err.into()).or_cancelled(&cancellation))
                }
                Ok(None) => return Started::Completed(TaskOutcome::Failed(GraphqlError::internal_server_error())),
                Err(panic) => return Started::Completed(panicked(&selection, &path, panic.as_ref())),
            };
            if inline {
                drop(scope);
                return Started::Completed(materialize_inline(value, &cancellation).or_cancelled(&cancellation));
            }
            // Synchronous resolver of a field which still needs asynchronous post-processing,
            // such as `@stream`.
            Started::Pending(
                async move {
                    let _scope = scope;
                    materialize.run(value).await.or_cancelled(&cancellation)
                }
                .boxed(),
            )
        }
    }
}

fn panicked(selection: &Arc<Selection>, path: &ResponsePath, panic: &(dyn Any + Send)) -> TaskOutcome {
    let message = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    tracing::error!(
        %path,
        field = selection.field_name(),
        parent_type = %selection.parent_type(),
        "resolver panicked: {message}"
    );
    TaskOutcome::Failed(GraphqlError::internal_server_error())
}

/// Post-processing rules applied to raw resolver values before completion.
struct Materialize {
    /// `initialCount` of an active `@stream` directive.
    initial_count: Option<usize>,
    maybe_stream: bool,
    offload_lazy_lists: bool,
    cancellation: CancellationToken,
}

impl Materialize {
    async fn run(self, value: ResolvedValue) -> TaskOutcome {
        let (value, scoped) = split_scoped(value);
        let outcome = match (value, self.initial_count) {
            (ResolvedValue::Error(error), _) => return TaskOutcome::Failed(error),
            (value, Some(initial_count)) => self.split_stream(value, initial_count).await,
            (ResolvedValue::Stream(stream), None) if self.maybe_stream => {
                match drain_stream(stream, &self.cancellation).await {
                    Some(items) => TaskOutcome::Value(ResolvedValue::List(items), None),
                    None => TaskOutcome::Cancelled,
                }
            }
            (ResolvedValue::Lazy(list), None) => self.pull_lazy(list, usize::MAX).await,
            (value, None) => TaskOutcome::Value(value, None),
        };
        rescope(outcome, scoped)
    }

    /// Pulls the first `initial_count` items eagerly, the remainder is streamed later.
    async fn split_stream(&self, value: ResolvedValue, initial_count: usize) -> TaskOutcome {
        match value {
            ResolvedValue::Stream(mut stream) => {
                let mut eager = Vec::with_capacity(initial_count);
                while eager.len() < initial_count {
                    tokio::select! {
                        biased;
                        _ = self.cancellation.cancelled() => return TaskOutcome::Cancelled,
                        item = stream.next() => match item {
                            Some(item) => eager.push(item),
                            None => return TaskOutcome::Value(ResolvedValue::List(eager), None),
                        }
                    }
                }
                TaskOutcome::Value(ResolvedValue::List(eager), Some(stream))
            }
            ResolvedValue::List(items) => split_items(items, initial_count),
            ResolvedValue::Value(serde_json::Value::Array(items)) => {
                split_items(items.into_iter().map(ResolvedValue::Value).collect(), initial_count)
            }
            ResolvedValue::Lazy(list) => self.pull_lazy(list, initial_count).await,
            value => TaskOutcome::Value(value, None),
        }
    }

    /// Pulls up to `limit` items of a lazy list, the rest becomes the streamed remainder.
    async fn pull_lazy(&self, list: LazyList, limit: usize) -> TaskOutcome {
        let pulled = if self.offload_lazy_lists {
            let cancellation = self.cancellation.clone();
            match tokio::task::spawn_blocking(move || take_lazy(list, limit, &cancellation)).await {
                Ok(pulled) => pulled,
                Err(err) => {
                    tracing::error!("lazy list materialization failed: {err}");
                    return TaskOutcome::Failed(GraphqlError::internal_server_error());
                }
            }
        } else {
            take_lazy(list, limit, &self.cancellation)
        };
        match pulled {
            Some((items, rest)) => TaskOutcome::Value(
                ResolvedValue::List(items),
                rest.map(|rest| lazy_remainder(rest, self.offload_lazy_lists)),
            ),
            None => TaskOutcome::Cancelled,
        }
    }
}

fn lazy_remainder(list: LazyList, offload: bool) -> BoxStream<'static, ResolvedValue> {
    if !offload {
        return stream::iter(list).boxed();
    }
    stream::unfold(list, |mut list| async move {
        match tokio::task::spawn_blocking(move || (list.next(), list)).await {
            Ok((item, list)) => Some((item?, list)),
            Err(err) => {
                tracing::error!("lazy list materialization failed: {err}");
                None
            }
        }
    })
    .boxed()
}

/// Materialization for tasks that never suspend.
fn materialize_inline(value: ResolvedValue, cancellation: &CancellationToken) -> TaskOutcome {
    let (value, scoped) = split_scoped(value);
    let outcome = match value {
        ResolvedValue::Error(error) => return TaskOutcome::Failed(error),
        ResolvedValue::Lazy(list) => match drain_lazy(list, cancellation) {
            Some(items) => TaskOutcome::Value(ResolvedValue::List(items), None),
            None => TaskOutcome::Cancelled,
        },
        value => TaskOutcome::Value(value, None),
    };
    rescope(outcome, scoped)
}

fn split_items(mut items: Vec<ResolvedValue>, initial_count: usize) -> TaskOutcome {
    if items.len() <= initial_count {
        return TaskOutcome::Value(ResolvedValue::List(items), None);
    }
    let remainder = items.split_off(initial_count);
    TaskOutcome::Value(ResolvedValue::List(items), Some(stream::iter(remainder).boxed()))
}

/// `None` if cancelled before the end of the stream.
async fn drain_stream(
    mut stream: BoxStream<'static, ResolvedValue>,
    cancellation: &CancellationToken,
) -> Option<Vec<ResolvedValue>> {
    let mut items = Vec::new();
    loop {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => return None,
            item = stream.next() => match item {
                Some(item) => items.push(item),
                None => return Some(items),
            }
        }
    }
}

/// `None` if cancelled before the end of the list.
fn drain_lazy(list: LazyList, cancellation: &CancellationToken) -> Option<Vec<ResolvedValue>> {
    take_lazy(list, usize::MAX, cancellation).map(|(items, _)| items)
}

/// Pulls at most `limit` items, checking for cancellation before each one. The list is handed
/// back if the limit was reached. `None` if cancelled.
fn take_lazy(
    mut list: LazyList,
    limit: usize,
    cancellation: &CancellationToken,
) -> Option<(Vec<ResolvedValue>, Option<LazyList>)> {
    let mut items = Vec::new();
    while items.len() < limit {
        if cancellation.is_cancelled() {
            return None;
        }
        match list.next() {
            Some(item) => items.push(item),
            None => return (!cancellation.is_cancelled()).then_some((items, None)),
        }
    }
    Some((items, Some(list)))
}

fn split_scoped(value: ResolvedValue) -> (ResolvedValue, Vec<(Arc<str>, serde_json::Value)>) {
    match value {
        ResolvedValue::Scoped(inner, scoped) => {
            let (inner, mut nested) = split_scoped(*inner);
            nested.splice(0..0, scoped);
            (inner, nested)
        }
        value => (value, Vec::new()),
    }
}

fn rescope(outcome: TaskOutcome, scoped: Vec<(Arc<str>, serde_json::Value)>) -> TaskOutcome {
    match outcome {
        TaskOutcome::Value(value, remainder) if !scoped.is_empty() => {
            TaskOutcome::Value(ResolvedValue::Scoped(Box::new(value), scoped), remainder)
        }
        outcome => outcome,
    }
}
