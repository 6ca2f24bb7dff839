mod complete;
mod context;
mod deferred;
mod diagnostics;
mod pool;
mod run;
mod scheduler;
mod task;

use std::sync::Arc;

use error::GraphqlError;
use futures_util::stream::{BoxStream, StreamExt};
use serde_json::Value;

pub(crate) use context::OperationContext;
pub use deferred::{DeferredWork, IncrementalData, IncrementalPayload};
pub use diagnostics::{ActivityScope, DiagnosticEvents, TracingDiagnostics};
pub(crate) use pool::{BufferPool, ResolverTaskPools};
pub use pool::{PoolStatistics, TaskPoolStatistics};
pub use scheduler::SchedulerStatistics;

use self::{
    complete::Completed,
    deferred::{DeferredFragment, DeferredRegistrations, DeferredStream},
    run::{Started, TaskOutcome},
    scheduler::{TaskHandle, WorkScheduler},
    task::{ExecutionTask, ResolverTask},
};
use crate::{
    operation::{Selection, SelectionSet, SelectionStrategy},
    resolver::{ParentValue, ResolvedValue, ScopedContext},
    response::{
        NonNullViolations, ResponsePath, ResultContainer, ResultField, ResultMapId, ResultSlot, ResultTree,
        ResultValue,
    },
    schema::FieldType,
};

/// Drives the tasks of one result tree until there is nothing left to run. The primary
/// response and every deferred payload each get their own execution.
///
/// Completion and every tree write happen on the task driving [`Execution::drain`], resolvers
/// only produce raw values.
pub(crate) struct Execution {
    ctx: Arc<OperationContext>,
    scheduler: WorkScheduler,
    tree: ResultTree,
    errors: Vec<GraphqlError>,
    violations: NonNullViolations,
    deferred: DeferredRegistrations,
}

pub(crate) struct FinishedExecution {
    pub data: Option<Value>,
    pub errors: Vec<GraphqlError>,
    pub deferred: DeferredRegistrations,
    pub buffers: BufferPool<ResultField>,
    pub scheduler: SchedulerStatistics,
}

impl Execution {
    pub fn new(ctx: Arc<OperationContext>, buffers: BufferPool<ResultField>) -> Self {
        Self {
            ctx,
            scheduler: WorkScheduler::default(),
            tree: ResultTree::new(buffers),
            errors: Vec::new(),
            violations: NonNullViolations::default(),
            deferred: DeferredRegistrations::default(),
        }
    }

    /// Allocates the map of a selection set and one task per included field, in selection
    /// order. Active deferred fragments of the selection set are registered for later.
    pub fn enqueue_resolver_tasks(
        &mut self,
        selection_set: &Arc<SelectionSet>,
        parent: ParentValue,
        path: &ResponsePath,
        scoped: &ScopedContext,
        parent_slot: Option<ResultSlot>,
    ) -> ResultMapId {
        let (map, tasks) = self.rent_tasks(selection_set, parent, path, scoped, parent_slot);
        self.scheduler.register(tasks, &self.ctx.pools);
        map
    }

    /// Same as [`Self::enqueue_resolver_tasks`] for the root of a deferred fragment, with all
    /// field tasks grouped into a single batch.
    pub fn enqueue_batch(
        &mut self,
        selection_set: &Arc<SelectionSet>,
        parent: ParentValue,
        path: &ResponsePath,
        scoped: &ScopedContext,
    ) -> ResultMapId {
        let (map, tasks) = self.rent_tasks(selection_set, parent, path, scoped, None);
        let batch = self.ctx.pools.rent_batch(tasks);
        self.scheduler.enqueue(batch);
        map
    }

    /// Completes one item pulled from a stream. The item is written into a single-element root
    /// list, delivered as the `items` of the payload.
    pub fn enqueue_element(
        &mut self,
        selection: &Arc<Selection>,
        item_type: &FieldType,
        list_path: &ResponsePath,
        index: usize,
        item: ResolvedValue,
        scoped: &ScopedContext,
    ) {
        let list = self.tree.new_list(None, 1, !item_type.is_required());
        let mut task = self.ctx.pools.rent(SelectionStrategy::Pure);
        if let Some(resolver_task) = task.resolver_task_mut() {
            resolver_task.context.init(
                selection.clone(),
                ParentValue::default(),
                list_path.child_index(index),
                index,
                scoped.clone(),
                self.ctx.variables.clone(),
                self.ctx.cancellation.clone(),
            );
            resolver_task.slot = Some(ResultSlot::Item { list, index: 0 });
            resolver_task.value_type = Some(item_type.clone());
            resolver_task.prefetched = Some(item);
        }
        let batch = self.ctx.pools.rent_batch(vec![task]);
        self.scheduler.enqueue(batch);
    }

    fn rent_tasks(
        &mut self,
        selection_set: &Arc<SelectionSet>,
        parent: ParentValue,
        path: &ResponsePath,
        scoped: &ScopedContext,
        parent_slot: Option<ResultSlot>,
    ) -> (ResultMapId, Vec<ExecutionTask>) {
        let variables = &self.ctx.variables;
        let map = self.tree.rent_result_map(selection_set.len(), parent_slot);
        let mut tasks = Vec::with_capacity(selection_set.len());

        for selection in selection_set.selections() {
            if !selection.is_included(variables) {
                continue;
            }
            let key = selection.response_key();
            let slot = self.tree.push_field(map, key.clone(), !selection.ty().is_required());
            let mut task = self.ctx.pools.rent(selection.strategy());
            if let Some(resolver_task) = task.resolver_task_mut() {
                resolver_task.context.init(
                    selection.clone(),
                    parent.clone(),
                    path.child_field(key),
                    tasks.len(),
                    scoped.clone(),
                    variables.clone(),
                    self.ctx.cancellation.clone(),
                );
                resolver_task.slot = Some(slot);
                resolver_task.value_type = Some(selection.ty().clone());
            }
            tasks.push(task);
        }

        for fragment in selection_set.deferred_fragments() {
            if !fragment.is_active(variables) {
                continue;
            }
            tracing::debug!(%path, label = ?fragment.label(), "deferring fragment");
            self.deferred.fragments.push(DeferredFragment {
                label: fragment.label().cloned(),
                path: path.clone(),
                container: ResultContainer::Map(map),
                parent: parent.clone(),
                selection_set: fragment.selection_set().clone(),
                scoped: scoped.clone(),
            });
        }

        (map, tasks)
    }

    /// Runs every queued task and everything they spawn. Inline tasks go first, then parallel
    /// tasks are started, and serial tasks only run once nothing else is left.
    pub async fn drain(&mut self) {
        loop {
            while let Some(handle) = self.scheduler.pop_inline() {
                self.begin(handle);
            }
            if let Some(handle) = self.scheduler.pop_ready() {
                self.begin(handle);
                continue;
            }
            if let Some((handle, outcome)) = self.scheduler.next_completed().await {
                self.complete_task(handle, outcome);
                continue;
            }
            if let Some(handle) = self.scheduler.pop_serial() {
                self.begin(handle);
                continue;
            }
            break;
        }
        debug_assert!(self.scheduler.is_idle());
    }

    fn begin(&mut self, handle: TaskHandle) {
        let ctx = self.ctx.clone();
        let Some(task) = self.scheduler.task_mut(handle) else {
            tracing::error!(%handle, "started a task that is not registered");
            return;
        };
        match run::start(&ctx, task) {
            Started::Completed(outcome) => self.complete_task(handle, outcome),
            Started::Pending(future) => self.scheduler.track(handle, future),
        }
    }

    fn complete_task(&mut self, handle: TaskHandle, outcome: TaskOutcome) {
        let Some(mut task) = self.scheduler.retire(handle) else {
            tracing::error!(%handle, "completed a task that is not registered");
            return;
        };

        let faulted = match (&mut task, outcome) {
            (ExecutionTask::Batch(batch), TaskOutcome::Batch(outcomes)) => {
                let mut faulted = false;
                for (child, outcome) in batch.children.iter_mut().zip(outcomes) {
                    let child_faulted = match child.resolver_task_mut() {
                        Some(resolver_task) => self.complete_resolver_task(resolver_task, outcome),
                        None => false,
                    };
                    child.finish(child_faulted);
                    faulted |= child_faulted;
                }
                faulted
            }
            (task, outcome) => match task.resolver_task_mut() {
                Some(resolver_task) => self.complete_resolver_task(resolver_task, outcome),
                None => {
                    tracing::error!(%handle, "batch task completed without a batch outcome");
                    true
                }
            },
        };

        task.finish(faulted);
        tracing::trace!(%handle, kind = %task.kind(), status = %task.status(), "task finished");
        self.ctx.pools.give_back(task);
    }

    /// Writes the outcome of a resolver task into its slot. Returns whether the task faulted.
    fn complete_resolver_task(&mut self, task: &mut ResolverTask, outcome: TaskOutcome) -> bool {
        let (Some(selection), Some(slot), Some(ty)) =
            (task.context.selection().cloned(), task.slot, task.value_type.clone())
        else {
            tracing::error!("resolver task completed before being initialized");
            return true;
        };
        let path = task.context.path().clone();

        match outcome {
            TaskOutcome::Value(value, remainder) => {
                let scoped = task.context.scoped_context().clone();
                // Streamed items see the same scope as the eager ones.
                let stream_scope = remainder.as_ref().map(|_| scope_of(&value, &scoped));
                let eager_len = eager_len(&value);
                let completed = self.complete_value(&selection, &path, &ty, slot, value, &scoped);
                self.write_completed(&selection, &path, &ty, slot, completed);
                if let (Some(stream), Some(stream_scope)) = (remainder, stream_scope) {
                    self.register_stream(selection, path, &ty, slot, eager_len, stream, stream_scope);
                }
                false
            }
            TaskOutcome::Failed(error) => {
                self.write_completed(&selection, &path, &ty, slot, Completed::Failed(error));
                true
            }
            TaskOutcome::Cancelled => false,
            TaskOutcome::Batch(_) => {
                tracing::error!(%path, "resolver task completed with a batch outcome");
                self.write_completed(
                    &selection,
                    &path,
                    &ty,
                    slot,
                    Completed::Failed(GraphqlError::internal_server_error()),
                );
                true
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn register_stream(
        &mut self,
        selection: Arc<Selection>,
        path: ResponsePath,
        ty: &FieldType,
        slot: ResultSlot,
        next_index: usize,
        stream: BoxStream<'static, ResolvedValue>,
        scoped: ScopedContext,
    ) {
        // Nothing to append to if the list itself failed.
        let ResultValue::List(list) = *self.tree.get(slot) else {
            return;
        };
        let Some(item_type) = ty.item_type() else {
            return;
        };
        let label = selection
            .active_stream(&self.ctx.variables)
            .and_then(|stream| stream.label().cloned());
        self.deferred.streams.push(DeferredStream {
            label,
            path,
            container: ResultContainer::List(list),
            selection,
            item_type,
            next_index,
            stream: stream.peekable(),
            scoped,
        });
    }

    /// Propagates non-null violations and hands out the final data.
    pub fn finish(mut self) -> FinishedExecution {
        let scheduler = self.scheduler.statistics();
        if !self.violations.is_empty() {
            tracing::debug!(violations = self.violations.len(), "propagating non-null violations");
        }
        std::mem::take(&mut self.violations).propagate(&mut self.tree);
        self.deferred.retain_reachable(&self.tree);
        let (data, buffers) = self.tree.into_data();
        tracing::debug!(
            errors = self.errors.len(),
            tasks = scheduler.retired,
            max_in_flight = scheduler.max_in_flight,
            "execution finished"
        );
        FinishedExecution {
            data,
            errors: self.errors,
            deferred: self.deferred,
            buffers,
            scheduler,
        }
    }
}

fn scope_of(value: &ResolvedValue, scoped: &ScopedContext) -> ScopedContext {
    match value {
        ResolvedValue::Scoped(inner, entries) => scope_of(inner, &scoped.extend(entries.iter().cloned())),
        _ => scoped.clone(),
    }
}

fn eager_len(value: &ResolvedValue) -> usize {
    match value {
        ResolvedValue::Scoped(inner, _) => eager_len(inner),
        ResolvedValue::List(items) => items.len(),
        ResolvedValue::Value(Value::Array(items)) => items.len(),
        _ => 0,
    }
}
