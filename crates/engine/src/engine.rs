use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    config::ExecutionConfig,
    execution::{
        BufferPool, DeferredWork, DiagnosticEvents, Execution, OperationContext, ResolverTaskPools,
        SchedulerStatistics, TaskPoolStatistics, TracingDiagnostics,
    },
    operation::{Operation, Variables},
    resolver::{ParentValue, ScopedContext},
    response::{Response, ResponsePath},
    schema::Schema,
};

/// Executes prepared operations. Cheap to share, every execution gets its own pools and result
/// tree.
#[derive(Clone)]
pub struct Engine {
    config: ExecutionConfig,
    diagnostics: Arc<dyn DiagnosticEvents>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(ExecutionConfig::default())
    }
}

impl Engine {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: impl DiagnosticEvents + 'static) -> Self {
        self.diagnostics = Arc::new(diagnostics);
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Runs the operation until the primary response is complete. Deferred fragments and
    /// streamed items are left in the returned [`DeferredWork`].
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutput {
        let span = tracing::debug_span!(
            "execute",
            operation_type = %request.operation.ty(),
            root_type = %request.operation.root_type(),
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: ExecutionRequest) -> ExecutionOutput {
        let ExecutionRequest {
            schema,
            operation,
            variables,
            cancellation,
            root_value,
            scoped,
        } = request;

        let ctx = Arc::new(OperationContext {
            schema,
            operation,
            variables: Arc::new(variables),
            cancellation,
            pools: ResolverTaskPools::new(self.config.task_pool_capacity),
            config: self.config.clone(),
            diagnostics: self.diagnostics.clone(),
        });

        let mut execution = Execution::new(ctx.clone(), BufferPool::new(self.config.result_buffer_pool_capacity));
        let root_selection_set = ctx.operation.selection_set().clone();
        execution.enqueue_resolver_tasks(
            &root_selection_set,
            ParentValue::Root(root_value.map(Arc::new)),
            &ResponsePath::root(),
            &scoped,
            None,
        );
        execution.drain().await;
        let finished = execution.finish();

        if ctx.is_cancelled() {
            tracing::debug!("operation cancelled");
        }

        ExecutionOutput {
            response: Response {
                data: finished.data,
                errors: finished.errors,
            },
            deferred: DeferredWork::new(ctx, finished.buffers, finished.deferred),
            scheduler_statistics: finished.scheduler,
        }
    }
}

pub struct ExecutionRequest {
    schema: Arc<Schema>,
    operation: Arc<Operation>,
    variables: Variables,
    cancellation: CancellationToken,
    root_value: Option<Value>,
    scoped: ScopedContext,
}

impl ExecutionRequest {
    pub fn new(schema: Arc<Schema>, operation: Arc<Operation>) -> Self {
        Self {
            schema,
            operation,
            variables: Variables::default(),
            cancellation: CancellationToken::new(),
            root_value: None,
            scoped: ScopedContext::default(),
        }
    }

    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Cancelling the token stops the execution and any deferred work left.
    #[must_use]
    pub fn cancellation_token(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Parent value seen by the root fields.
    #[must_use]
    pub fn root_value(mut self, value: Value) -> Self {
        self.root_value = Some(value);
        self
    }

    /// Scoped context entry visible to every resolver of the operation.
    #[must_use]
    pub fn scoped_value(mut self, key: impl Into<Arc<str>>, value: Value) -> Self {
        self.scoped = self.scoped.with(key, value);
        self
    }
}

pub struct ExecutionOutput {
    pub response: Response,
    pub deferred: DeferredWork,
    /// Scheduler counters of the primary execution.
    pub scheduler_statistics: SchedulerStatistics,
}

impl ExecutionOutput {
    /// Counters of the task pools of the operation, shared with its deferred work.
    pub fn pool_statistics(&self) -> TaskPoolStatistics {
        self.deferred.pool_statistics()
    }
}
