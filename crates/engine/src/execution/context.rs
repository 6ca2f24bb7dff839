use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{pool::ResolverTaskPools, DiagnosticEvents};
use crate::{
    config::ExecutionConfig,
    operation::{Operation, Variables},
    schema::Schema,
};

/// Everything shared by the tasks of one operation execution, including its deferred work.
pub(crate) struct OperationContext {
    pub schema: Arc<Schema>,
    pub operation: Arc<Operation>,
    pub variables: Arc<Variables>,
    pub cancellation: CancellationToken,
    /// Per-operation, never shared across requests.
    pub pools: ResolverTaskPools,
    pub config: ExecutionConfig,
    pub diagnostics: Arc<dyn DiagnosticEvents>,
}

impl OperationContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
