use super::pool::PooledTask;
use crate::{
    resolver::{ResolvedValue, ResolverContext},
    response::ResultSlot,
    schema::FieldType,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub(crate) enum TaskStatus {
    #[default]
    WaitingToRun,
    Running,
    Completed,
    Faulted,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Faulted)
    }

    fn transition(&mut self, next: TaskStatus) {
        debug_assert!(
            matches!(
                (*self, next),
                (TaskStatus::WaitingToRun, TaskStatus::Running)
                    | (TaskStatus::Running, TaskStatus::Completed | TaskStatus::Faulted)
            ),
            "invalid task transition from {self} to {next}"
        );
        *self = next;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub(crate) enum TaskKind {
    Pure,
    Parallel,
    Serial,
    Batch,
}

/// Unit of schedulable work. Resolver tasks resolve one field of one object, batches group
/// tasks executed as a single unit.
pub(crate) enum ExecutionTask {
    Pure(Box<ResolverTask>),
    Parallel(Box<ResolverTask>),
    Serial(Box<ResolverTask>),
    Batch(Box<BatchTask>),
}

impl ExecutionTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            ExecutionTask::Pure(_) => TaskKind::Pure,
            ExecutionTask::Parallel(_) => TaskKind::Parallel,
            ExecutionTask::Serial(_) => TaskKind::Serial,
            ExecutionTask::Batch(_) => TaskKind::Batch,
        }
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, ExecutionTask::Serial(_))
    }

    /// Whether the task completes while being started, without suspending.
    pub fn is_inline(&self) -> bool {
        match self {
            ExecutionTask::Pure(_) => true,
            ExecutionTask::Parallel(_) | ExecutionTask::Serial(_) => false,
            ExecutionTask::Batch(batch) => batch.children.iter().all(ExecutionTask::is_inline),
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            ExecutionTask::Pure(task) | ExecutionTask::Parallel(task) | ExecutionTask::Serial(task) => task.status,
            ExecutionTask::Batch(batch) => batch.status,
        }
    }

    pub fn resolver_task_mut(&mut self) -> Option<&mut ResolverTask> {
        match self {
            ExecutionTask::Pure(task) | ExecutionTask::Parallel(task) | ExecutionTask::Serial(task) => Some(&mut **task),
            ExecutionTask::Batch(_) => None,
        }
    }

    pub fn mark_running(&mut self) {
        match self {
            ExecutionTask::Pure(task) | ExecutionTask::Parallel(task) | ExecutionTask::Serial(task) => {
                task.status.transition(TaskStatus::Running)
            }
            ExecutionTask::Batch(batch) => batch.status.transition(TaskStatus::Running),
        }
    }

    pub fn finish(&mut self, faulted: bool) {
        let next = if faulted {
            TaskStatus::Faulted
        } else {
            TaskStatus::Completed
        };
        match self {
            ExecutionTask::Pure(task) | ExecutionTask::Parallel(task) | ExecutionTask::Serial(task) => {
                task.status.transition(next)
            }
            ExecutionTask::Batch(batch) => batch.status.transition(next),
        }
    }

    #[cfg(test)]
    pub fn finish_for_test(&mut self, status: TaskStatus) {
        self.mark_running();
        self.finish(status == TaskStatus::Faulted);
    }
}

/// Resolves one field and writes the completed value into its slot.
#[derive(Default)]
pub(crate) struct ResolverTask {
    status: TaskStatus,
    pub context: ResolverContext,
    pub slot: Option<ResultSlot>,
    /// Type of the value written into the slot: the field type, or the item type for stream
    /// items.
    pub value_type: Option<FieldType>,
    /// Raw value known before the task starts, such as an item pulled from a stream. The
    /// resolver is skipped entirely.
    pub prefetched: Option<ResolvedValue>,
}

impl PooledTask for ResolverTask {
    fn reset(&mut self) -> bool {
        if !self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::WaitingToRun;
        self.context.clear();
        self.slot = None;
        self.value_type = None;
        self.prefetched = None;
        true
    }
}

#[derive(Default)]
pub(crate) struct BatchTask {
    status: TaskStatus,
    pub children: Vec<ExecutionTask>,
}

impl PooledTask for BatchTask {
    fn reset(&mut self) -> bool {
        if !self.status.is_terminal() || !self.children.is_empty() {
            return false;
        }
        self.status = TaskStatus::WaitingToRun;
        true
    }
}
