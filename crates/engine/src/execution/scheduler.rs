use futures_util::{future::BoxFuture, stream::FuturesUnordered, StreamExt};

use super::{
    pool::ResolverTaskPools,
    run::TaskOutcome,
    task::{ExecutionTask, TaskKind},
};

/// Generation-checked reference to a task owned by the scheduler. A stale handle, one whose
/// task was already retired, never resolves to the task now occupying the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TaskHandle {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Entry {
    generation: u32,
    task: Option<ExecutionTask>,
    // Queue membership, owned by the queue the task is in.
    next: Option<u32>,
    previous: Option<u32>,
}

/// FIFO of tasks linked through their slab entries.
#[derive(Debug, Default)]
struct TaskQueue {
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl TaskQueue {
    fn push_back(&mut self, entries: &mut [Entry], index: u32) {
        entries[index as usize].previous = self.tail;
        entries[index as usize].next = None;
        match self.tail {
            Some(tail) => entries[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    fn pop_front(&mut self, entries: &mut [Entry]) -> Option<u32> {
        let index = self.head?;
        self.unlink(entries, index);
        Some(index)
    }

    fn unlink(&mut self, entries: &mut [Entry], index: u32) {
        let (previous, next) = {
            let entry = &mut entries[index as usize];
            (entry.previous.take(), entry.next.take())
        };
        match previous {
            Some(previous) => entries[previous as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => entries[next as usize].previous = previous,
            None => self.tail = previous,
        }
        self.len -= 1;
    }

    fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SchedulerStatistics {
    pub registered: usize,
    pub retired: usize,
    /// Registrations of an empty task list, replaced by a no-op batch.
    pub empty_registrations: usize,
    pub max_in_flight: usize,
}

/// Owns every unresolved task of an execution.
///
/// Tasks completing inline go through the inline queue, asynchronous tasks through the ready
/// queue, and serial tasks wait in their own queue until nothing else is queued or in flight.
pub(crate) struct WorkScheduler {
    entries: Vec<Entry>,
    free: Vec<u32>,
    inline: TaskQueue,
    ready: TaskQueue,
    serial: TaskQueue,
    in_flight: FuturesUnordered<BoxFuture<'static, (TaskHandle, TaskOutcome)>>,
    statistics: SchedulerStatistics,
}

impl Default for WorkScheduler {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            inline: TaskQueue::default(),
            ready: TaskQueue::default(),
            serial: TaskQueue::default(),
            in_flight: FuturesUnordered::new(),
            statistics: SchedulerStatistics::default(),
        }
    }
}

impl WorkScheduler {
    /// Enqueues tasks in order. An empty list still registers a no-op batch so every
    /// registration goes through the same completion path.
    pub fn register(&mut self, tasks: Vec<ExecutionTask>, pools: &ResolverTaskPools) {
        if tasks.is_empty() {
            self.statistics.empty_registrations += 1;
            self.enqueue(pools.rent_batch(Vec::new()));
            return;
        }
        for task in tasks {
            self.enqueue(task);
        }
    }

    pub fn enqueue(&mut self, task: ExecutionTask) -> TaskHandle {
        let kind = task.kind();
        let is_inline = task.is_inline();
        let index = match self.free.pop() {
            Some(index) => {
                self.entries[index as usize].task = Some(task);
                index
            }
            None => {
                self.entries.push(Entry {
                    generation: 0,
                    task: Some(task),
                    next: None,
                    previous: None,
                });
                (self.entries.len() - 1) as u32
            }
        };
        let queue = match kind {
            TaskKind::Serial => &mut self.serial,
            _ if is_inline => &mut self.inline,
            _ => &mut self.ready,
        };
        queue.push_back(&mut self.entries, index);
        self.statistics.registered += 1;

        let handle = TaskHandle {
            index,
            generation: self.entries[index as usize].generation,
        };
        tracing::trace!(%handle, %kind, "task registered");
        handle
    }

    pub fn pop_inline(&mut self) -> Option<TaskHandle> {
        let index = self.inline.pop_front(&mut self.entries)?;
        Some(self.handle(index))
    }

    pub fn pop_ready(&mut self) -> Option<TaskHandle> {
        let index = self.ready.pop_front(&mut self.entries)?;
        Some(self.handle(index))
    }

    /// Next serial task, only once nothing else is queued or in flight.
    pub fn pop_serial(&mut self) -> Option<TaskHandle> {
        if !self.inline.is_empty() || !self.ready.is_empty() || !self.in_flight.is_empty() {
            return None;
        }
        let index = self.serial.pop_front(&mut self.entries)?;
        Some(self.handle(index))
    }

    fn handle(&self, index: u32) -> TaskHandle {
        TaskHandle {
            index,
            generation: self.entries[index as usize].generation,
        }
    }

    pub fn task_mut(&mut self, handle: TaskHandle) -> Option<&mut ExecutionTask> {
        let entry = self.entries.get_mut(handle.index as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.task.as_mut()
    }

    /// Starts polling the asynchronous part of a task, awaited by [`Self::next_completed`].
    pub fn track(&mut self, handle: TaskHandle, future: BoxFuture<'static, TaskOutcome>) {
        self.in_flight.push(Box::pin(async move { (handle, future.await) }));
        self.statistics.max_in_flight = self.statistics.max_in_flight.max(self.in_flight.len());
    }

    /// Waits for any tracked task to finish. `None` if nothing is in flight.
    pub async fn next_completed(&mut self) -> Option<(TaskHandle, TaskOutcome)> {
        self.in_flight.next().await
    }

    /// Takes a finished task back out of the scheduler. The handle is invalid afterwards.
    pub fn retire(&mut self, handle: TaskHandle) -> Option<ExecutionTask> {
        let entry = self.entries.get_mut(handle.index as usize)?;
        if entry.generation != handle.generation {
            debug_assert!(false, "stale task handle {handle}");
            return None;
        }
        let task = entry.task.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.statistics.retired += 1;
        Some(task)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn queued(&self) -> usize {
        self.inline.len + self.ready.len + self.serial.len
    }

    pub fn is_idle(&self) -> bool {
        self.queued() == 0 && self.in_flight.is_empty()
    }

    pub fn statistics(&self) -> SchedulerStatistics {
        self.statistics
    }
}
