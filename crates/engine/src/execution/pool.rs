use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_queue::ArrayQueue;

use super::task::{BatchTask, ExecutionTask, ResolverTask};
use crate::operation::SelectionStrategy;

/// Recycled vectors, bounded to `capacity` buffers.
pub(crate) struct BufferPool<T> {
    buffers: Vec<Vec<T>>,
    capacity: usize,
}

impl<T> BufferPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Vec::new(),
            capacity,
        }
    }

    pub fn pop(&mut self) -> Vec<T> {
        self.buffers.pop().unwrap_or_default()
    }

    pub fn push(&mut self, mut buffer: Vec<T>) {
        if self.buffers.len() < self.capacity {
            buffer.clear();
            self.buffers.push(buffer);
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }
}

/// Objects which can be handed out again after being returned to their pool.
pub(crate) trait PooledTask: Default + Send {
    /// Drops every reference held from the previous rental. Returns `false` if the task is not
    /// in a state allowing reuse, in which case it must be discarded.
    fn reset(&mut self) -> bool;
}

/// Counters of a single task pool. `rented == returned + discarded` once every task of an
/// operation has completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStatistics {
    /// Tasks allocated because the pool was empty.
    pub created: usize,
    pub rented: usize,
    pub returned: usize,
    /// Tasks given back in an inconsistent state.
    pub discarded: usize,
}

impl PoolStatistics {
    /// Tasks currently rented out.
    pub fn outstanding(&self) -> usize {
        self.rented.saturating_sub(self.returned + self.discarded)
    }
}

/// Bounded lock-free pool of boxed tasks. Running dry or full only degrades to allocation.
pub(crate) struct TaskPool<T> {
    queue: ArrayQueue<Box<T>>,
    created: AtomicUsize,
    rented: AtomicUsize,
    returned: AtomicUsize,
    discarded: AtomicUsize,
}

impl<T: PooledTask> TaskPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            created: AtomicUsize::new(0),
            rented: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        }
    }

    pub fn rent(&self) -> Box<T> {
        self.rented.fetch_add(1, Ordering::Relaxed);
        self.queue.pop().unwrap_or_else(|| {
            self.created.fetch_add(1, Ordering::Relaxed);
            Box::default()
        })
    }

    pub fn give_back(&self, mut task: Box<T>) {
        if !task.reset() {
            tracing::error!("task returned to its pool before reaching a terminal state");
            self.discarded.fetch_add(1, Ordering::Relaxed);
            debug_assert!(false, "task returned to its pool before reaching a terminal state");
            return;
        }
        self.returned.fetch_add(1, Ordering::Relaxed);
        // Dropped if the pool is already full.
        let _ = self.queue.push(task);
    }

    pub fn available(&self) -> usize {
        self.queue.len()
    }

    pub fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            created: self.created.load(Ordering::Relaxed),
            rented: self.rented.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TaskPoolStatistics {
    pub pure: PoolStatistics,
    pub parallel: PoolStatistics,
    pub serial: PoolStatistics,
    pub batch: PoolStatistics,
}

impl TaskPoolStatistics {
    pub fn outstanding(&self) -> usize {
        [self.pure, self.parallel, self.serial, self.batch]
            .iter()
            .map(PoolStatistics::outstanding)
            .sum()
    }

    pub fn rented(&self) -> usize {
        self.pure.rented + self.parallel.rented + self.serial.rented + self.batch.rented
    }
}

/// One pool per task kind, owned by a single operation.
pub(crate) struct ResolverTaskPools {
    pure: TaskPool<ResolverTask>,
    parallel: TaskPool<ResolverTask>,
    serial: TaskPool<ResolverTask>,
    batch: TaskPool<BatchTask>,
}

impl ResolverTaskPools {
    pub fn new(capacity: usize) -> Self {
        Self {
            pure: TaskPool::new(capacity),
            parallel: TaskPool::new(capacity),
            serial: TaskPool::new(capacity),
            batch: TaskPool::new(capacity),
        }
    }

    /// Rents an uninitialized resolver task of the given kind.
    pub fn rent(&self, strategy: SelectionStrategy) -> ExecutionTask {
        match strategy {
            SelectionStrategy::Pure => ExecutionTask::Pure(self.pure.rent()),
            SelectionStrategy::Parallel => ExecutionTask::Parallel(self.parallel.rent()),
            SelectionStrategy::Serial => ExecutionTask::Serial(self.serial.rent()),
        }
    }

    pub fn rent_batch(&self, children: Vec<ExecutionTask>) -> ExecutionTask {
        let mut batch = self.batch.rent();
        batch.children = children;
        ExecutionTask::Batch(batch)
    }

    pub fn give_back(&self, task: ExecutionTask) {
        match task {
            ExecutionTask::Pure(task) => self.pure.give_back(task),
            ExecutionTask::Parallel(task) => self.parallel.give_back(task),
            ExecutionTask::Serial(task) => self.serial.give_back(task),
            ExecutionTask::Batch(mut batch) => {
                for child in std::mem::take(&mut batch.children) {
                    self.give_back(child);
                }
                self.batch.give_back(batch);
            }
        }
    }

    pub fn statistics(&self) -> TaskPoolStatistics {
        TaskPoolStatistics {
            pure: self.pure.statistics(),
            parallel: self.parallel.statistics(),
            serial: self.serial.statistics(),
            batch: self.batch.statistics(),
        }
    }
}
