use std::{collections::VecDeque, pin::Pin, sync::Arc};

use error::GraphqlError;
use futures_util::stream::{self, BoxStream, Peekable, StreamExt};
use serde::ser::SerializeMap;
use serde_json::Value;

use super::{context::OperationContext, pool::BufferPool, Execution, TaskPoolStatistics};
use crate::{
    operation::{Selection, SelectionSet},
    resolver::{ParentValue, ResolvedValue, ScopedContext},
    response::{ResponsePath, ResultContainer, ResultField, ResultTree},
    schema::FieldType,
};

/// `@defer` fragment waiting for the primary response to be delivered.
pub(crate) struct DeferredFragment {
    pub label: Option<Arc<str>>,
    pub path: ResponsePath,
    /// Map the fragment's fields are merged into.
    pub container: ResultContainer,
    pub parent: ParentValue,
    pub selection_set: Arc<SelectionSet>,
    pub scoped: ScopedContext,
}

/// Remainder of a `@stream` list field, resumed item by item.
pub(crate) struct DeferredStream {
    pub label: Option<Arc<str>>,
    /// Path of the list field.
    pub path: ResponsePath,
    /// List the items are appended to.
    pub container: ResultContainer,
    pub selection: Arc<Selection>,
    pub item_type: FieldType,
    /// Index of the next item within the list.
    pub next_index: usize,
    pub stream: Peekable<BoxStream<'static, ResolvedValue>>,
    pub scoped: ScopedContext,
}

/// Continuations produced by one execution.
#[derive(Default)]
pub(crate) struct DeferredRegistrations {
    pub fragments: Vec<DeferredFragment>,
    pub streams: Vec<DeferredStream>,
}

impl DeferredRegistrations {
    /// Drops the registrations whose container was removed from the data by null propagation.
    pub fn retain_reachable(&mut self, tree: &ResultTree) {
        let (fragments, streams) = (self.fragments.len(), self.streams.len());
        self.fragments.retain(|fragment| tree.is_reachable(fragment.container));
        self.streams.retain(|stream| tree.is_reachable(stream.container));
        let dropped = fragments + streams - self.fragments.len() - self.streams.len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped deferred work below a null");
        }
    }
}

/// Incremental delivery of deferred fragments and streamed list items, once the primary
/// response is available.
///
/// Fragments are delivered first in registration order, then stream items in source order.
/// Anything registered while delivering is appended to the pending work.
pub struct DeferredWork {
    ctx: Arc<OperationContext>,
    buffers: BufferPool<ResultField>,
    fragments: VecDeque<DeferredFragment>,
    streams: VecDeque<DeferredStream>,
}

impl DeferredWork {
    pub(crate) fn new(
        ctx: Arc<OperationContext>,
        buffers: BufferPool<ResultField>,
        registrations: DeferredRegistrations,
    ) -> Self {
        let mut work = Self {
            ctx,
            buffers,
            fragments: VecDeque::new(),
            streams: VecDeque::new(),
        };
        work.register(registrations);
        work
    }

    fn register(&mut self, registrations: DeferredRegistrations) {
        for fragment in &registrations.fragments {
            tracing::debug!(path = %fragment.path, label = ?fragment.label, "registered deferred fragment");
        }
        for stream in &registrations.streams {
            tracing::debug!(path = %stream.path, label = ?stream.label, next_index = stream.next_index, "registered deferred stream");
        }
        self.fragments.extend(registrations.fragments);
        self.streams.extend(registrations.streams);
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.streams.is_empty()
    }

    pub fn pending_fragments(&self) -> usize {
        self.fragments.len()
    }

    pub fn pending_streams(&self) -> usize {
        self.streams.len()
    }

    pub fn pool_statistics(&self) -> TaskPoolStatistics {
        self.ctx.pools.statistics()
    }

    pub fn into_stream(self) -> BoxStream<'static, IncrementalPayload> {
        stream::unfold(self, |mut work| async move {
            let payload = work.next_payload().await?;
            Some((payload, work))
        })
        .boxed()
    }

    /// Executes the next deferred fragment or stream item. `None` once everything was
    /// delivered, or if the operation was cancelled.
    pub async fn next_payload(&mut self) -> Option<IncrementalPayload> {
        if self.ctx.is_cancelled() {
            self.fragments.clear();
            self.streams.clear();
            return None;
        }

        if let Some(fragment) = self.fragments.pop_front() {
            let mut payload = self.execute_fragment(fragment).await;
            payload.has_next = self.has_next().await;
            return Some(payload);
        }

        loop {
            let cancellation = self.ctx.cancellation.clone();
            let stream = self.streams.front_mut()?;
            let item = tokio::select! {
                biased;
                _ = cancellation.cancelled() => None,
                item = stream.stream.next() => item,
            };
            let Some(item) = item else {
                self.streams.pop_front();
                if cancellation.is_cancelled() {
                    return None;
                }
                continue;
            };
            let index = stream.next_index;
            stream.next_index += 1;
            let selection = stream.selection.clone();
            let item_type = stream.item_type.clone();
            let path = stream.path.clone();
            let label = stream.label.clone();
            let scoped = stream.scoped.clone();

            let mut execution = Execution::new(self.ctx.clone(), self.take_buffers());
            execution.enqueue_element(&selection, &item_type, &path, index, item, &scoped);
            execution.drain().await;
            let finished = execution.finish();
            self.buffers = finished.buffers;
            self.register(finished.deferred);

            let mut payload = IncrementalPayload {
                label,
                path: path.child_index(index),
                data: IncrementalData::Items(finished.data),
                errors: finished.errors,
                has_next: false,
            };
            payload.has_next = self.has_next().await;
            return Some(payload);
        }
    }

    async fn execute_fragment(&mut self, fragment: DeferredFragment) -> IncrementalPayload {
        let mut execution = Execution::new(self.ctx.clone(), self.take_buffers());
        execution.enqueue_batch(
            &fragment.selection_set,
            fragment.parent,
            &fragment.path,
            &fragment.scoped,
        );
        execution.drain().await;
        let finished = execution.finish();
        self.buffers = finished.buffers;
        self.register(finished.deferred);

        IncrementalPayload {
            label: fragment.label,
            path: fragment.path,
            data: IncrementalData::Data(finished.data),
            errors: finished.errors,
            has_next: false,
        }
    }

    /// Drops exhausted streams at the front, so that the last payload reports `hasNext: false`.
    async fn has_next(&mut self) -> bool {
        if !self.fragments.is_empty() {
            return true;
        }
        while let Some(stream) = self.streams.front_mut() {
            let peeked = tokio::select! {
                biased;
                _ = self.ctx.cancellation.cancelled() => return false,
                item = Pin::new(&mut stream.stream).peek() => item.is_some(),
            };
            if peeked {
                return true;
            }
            self.streams.pop_front();
        }
        false
    }

    fn take_buffers(&mut self) -> BufferPool<ResultField> {
        let capacity = self.ctx.config.result_buffer_pool_capacity;
        std::mem::replace(&mut self.buffers, BufferPool::new(capacity))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncrementalData {
    /// Result of a deferred fragment, `None` if a non-null violation reached its root.
    Data(Option<Value>),
    /// Streamed list items.
    Items(Option<Value>),
}

/// One subsequent payload of an incremental response.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalPayload {
    pub label: Option<Arc<str>>,
    /// Object of a deferred fragment, or the first streamed item.
    pub path: ResponsePath,
    pub data: IncrementalData,
    pub errors: Vec<GraphqlError>,
    pub has_next: bool,
}

impl IncrementalPayload {
    pub fn data(&self) -> Option<&Value> {
        match &self.data {
            IncrementalData::Data(data) => data.as_ref(),
            IncrementalData::Items(_) => None,
        }
    }

    pub fn items(&self) -> Option<&Value> {
        match &self.data {
            IncrementalData::Items(items) => items.as_ref(),
            IncrementalData::Data(_) => None,
        }
    }
}

impl serde::Serialize for IncrementalPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        match &self.data {
            IncrementalData::Data(data) => map.serialize_entry("data", data)?,
            IncrementalData::Items(items) => map.serialize_entry("items", items)?,
        }
        map.serialize_entry("path", &self.path)?;
        if let Some(label) = &self.label {
            map.serialize_entry("label", label)?;
        }
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.serialize_entry("hasNext", &self.has_next)?;
        map.end()
    }
}
