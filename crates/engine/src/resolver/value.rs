use std::{any::Any, sync::Arc};

use error::GraphqlError;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;

/// Raw output of a resolver, before value completion.
pub enum ResolvedValue {
    Null,
    Value(Value),
    Object(ObjectValue),
    List(Vec<ResolvedValue>),
    /// Asynchronous sequence, drained or streamed depending on the field.
    Stream(BoxStream<'static, ResolvedValue>),
    /// Synchronous but potentially slow sequence, such as a database cursor.
    Lazy(LazyList),
    /// Application error, reported as a field error.
    Error(GraphqlError),
    /// Value with additional scoped context made visible to the whole subtree below it.
    Scoped(Box<ResolvedValue>, Vec<(Arc<str>, Value)>),
}

impl ResolvedValue {
    pub fn from_serializable(value: impl serde::Serialize) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(ResolvedValue::Value)
    }

    pub fn list(items: impl IntoIterator<Item = impl Into<ResolvedValue>>) -> Self {
        ResolvedValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn stream(stream: impl Stream<Item = ResolvedValue> + Send + 'static) -> Self {
        ResolvedValue::Stream(stream.boxed())
    }

    pub fn lazy<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ResolvedValue>,
        I::IntoIter: Send + 'static,
    {
        ResolvedValue::Lazy(LazyList(Box::new(items.into_iter())))
    }

    #[must_use]
    pub fn with_scoped_value(self, key: impl Into<Arc<str>>, scoped: Value) -> Self {
        match self {
            ResolvedValue::Scoped(inner, mut scope) => {
                scope.push((key.into(), scoped));
                ResolvedValue::Scoped(inner, scope)
            }
            value => ResolvedValue::Scoped(Box::new(value), vec![(key.into(), scoped)]),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            ResolvedValue::Null | ResolvedValue::Value(Value::Null) => true,
            ResolvedValue::Scoped(inner, _) => inner.is_null(),
            _ => false,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ResolvedValue::Null => "null",
            ResolvedValue::Value(Value::Array(_)) | ResolvedValue::List(_) => "list",
            ResolvedValue::Value(_) => "value",
            ResolvedValue::Object(_) => "object",
            ResolvedValue::Stream(_) => "stream",
            ResolvedValue::Lazy(_) => "lazy list",
            ResolvedValue::Error(_) => "error",
            ResolvedValue::Scoped(inner, _) => inner.kind(),
        }
    }
}

impl std::fmt::Debug for ResolvedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedValue::Null => f.write_str("Null"),
            ResolvedValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ResolvedValue::Object(object) => f.debug_tuple("Object").field(object).finish(),
            ResolvedValue::List(items) => f.debug_tuple("List").field(items).finish(),
            ResolvedValue::Stream(_) => f.write_str("Stream(..)"),
            ResolvedValue::Lazy(_) => f.write_str("Lazy(..)"),
            ResolvedValue::Error(error) => f.debug_tuple("Error").field(error).finish(),
            ResolvedValue::Scoped(inner, scope) => f.debug_tuple("Scoped").field(inner).field(scope).finish(),
        }
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        ResolvedValue::Value(value)
    }
}

impl From<ObjectValue> for ResolvedValue {
    fn from(object: ObjectValue) -> Self {
        ResolvedValue::Object(object)
    }
}

impl From<GraphqlError> for ResolvedValue {
    fn from(error: GraphqlError) -> Self {
        ResolvedValue::Error(error)
    }
}

impl<T: Into<ResolvedValue>> From<Option<T>> for ResolvedValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ResolvedValue::Null)
    }
}

pub struct LazyList(pub(crate) Box<dyn Iterator<Item = ResolvedValue> + Send>);

impl Iterator for LazyList {
    type Item = ResolvedValue;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// Opaque application object handed from a resolver to the resolvers of its fields.
#[derive(Clone)]
pub struct ObjectValue {
    typename: Option<Arc<str>>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl std::fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectValue")
            .field("typename", &self.typename)
            .finish_non_exhaustive()
    }
}

impl ObjectValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            typename: None,
            inner: Arc::new(value),
        }
    }

    /// JSON object whose fields are read by the default resolver.
    pub fn json(typename: impl Into<Arc<str>>, value: Value) -> Self {
        Self::new(value).with_typename(typename)
    }

    /// Concrete object type, used to resolve interfaces and unions.
    #[must_use]
    pub fn with_typename(mut self, typename: impl Into<Arc<str>>) -> Self {
        self.typename = Some(typename.into());
        self
    }

    pub fn typename(&self) -> Option<&Arc<str>> {
        self.typename.as_ref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub(crate) fn as_json(&self) -> Option<&Value> {
        self.downcast_ref::<Value>()
    }
}
