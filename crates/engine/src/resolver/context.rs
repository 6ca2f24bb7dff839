use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{ObjectValue, ResolverError};
use crate::{
    operation::{Arguments, Selection, Variables},
    response::ResponsePath,
};

/// Value of the object whose field is being resolved.
#[derive(Debug, Clone)]
pub enum ParentValue {
    /// Root of the operation, with the optional initial value provided by the caller.
    Root(Option<Arc<Value>>),
    Json(Arc<Value>),
    Object(ObjectValue),
}

impl Default for ParentValue {
    fn default() -> Self {
        ParentValue::Root(None)
    }
}

impl ParentValue {
    /// Runtime type name carried by the value itself, if any.
    pub fn typename(&self) -> Option<Arc<str>> {
        match self {
            ParentValue::Json(value) => value.get("__typename").and_then(Value::as_str).map(Into::into),
            ParentValue::Object(object) => object
                .typename()
                .cloned()
                .or_else(|| object.as_json().and_then(|value| value.get("__typename")?.as_str().map(Into::into))),
            ParentValue::Root(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParentValue::Json(value) => Some(value),
            ParentValue::Object(object) => object.as_json(),
            ParentValue::Root(value) => value.as_deref(),
        }
    }
}

/// Context data visible to a field and everything below it. Persistent, so sharing it with every
/// child task is a reference count increment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedContext(im::HashMap<Arc<str>, Value>);

impl ScopedContext {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn with(&self, key: impl Into<Arc<str>>, value: Value) -> Self {
        Self(self.0.update(key.into(), value))
    }

    #[must_use]
    pub fn extend(&self, entries: impl IntoIterator<Item = (Arc<str>, Value)>) -> Self {
        let mut scope = self.0.clone();
        for (key, value) in entries {
            scope.insert(key, value);
        }
        Self(scope)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything a resolver knows about the field it resolves.
///
/// One context lives in each pooled task and is cleared, not reallocated, between rentals.
#[derive(Default)]
pub struct ResolverContext {
    selection: Option<Arc<Selection>>,
    parent: ParentValue,
    path: ResponsePath,
    response_index: usize,
    arguments: Arc<Arguments>,
    scoped: ScopedContext,
    variables: Arc<Variables>,
    cancellation: CancellationToken,
}

impl ResolverContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn init(
        &mut self,
        selection: Arc<Selection>,
        parent: ParentValue,
        path: ResponsePath,
        response_index: usize,
        scoped: ScopedContext,
        variables: Arc<Variables>,
        cancellation: CancellationToken,
    ) {
        self.selection = Some(selection);
        self.parent = parent;
        self.path = path;
        self.response_index = response_index;
        self.scoped = scoped;
        self.variables = variables;
        self.cancellation = cancellation;
    }

    pub(crate) fn set_arguments(&mut self, arguments: Arc<Arguments>) {
        self.arguments = arguments;
    }

    /// Drops every reference held from the previous rental.
    pub(crate) fn clear(&mut self) {
        self.selection = None;
        self.parent = ParentValue::default();
        self.path = ResponsePath::default();
        self.response_index = 0;
        self.arguments = Arc::default();
        self.scoped = ScopedContext::default();
        self.variables = Arc::default();
        self.cancellation = CancellationToken::new();
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.selection.is_none() && self.path.is_empty() && self.scoped.is_empty() && self.arguments.is_empty()
    }

    pub fn selection(&self) -> Option<&Arc<Selection>> {
        self.selection.as_ref()
    }

    pub fn field_name(&self) -> &str {
        self.selection.as_ref().map(|s| s.field_name()).unwrap_or_default()
    }

    pub fn response_name(&self) -> &str {
        self.selection.as_ref().map(|s| s.response_key().as_ref()).unwrap_or_default()
    }

    /// Name of the object type the field belongs to.
    pub fn parent_type(&self) -> &str {
        self.selection.as_ref().map(|s| s.parent_type().as_ref()).unwrap_or_default()
    }

    /// Position of the field within its selection set.
    pub fn response_index(&self) -> usize {
        self.response_index
    }

    pub fn path(&self) -> &ResponsePath {
        &self.path
    }

    pub fn parent(&self) -> &ParentValue {
        &self.parent
    }

    pub fn parent_json(&self) -> Option<&Value> {
        self.parent.as_json()
    }

    pub fn parent_object<T: std::any::Any>(&self) -> Option<&T> {
        match &self.parent {
            ParentValue::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn arguments(&self) -> &Arc<Arguments> {
        &self.arguments
    }

    pub fn argument_value(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Deserializes a coerced argument. Missing arguments deserialize from `null`.
    pub fn argument<T: DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        let value = self.arguments.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|err| ResolverError::new(format!("Invalid value for argument '{name}': {err}")))
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn scoped_context(&self) -> &ScopedContext {
        &self.scoped
    }

    pub fn scoped_value(&self, key: &str) -> Option<&Value> {
        self.scoped.get(key)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }
}
