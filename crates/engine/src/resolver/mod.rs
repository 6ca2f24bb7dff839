mod context;
mod value;

use std::sync::Arc;

pub use context::{ParentValue, ResolverContext, ScopedContext};
use error::{ErrorCode, GraphqlError};
use futures::{future::BoxFuture, FutureExt};
pub use value::{LazyList, ObjectValue, ResolvedValue};

pub type ResolverResult = Result<ResolvedValue, ResolverError>;
pub type PureResolverFn = Arc<dyn Fn(&ResolverContext) -> ResolverResult + Send + Sync>;
pub type AsyncResolverFn = Arc<dyn Fn(&ResolverContext) -> BoxFuture<'static, ResolverResult> + Send + Sync>;

/// How a field gets its raw value.
///
/// Fields resolved by a pure function are executed inline by the scheduler, asynchronous
/// resolvers are awaited concurrently with their siblings.
#[derive(Clone)]
pub enum Resolver {
    Pure(PureResolverFn),
    Async(AsyncResolverFn),
    /// Reads the field from a JSON parent value.
    Default,
    /// Name of the concrete object type.
    Typename,
}

impl Resolver {
    pub fn pure(resolver: impl Fn(&ResolverContext) -> ResolverResult + Send + Sync + 'static) -> Self {
        Resolver::Pure(Arc::new(resolver))
    }

    /// Asynchronous resolver. The future must own whatever it needs from the context, the
    /// context itself is reused once the task completes.
    pub fn from_async<F, Fut>(resolver: F) -> Self
    where
        F: Fn(&ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ResolverResult> + Send + 'static,
    {
        Resolver::Async(Arc::new(move |ctx| resolver(ctx).boxed()))
    }

    pub fn is_pure(&self) -> bool {
        !matches!(self, Resolver::Async(_))
    }

    /// Resolvers that never suspend, called directly by pure tasks.
    pub(crate) fn resolve_sync(&self, ctx: &ResolverContext) -> Option<ResolverResult> {
        match self {
            Resolver::Pure(resolver) => Some(resolver(ctx)),
            Resolver::Default => Some(resolve_default(ctx)),
            Resolver::Typename => Some(Ok(ResolvedValue::Value(serde_json::Value::String(
                ctx.parent_type().to_string(),
            )))),
            Resolver::Async(_) => None,
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::fmt::Display for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolver::Pure(_) => write!(f, "Pure resolver"),
            Resolver::Async(_) => write!(f, "Async resolver"),
            Resolver::Default => write!(f, "Default resolver"),
            Resolver::Typename => write!(f, "Typename resolver"),
        }
    }
}

fn resolve_default(ctx: &ResolverContext) -> ResolverResult {
    match ctx.parent() {
        ParentValue::Json(value) => Ok(value
            .get(ctx.field_name())
            .cloned()
            .map(ResolvedValue::Value)
            .unwrap_or(ResolvedValue::Null)),
        ParentValue::Object(object) => match object.as_json() {
            Some(value) => Ok(value
                .get(ctx.field_name())
                .cloned()
                .map(ResolvedValue::Value)
                .unwrap_or(ResolvedValue::Null)),
            None => Err(ResolverError::MissingResolver(ctx.parent_type().into(), ctx.field_name().into())),
        },
        ParentValue::Root(value) => Ok(value
            .as_deref()
            .and_then(|value| value.get(ctx.field_name()))
            .cloned()
            .map(ResolvedValue::Value)
            .unwrap_or(ResolvedValue::Null)),
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolverError {
    #[error("{0}")]
    Message(String),
    #[error("No resolver for field '{0}.{1}' and the parent value has no JSON representation")]
    MissingResolver(String, String),
    #[error("{0}")]
    Graphql(GraphqlError),
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        ResolverError::Message(message.into())
    }
}

impl From<GraphqlError> for ResolverError {
    fn from(error: GraphqlError) -> Self {
        ResolverError::Graphql(error)
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        ResolverError::Message(message)
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        ResolverError::Message(message.to_string())
    }
}

impl From<ResolverError> for GraphqlError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::Message(message) => GraphqlError::new(message, ErrorCode::ResolverError),
            ResolverError::MissingResolver(..) => GraphqlError::new(err.to_string(), ErrorCode::InternalServerError),
            ResolverError::Graphql(err) => err,
        }
    }
}
