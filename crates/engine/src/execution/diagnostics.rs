use crate::resolver::ResolverContext;

/// Instrumentation hooks invoked around resolver calls.
pub trait DiagnosticEvents: Send + Sync {
    /// Opens a scope around the resolution of a field value. The scope is released when the
    /// returned guard is dropped, whether the resolver succeeded, failed, panicked or was
    /// cancelled.
    fn resolve_field_value(&self, ctx: &ResolverContext) -> ActivityScope;
}

pub struct ActivityScope {
    span: tracing::Span,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl ActivityScope {
    pub fn new(span: tracing::Span) -> Self {
        Self { span, on_release: None }
    }

    pub fn none() -> Self {
        Self::new(tracing::Span::none())
    }

    #[must_use]
    pub fn on_release(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(callback));
        self
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl Drop for ActivityScope {
    fn drop(&mut self) {
        if let Some(callback) = self.on_release.take() {
            callback();
        }
    }
}

/// Opens a `resolve_field` span per resolver call.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticEvents for TracingDiagnostics {
    fn resolve_field_value(&self, ctx: &ResolverContext) -> ActivityScope {
        ActivityScope::new(tracing::debug_span!(
            "resolve_field",
            path = %ctx.path(),
            field = ctx.field_name(),
            parent_type = ctx.parent_type(),
        ))
    }
}
