use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use engine::{resolver::ResolverContext, ActivityScope, DiagnosticEvents};

/// Counts opened and released resolver scopes, and records the order in which fields started.
#[derive(Clone, Default)]
pub struct CountingDiagnostics {
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    started: Arc<Mutex<Vec<String>>>,
}

impl CountingDiagnostics {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Response paths of the resolved fields, in call order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl DiagnosticEvents for CountingDiagnostics {
    fn resolve_field_value(&self, ctx: &ResolverContext) -> ActivityScope {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(ctx.path().to_string());
        let released = self.released.clone();
        ActivityScope::none().on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}
