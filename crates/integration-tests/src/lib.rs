#![allow(unused_crate_dependencies, clippy::panic)]

pub mod diagnostics;

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use engine::{
    operation::{Operation, SelectionNode, Variables},
    resolver::{ResolvedValue, Resolver, ResolverResult},
    schema::Schema,
    DeferredWork, Engine, ExecutionOutput, ExecutionRequest, IncrementalPayload,
};
use futures::StreamExt;
use serde_json::Value;
use tokio::runtime::Runtime;

pub use diagnostics::CountingDiagnostics;

#[ctor::ctor]
fn setup_logging() {
    let filter = tracing_subscriber::filter::EnvFilter::builder()
        .parse(std::env::var("RUST_LOG").unwrap_or("engine=debug".to_string()))
        .unwrap();
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .without_time()
        .init();
}

pub fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    })
}

/// Query against `schema`, panicking on operation errors.
pub fn query(schema: &Schema, selections: impl IntoIterator<Item = impl Into<SelectionNode>>) -> Arc<Operation> {
    Arc::new(Operation::query(schema, selections).unwrap())
}

pub fn mutation(schema: &Schema, selections: impl IntoIterator<Item = impl Into<SelectionNode>>) -> Arc<Operation> {
    Arc::new(Operation::mutation(schema, selections).unwrap())
}

pub struct TestRequest {
    engine: Engine,
    request: ExecutionRequest,
}

impl TestRequest {
    pub fn new(schema: &Arc<Schema>, operation: Arc<Operation>) -> Self {
        Self {
            engine: Engine::default(),
            request: ExecutionRequest::new(schema.clone(), operation),
        }
    }

    #[must_use]
    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: Value) -> Self {
        self.request = self.request.variables(Variables::from_json(variables));
        self
    }

    #[must_use]
    pub fn root_value(mut self, value: Value) -> Self {
        self.request = self.request.root_value(value);
        self
    }

    #[must_use]
    pub fn with_request(mut self, f: impl FnOnce(ExecutionRequest) -> ExecutionRequest) -> Self {
        self.request = f(self.request);
        self
    }

    pub async fn execute(self) -> ExecutionOutput {
        self.engine.execute(self.request).await
    }
}

/// Every remaining incremental payload, in delivery order.
pub async fn collect_payloads(deferred: DeferredWork) -> Vec<IncrementalPayload> {
    deferred.into_stream().collect().await
}

pub fn value(value: Value) -> ResolverResult {
    Ok(ResolvedValue::Value(value))
}

/// Pure resolver always returning `value`.
pub fn constant(value: Value) -> Resolver {
    Resolver::pure(move |_| Ok(ResolvedValue::Value(value.clone())))
}

/// Asynchronous resolver returning `value` after `delay`.
pub fn delayed(delay: Duration, result: Value) -> Resolver {
    Resolver::from_async(move |_| {
        let result = result.clone();
        async move {
            tokio::time::sleep(delay).await;
            value(result)
        }
    })
}
