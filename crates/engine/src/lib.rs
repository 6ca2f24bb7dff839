#![deny(clippy::future_not_send, unused_crate_dependencies)]

mod config;
mod engine;
mod execution;
pub mod operation;
pub mod resolver;
mod response;
pub mod schema;

pub use config::{ConfigError, ExecutionConfig};
pub use engine::{Engine, ExecutionOutput, ExecutionRequest};
pub use error::{ErrorCode, ErrorPath, GraphqlError, Location};
pub use execution::{
    ActivityScope, DeferredWork, DiagnosticEvents, IncrementalData, IncrementalPayload, PoolStatistics,
    SchedulerStatistics, TaskPoolStatistics, TracingDiagnostics,
};
pub use response::{PathSegment, Response, ResponsePath};
