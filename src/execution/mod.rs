pub mod batch;
pub mod context;
pub mod executor;
pub mod operators;

pub use batch::{BatchIdentity, BatchRef, ColumnBatch, RecordBatch};
pub use context::{ExecutionConfig, ExecutionContext};
pub use executor::Executor;
