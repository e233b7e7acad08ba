pub mod simple_project;
pub mod source;

// Export operators for use by executor
pub use simple_project::{ProjectingBatch, SimpleProjectOperator};
pub use source::{BatchSourceConfig, BatchSourceOperator};

use crate::error::Result;
use crate::execution::batch::{BatchRef, SchemaRef};
use crate::execution::context::ExecutionContext;

/// Trait for all execution operators in the query engine
/// Operators form a pull-based pipeline: each call to `next_batch` pulls
/// from upstream on demand and returns one batch
pub trait Operator: Send {
    /// Prepare the operator (and its inputs) for pulling
    /// Called once before the first `next_batch`
    fn init(&mut self) -> Result<()>;

    /// Pull the next batch
    ///
    /// A zero-row batch marks the end of the stream. The returned handle may
    /// be the same physical batch as on a previous call, overwritten in
    /// place, so it is only valid until the next call. Read guards taken on
    /// it must be released before pulling again.
    fn next_batch(&mut self, ctx: &ExecutionContext) -> Result<BatchRef>;

    /// Get the output schema of this operator
    fn schema(&self) -> SchemaRef;

    /// Short name used by EXPLAIN
    fn name(&self) -> &'static str;

    /// Whether this operator shows up in EXPLAIN output
    fn explainable(&self) -> bool {
        true
    }

    fn child_count(&self) -> usize {
        0
    }

    fn child(&self, _index: usize) -> Option<&dyn Operator> {
        None
    }
}

/// Boxed operator for dynamic dispatch
pub type BoxedOperator = Box<dyn Operator>;

/// An operator's single upstream input
pub struct OneInputNode {
    input: BoxedOperator,
}

impl OneInputNode {
    pub fn new(input: BoxedOperator) -> Self {
        Self { input }
    }

    pub fn input(&self) -> &dyn Operator {
        self.input.as_ref()
    }

    pub fn input_mut(&mut self) -> &mut dyn Operator {
        self.input.as_mut()
    }

    pub fn child_count(&self) -> usize {
        1
    }

    pub fn child(&self, index: usize) -> Option<&dyn Operator> {
        (index == 0).then(|| self.input())
    }
}
