// Execution engine coordinator

use crate::error::Result;
use crate::execution::batch::{ColumnBatch, RecordBatch, SchemaRef};
use crate::execution::context::ExecutionContext;
use crate::execution::operators::Operator;
use arrow::array::ArrayRef;
use tracing::{debug, info};

/// Executor that drives a pull-based operator pipeline to completion
/// Materializes every output batch, since pipelines reuse their output
/// batches from one pull to the next
pub struct Executor;

impl Executor {
    /// Create a new executor
    pub fn new() -> Self {
        Self
    }

    /// Initialize `root` and pull from it until it returns a zero-row batch
    ///
    /// # Arguments
    /// * `root` - Last operator of the pipeline
    /// * `ctx` - Context passed to every pull
    ///
    /// # Returns
    /// Owned copies (sharing column data) of every non-empty output batch
    pub fn execute(
        &self,
        root: &mut dyn Operator,
        ctx: &ExecutionContext,
    ) -> Result<Vec<RecordBatch>> {
        debug!(query_id = %ctx.query_id(), root = root.name(), "starting pipeline");
        root.init()?;

        let schema = root.schema();
        let mut batches = Vec::new();
        let mut total_rows = 0;
        loop {
            let batch = root.next_batch(ctx)?;
            let batch = batch.read();
            if batch.num_rows() == 0 {
                break;
            }
            total_rows += batch.num_rows();
            batches.push(Self::materialize(&*batch, &schema)?);
        }

        info!(
            query_id = %ctx.query_id(),
            batches = batches.len(),
            rows = total_rows,
            "pipeline finished"
        );
        Ok(batches)
    }

    /// Run the pipeline and concatenate its output into a single batch
    pub fn execute_to_single(
        &self,
        root: &mut dyn Operator,
        ctx: &ExecutionContext,
    ) -> Result<RecordBatch> {
        let batches = self.execute(root, ctx)?;
        if batches.is_empty() {
            return Ok(RecordBatch::new_empty(root.schema()));
        }
        RecordBatch::concat(&batches)
    }

    /// Copy the visible columns of `batch` into an owned RecordBatch
    /// Only the column handles are copied, never the values
    pub fn materialize(batch: &dyn ColumnBatch, schema: &SchemaRef) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = (0..batch.width()).map(|i| batch.column_at(i)).collect();
        RecordBatch::try_new(schema.clone(), columns)
    }

    /// Describe the operator tree, one line per explainable operator
    /// Children are indented under their parent; operators that are not
    /// explainable are skipped and their children take their place
    pub fn explain(&self, root: &dyn Operator) -> Vec<String> {
        let mut lines = Vec::new();
        Self::explain_node(root, 0, &mut lines);
        lines
    }

    fn explain_node(op: &dyn Operator, depth: usize, lines: &mut Vec<String>) {
        let child_depth = if op.explainable() {
            lines.push(format!("{}{}", "  ".repeat(depth), op.name()));
            depth + 1
        } else {
            depth
        };
        for i in 0..op.child_count() {
            if let Some(child) = op.child(i) {
                Self::explain_node(child, child_depth, lines);
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
