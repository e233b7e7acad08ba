// Simple projection: drop and reorder columns without touching their data

use crate::error::{QueryError, Result};
use crate::execution::batch::{BatchIdentity, BatchRef, ColumnBatch, SchemaRef};
use crate::execution::context::{ExecutionConfig, ExecutionContext};
use crate::execution::operators::{BoxedOperator, OneInputNode, Operator};
use arrow::array::ArrayRef;
use arrow::datatypes::Field;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A batch that exposes only the columns of another, underlying batch
/// listed in its projection, in that order
///
/// The view can be repointed at a different underlying batch without
/// reallocating. It holds a strong handle to the batch it wraps.
#[derive(Debug)]
pub struct ProjectingBatch {
    batch: BatchRef,
    projection: Vec<u32>,
}

impl ProjectingBatch {
    pub fn new(batch: BatchRef, projection: &[u32]) -> Self {
        Self {
            batch,
            projection: projection.to_vec(),
        }
    }

    /// Wrap a different underlying batch, keeping the projection
    pub fn repoint(&mut self, batch: BatchRef) {
        self.batch = batch;
    }

    /// The underlying batch currently wrapped
    pub fn inner(&self) -> &BatchRef {
        &self.batch
    }

    pub fn projection(&self) -> &[u32] {
        &self.projection
    }
}

impl ColumnBatch for ProjectingBatch {
    fn width(&self) -> usize {
        self.projection.len()
    }

    fn num_rows(&self) -> usize {
        self.batch.read().num_rows()
    }

    fn column_at(&self, index: usize) -> ArrayRef {
        self.batch.read().column_at(self.projection[index] as usize)
    }

    fn all_columns(&self) -> Result<Vec<ArrayRef>> {
        Err(QueryError::Internal(
            "ProjectingBatch doesn't support all_columns()".to_string(),
        ))
    }

    fn append_column(&mut self, field: Field) {
        let mut batch = self.batch.write();
        batch.append_column(field);
        self.projection.push((batch.width() - 1) as u32);
    }
}

/// Operator that applies a simple projection to every batch of its input:
/// only the columns in the projection survive, in order
///
/// Output batches are `ProjectingBatch` views, one per distinct physical
/// input batch, reused across pulls when the input reuses its batch.
pub struct SimpleProjectOperator {
    input: OneInputNode,
    projection: Vec<u32>,
    schema: SchemaRef,
    views: HashMap<BatchIdentity, Arc<RwLock<ProjectingBatch>>>,
    // Cache size at which the next growth diagnostic is logged; doubles each time
    logging_threshold: usize,
}

impl SimpleProjectOperator {
    /// Build a simple projection over `input`
    ///
    /// When the projection is the identity over all `num_input_cols`
    /// columns, no operator is planned and `input` is returned as is.
    ///
    /// # Arguments
    /// * `input` - Operator producing the batches to project
    /// * `num_input_cols` - Number of columns in the input's batches
    /// * `projection` - Input column indices to keep, in output order (copied)
    ///
    /// # Returns
    /// Result containing the projecting operator, or `input` itself
    ///
    /// # Errors
    /// If a projection index is not below `num_input_cols`, or doesn't
    /// exist in the input schema
    pub fn build(
        input: BoxedOperator,
        num_input_cols: usize,
        projection: &[u32],
    ) -> Result<BoxedOperator> {
        Self::build_with_config(input, num_input_cols, projection, &ExecutionConfig::default())
    }

    /// Same as `build`, with the cache-growth logging threshold taken from `config`
    pub fn build_with_config(
        input: BoxedOperator,
        num_input_cols: usize,
        projection: &[u32],
        config: &ExecutionConfig,
    ) -> Result<BoxedOperator> {
        if num_input_cols == projection.len()
            && projection.iter().enumerate().all(|(i, &col)| col as usize == i)
        {
            return Ok(input);
        }

        Ok(Box::new(Self::try_new(input, num_input_cols, projection, config)?))
    }

    /// Create the projecting operator unconditionally, even for an identity projection
    pub fn try_new(
        input: BoxedOperator,
        num_input_cols: usize,
        projection: &[u32],
        config: &ExecutionConfig,
    ) -> Result<Self> {
        if let Some(&col) = projection.iter().find(|&&col| col as usize >= num_input_cols) {
            return Err(QueryError::Plan(format!(
                "Projection index {} out of range for input with {} columns",
                col, num_input_cols
            )));
        }

        let indices: Vec<usize> = projection.iter().map(|&col| col as usize).collect();
        let schema = Arc::new(input.schema().project(&indices)?);

        Ok(Self {
            input: OneInputNode::new(input),
            projection: projection.to_vec(),
            schema,
            views: HashMap::new(),
            logging_threshold: config.view_cache_logging_threshold,
        })
    }

    /// Number of distinct input batches seen so far, each with its own view
    pub fn cached_views(&self) -> usize {
        self.views.len()
    }

    pub fn logging_threshold(&self) -> usize {
        self.logging_threshold
    }

    /// View for the physical batch `batch`, created on first sight
    fn view_for(&mut self, batch: &BatchRef, ctx: &ExecutionContext) -> Arc<RwLock<ProjectingBatch>> {
        let key = BatchIdentity::of(batch);
        if let Some(view) = self.views.get(&key) {
            return view.clone();
        }

        // The view keeps `batch` alive, so `key` can't be reused by another
        // allocation while the entry exists.
        let view = Arc::new(RwLock::new(ProjectingBatch::new(batch.clone(), &self.projection)));
        self.views.insert(key, view.clone());
        if self.views.len() == self.logging_threshold {
            debug!(
                query_id = %ctx.query_id(),
                cache_size = self.views.len(),
                "simple projection: size of batch view cache"
            );
            self.logging_threshold *= 2;
        }
        view
    }
}

impl Operator for SimpleProjectOperator {
    fn init(&mut self) -> Result<()> {
        self.input.input_mut().init()
    }

    fn next_batch(&mut self, ctx: &ExecutionContext) -> Result<BatchRef> {
        let batch = self.input.input_mut().next_batch(ctx)?;
        let view = self.view_for(&batch, ctx);
        view.write().repoint(batch);
        Ok(view)
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn name(&self) -> &'static str {
        "SimpleProject"
    }

    fn explainable(&self) -> bool {
        false
    }

    fn child_count(&self) -> usize {
        self.input.child_count()
    }

    fn child(&self, index: usize) -> Option<&dyn Operator> {
        self.input.child(index)
    }
}
