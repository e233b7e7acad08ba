// In-memory batch source with reusable output buffers

use crate::error::{QueryError, Result};
use crate::execution::batch::{BatchRef, RecordBatch, SchemaRef};
use crate::execution::context::ExecutionContext;
use crate::execution::operators::Operator;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Configuration for a batch source
#[derive(Debug, Clone)]
pub struct BatchSourceConfig {
    /// Maximum number of rows per emitted batch (default: 1024)
    pub batch_size: usize,
    /// Number of physical output buffers cycled through (default: 1)
    pub num_buffers: usize,
    /// Allocate a brand new output buffer on every pull instead of
    /// reusing the ring (default: false)
    pub fresh_buffers: bool,
}

impl Default for BatchSourceConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            num_buffers: 1,
            fresh_buffers: false,
        }
    }
}

/// Source operator that emits in-memory data in chunks of `batch_size` rows
///
/// Output goes through a small ring of buffers that are overwritten in
/// place, the way vectorized scans reuse their output batch. Once the data
/// is exhausted every pull returns a zero-row batch.
pub struct BatchSourceOperator {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    config: BatchSourceConfig,
    buffers: Vec<Arc<RwLock<RecordBatch>>>,
    batch_idx: usize,
    row_offset: usize,
    pulls: usize,
    exhausted: bool,
}

impl BatchSourceOperator {
    /// Create a new source over `batches`
    ///
    /// # Arguments
    /// * `schema` - Schema shared by every batch
    /// * `batches` - Data to emit, split into chunks of at most `batch_size` rows
    /// * `config` - Chunk size and output buffer reuse settings
    ///
    /// # Returns
    /// Result containing the BatchSourceOperator, or an error
    ///
    /// # Errors
    /// If a batch doesn't match `schema`, or `batch_size`/`num_buffers` is zero
    pub fn new(
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
        config: BatchSourceConfig,
    ) -> Result<Self> {
        if config.batch_size == 0 || config.num_buffers == 0 {
            return Err(QueryError::Plan(
                "batch source needs a non-zero batch_size and num_buffers".to_string(),
            ));
        }
        if let Some(idx) = batches.iter().position(|b| b.schema() != &schema) {
            return Err(QueryError::Schema(format!(
                "Batch {} doesn't match the source schema",
                idx
            )));
        }

        let buffers = (0..config.num_buffers)
            .map(|_| Arc::new(RwLock::new(RecordBatch::new_empty(schema.clone()))))
            .collect();

        Ok(Self {
            schema,
            batches,
            config,
            buffers,
            batch_idx: 0,
            row_offset: 0,
            pulls: 0,
            exhausted: false,
        })
    }

    /// Create a source with default configuration, taking the schema from the first batch
    pub fn from_batches(batches: Vec<RecordBatch>) -> Result<Self> {
        let schema = batches
            .first()
            .map(|b| b.schema().clone())
            .ok_or_else(|| QueryError::Plan("batch source needs at least one batch".to_string()))?;
        Self::new(schema, batches, BatchSourceConfig::default())
    }

    /// Next chunk of at most `batch_size` rows; empty once all data was emitted
    fn next_chunk(&mut self) -> Result<RecordBatch> {
        while let Some(batch) = self.batches.get(self.batch_idx) {
            if self.row_offset < batch.num_rows() {
                let length = (batch.num_rows() - self.row_offset).min(self.config.batch_size);
                let chunk = batch.slice(self.row_offset, length)?;
                self.row_offset += length;
                return Ok(chunk);
            }
            self.batch_idx += 1;
            self.row_offset = 0;
        }
        Ok(RecordBatch::new_empty(self.schema.clone()))
    }
}

impl Operator for BatchSourceOperator {
    fn init(&mut self) -> Result<()> {
        self.batch_idx = 0;
        self.row_offset = 0;
        self.exhausted = false;
        Ok(())
    }

    fn next_batch(&mut self, ctx: &ExecutionContext) -> Result<BatchRef> {
        let chunk = self.next_chunk()?;
        if chunk.is_empty() && !self.exhausted {
            self.exhausted = true;
            debug!(query_id = %ctx.query_id(), pulls = self.pulls, "batch source exhausted");
        }

        let buffer = if self.config.fresh_buffers {
            Arc::new(RwLock::new(RecordBatch::new_empty(self.schema.clone())))
        } else {
            self.buffers[self.pulls % self.buffers.len()].clone()
        };
        self.pulls += 1;

        buffer.write().refill(&chunk);
        Ok(buffer)
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn name(&self) -> &'static str {
        "BatchSource"
    }
}
