// Per-query execution settings

/// Build-time configuration for pipeline operators
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Number of cached projecting views at which the first cache-growth
    /// diagnostic is logged (default: 128). Doubles after every report.
    pub view_cache_logging_threshold: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            view_cache_logging_threshold: 128,
        }
    }
}

/// Context passed to every `next_batch` call of a pipeline
///
/// Operator settings such as `ExecutionConfig` are fixed when the operator
/// is built; the context only identifies the running query.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    query_id: String,
}

impl ExecutionContext {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
        }
    }

    /// Tag attached to log events emitted while running this query
    pub fn query_id(&self) -> &str {
        &self.query_id
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new("query")
    }
}
