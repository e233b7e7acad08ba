// Public API for the query engine

pub mod error;
pub mod execution;

pub use error::{QueryError, Result};
