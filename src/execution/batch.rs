// Column batches and the shared handles operators pass between each other

use crate::error::{QueryError, Result};
use arrow::array::{new_empty_array, new_null_array, Array, ArrayRef};
use arrow::datatypes::{Field, FieldRef};
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;
pub use arrow::datatypes::{Schema, SchemaRef};

/// Columnar view of a chunk of rows as seen by operators
///
/// Implemented both by owned batches and by views that reshape another
/// batch without copying it.
pub trait ColumnBatch: Send + Sync + Debug {
    /// Number of columns visible through this batch
    fn width(&self) -> usize;

    /// Number of rows in every column
    fn num_rows(&self) -> usize;

    /// Column at output position `index`
    ///
    /// # Panics
    /// If `index >= self.width()`. Callers iterate `0..width()`.
    fn column_at(&self, index: usize) -> ArrayRef;

    /// All columns at once, in output order
    fn all_columns(&self) -> Result<Vec<ArrayRef>>;

    /// Append a new all-null column described by `field`.
    /// It becomes the last column of the batch.
    fn append_column(&mut self, field: Field);
}

/// Shared, in-place mutable handle to a batch
///
/// Upstream operators usually hand out the same handle on every pull and
/// overwrite its contents, so the handle itself (not its contents) is what
/// identifies a physical batch.
pub type BatchRef = Arc<RwLock<dyn ColumnBatch>>;

/// Identity of a physical batch: the address of its shared allocation
///
/// Only meaningful while some holder keeps the handle alive; after the last
/// `BatchRef` is dropped the address may be reused by a new batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchIdentity(usize);

impl BatchIdentity {
    pub fn of(batch: &BatchRef) -> Self {
        Self(Arc::as_ptr(batch) as *const () as usize)
    }
}

/// RecordBatch owns Arrow columns for vectorized execution
/// Provides an abstraction layer over Arrow's RecordBatch that can be
/// refilled in place and grown with appended columns
#[derive(Clone, Debug)]
pub struct RecordBatch {
    schema: SchemaRef,
    columns: Vec<ArrayRef>,
    num_rows: usize,
}

impl RecordBatch {
    /// Create a new RecordBatch from a schema and columns
    ///
    /// # Arguments
    /// * `schema` - The schema describing the columns
    /// * `columns` - Vector of Arrow arrays, one per column
    ///
    /// # Errors
    /// Returns an error if the number of columns doesn't match the schema,
    /// or if column lengths are inconsistent
    pub fn try_new(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<Self> {
        if schema.fields().len() != columns.len() {
            return Err(QueryError::Schema(format!(
                "Schema has {} fields but {} columns provided",
                schema.fields().len(),
                columns.len()
            )));
        }

        let num_rows = columns.first().map(|col| col.len()).unwrap_or(0);
        for (idx, col) in columns.iter().enumerate() {
            if col.len() != num_rows {
                return Err(QueryError::Schema(format!(
                    "Column {} has length {} but expected {}",
                    idx,
                    col.len(),
                    num_rows
                )));
            }
        }

        Ok(Self {
            schema,
            columns,
            num_rows,
        })
    }

    /// Zero-row batch with the given schema. Sources use it as the end-of-stream marker.
    pub fn new_empty(schema: SchemaRef) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|f| new_empty_array(f.data_type()))
            .collect();
        Self {
            schema,
            columns,
            num_rows: 0,
        }
    }

    /// Wrap this batch in a shared handle so operators can pass it around by identity
    pub fn into_ref(self) -> BatchRef {
        Arc::new(RwLock::new(self))
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ArrayRef] {
        &self.columns
    }

    /// Get a specific column by index
    pub fn column(&self, index: usize) -> Result<&ArrayRef> {
        self.columns.get(index).ok_or_else(|| {
            QueryError::Schema(format!(
                "Column index {} out of bounds (batch has {} columns)",
                index,
                self.columns.len()
            ))
        })
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ArrayRef> {
        let index = self.schema.fields().iter().position(|f| f.name() == name)?;
        self.columns.get(index)
    }

    /// Copy a subset of columns into a new, independent batch
    ///
    /// Unlike a projecting view this allocates a new schema and column list.
    ///
    /// # Arguments
    /// * `indices` - Column indices to select, in output order
    ///
    /// # Returns
    /// A new RecordBatch containing only the selected columns
    pub fn select_columns(&self, indices: &[usize]) -> Result<Self> {
        let schema = Arc::new(self.schema.project(indices)?);
        let columns = indices
            .iter()
            .map(|&idx| self.column(idx).cloned())
            .collect::<Result<Vec<_>>>()?;

        Self::try_new(schema, columns)
    }

    /// Slice this batch to return a new batch with rows from `offset` to `offset + length`
    pub fn slice(&self, offset: usize, length: usize) -> Result<Self> {
        if offset + length > self.num_rows {
            return Err(QueryError::Schema(format!(
                "Slice range [{}, {}) out of bounds for batch with {} rows",
                offset,
                offset + length,
                self.num_rows
            )));
        }

        let sliced_columns: Vec<ArrayRef> = self
            .columns
            .iter()
            .map(|col| col.slice(offset, length))
            .collect();

        Self::try_new(self.schema.clone(), sliced_columns)
    }

    /// Concatenate multiple RecordBatches together
    /// All batches must have the same schema
    pub fn concat(batches: &[Self]) -> Result<Self> {
        let first = batches
            .first()
            .ok_or_else(|| QueryError::Schema("Cannot concatenate empty batch list".to_string()))?;

        for (idx, batch) in batches.iter().enumerate().skip(1) {
            if batch.schema() != first.schema() {
                return Err(QueryError::Schema(format!(
                    "Batch {} has different schema than first batch",
                    idx
                )));
            }
        }

        let concatenated_columns = (0..first.num_columns())
            .map(|col_idx| {
                let refs: Vec<&dyn Array> = batches
                    .iter()
                    .map(|batch| batch.columns[col_idx].as_ref())
                    .collect();
                arrow_select::concat::concat(&refs).map_err(QueryError::from)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::try_new(first.schema.clone(), concatenated_columns)
    }

    /// Overwrite this batch's contents with `next`, keeping the buffer itself
    ///
    /// Columns appended to this buffer beyond `next`'s width survive the
    /// refill as all-null columns of the new row count, so views that
    /// exposed them stay in bounds.
    pub fn refill(&mut self, next: &RecordBatch) {
        let base_width = next.num_columns();
        if self.columns.len() <= base_width {
            self.schema = next.schema.clone();
            self.columns = next.columns.clone();
            self.num_rows = next.num_rows;
            return;
        }

        let mut fields: Vec<FieldRef> = next.schema.fields().iter().cloned().collect();
        let mut columns = next.columns.clone();
        for field in self.schema.fields().iter().skip(base_width) {
            columns.push(new_null_array(field.data_type(), next.num_rows));
            fields.push(field.clone());
        }

        self.schema = Arc::new(Schema::new(fields));
        self.columns = columns;
        self.num_rows = next.num_rows;
    }

    /// Check if the batch is empty (has zero rows)
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }
}

impl ColumnBatch for RecordBatch {
    fn width(&self) -> usize {
        self.columns.len()
    }

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn column_at(&self, index: usize) -> ArrayRef {
        self.columns[index].clone()
    }

    fn all_columns(&self) -> Result<Vec<ArrayRef>> {
        Ok(self.columns.clone())
    }

    fn append_column(&mut self, field: Field) {
        let field = field.with_nullable(true);
        self.columns
            .push(new_null_array(field.data_type(), self.num_rows));

        let mut fields: Vec<FieldRef> = self.schema.fields().iter().cloned().collect();
        fields.push(Arc::new(field));
        self.schema = Arc::new(Schema::new(fields));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Int32Array, StringArray};
    use arrow::datatypes::DataType;

    fn create_test_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("active", DataType::Boolean, false),
        ]))
    }

    fn create_test_batch() -> RecordBatch {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from(vec![1, 2, 3])),
            Arc::new(StringArray::from(vec!["Alice", "Bob", "Charlie"])),
            Arc::new(BooleanArray::from(vec![true, false, true])),
        ];

        RecordBatch::try_new(create_test_schema(), columns).unwrap()
    }

    #[test]
    fn test_column_access() {
        let batch = create_test_batch();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.width(), 3);

        assert!(Arc::ptr_eq(batch.column(1).unwrap(), &batch.column_at(1)));
        assert_eq!(batch.column_by_name("id").unwrap().len(), 3);
        assert!(batch.column(10).is_err());
        assert!(batch.column_by_name("nonexistent").is_none());
        assert_eq!(batch.all_columns().unwrap().len(), 3);
    }

    #[test]
    fn test_select_columns_copies_schema() {
        let batch = create_test_batch();

        let selected = batch.select_columns(&[2, 0]).unwrap();
        assert_eq!(selected.num_columns(), 2);
        assert_eq!(selected.schema().field(0).name(), "active");
        assert!(Arc::ptr_eq(selected.column(1).unwrap(), batch.column(0).unwrap()));
        assert!(batch.select_columns(&[3]).is_err());
    }

    #[test]
    fn test_slice_and_concat() {
        let batch = create_test_batch();

        let sliced = batch.slice(1, 2).unwrap();
        assert_eq!(sliced.num_rows(), 2);
        assert!(batch.slice(2, 2).is_err());

        let concatenated = RecordBatch::concat(&[batch.clone(), sliced]).unwrap();
        assert_eq!(concatenated.num_rows(), 5);
        assert_eq!(concatenated.num_columns(), 3);
        assert!(RecordBatch::concat(&[]).is_err());
    }

    #[test]
    fn test_empty_batch() {
        let batch = RecordBatch::new_empty(create_test_schema());
        assert!(batch.is_empty());
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.column(2).unwrap().data_type(), &DataType::Boolean);
    }

    #[test]
    fn test_invalid_batch() {
        let schema = create_test_schema();

        let columns: Vec<ArrayRef> = vec![Arc::new(Int32Array::from(vec![1, 2, 3]))];
        assert!(matches!(
            RecordBatch::try_new(schema.clone(), columns),
            Err(QueryError::Schema(_))
        ));

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from(vec![1, 2, 3])),
            Arc::new(StringArray::from(vec!["Alice", "Bob"])),
            Arc::new(BooleanArray::from(vec![true, false, true])),
        ];
        assert!(RecordBatch::try_new(schema, columns).is_err());
    }

    #[test]
    fn test_append_column() {
        let mut batch = create_test_batch();
        batch.append_column(Field::new("score", DataType::Float64, false));

        assert_eq!(batch.width(), 4);
        let appended = batch.column_at(3);
        assert_eq!(appended.len(), 3);
        assert_eq!(appended.null_count(), 3);
        assert!(batch.schema().field(3).is_nullable());
        // Still a valid Arrow batch
        let arrow_batch = arrow::record_batch::RecordBatch::try_new(
            batch.schema().clone(),
            batch.columns().to_vec(),
        );
        assert!(arrow_batch.is_ok());
    }

    #[test]
    fn test_refill_keeps_appended_columns() {
        let mut buffer = create_test_batch();
        buffer.append_column(Field::new("score", DataType::Float64, true));

        let next = create_test_batch().slice(0, 2).unwrap();
        buffer.refill(&next);

        assert_eq!(buffer.num_rows(), 2);
        assert_eq!(buffer.width(), 4);
        assert!(Arc::ptr_eq(&buffer.column_at(0), next.column(0).unwrap()));
        assert_eq!(buffer.column_at(3).len(), 2);
        assert_eq!(buffer.schema().field(3).name(), "score");
    }

    #[test]
    fn test_refill_without_appended_columns_shares_schema() {
        let mut buffer = RecordBatch::new_empty(create_test_schema());
        let next = create_test_batch();
        buffer.refill(&next);

        assert!(Arc::ptr_eq(buffer.schema(), next.schema()));
        assert_eq!(buffer.num_rows(), 3);
    }

    #[test]
    fn test_batch_identity() {
        let a = create_test_batch().into_ref();
        let b = create_test_batch().into_ref();
        let a2 = a.clone();

        assert_eq!(BatchIdentity::of(&a), BatchIdentity::of(&a2));
        assert_ne!(BatchIdentity::of(&a), BatchIdentity::of(&b));

        // Contents change, identity doesn't
        a.write().append_column(Field::new("extra", DataType::Int32, true));
        assert_eq!(BatchIdentity::of(&a), BatchIdentity::of(&a2));
        assert_eq!(a2.read().width(), 4);
    }
}
