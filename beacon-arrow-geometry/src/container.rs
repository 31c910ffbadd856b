use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryArray};
use arrow::datatypes::{FieldRef, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use datafusion::execution::memory_pool::MemoryPool;
use indexmap::IndexMap;

use crate::column::{BinaryColumn, BinaryColumnBuffer};
use crate::error::Result;

/// A parent container of named binary columns sharing one memory pool.
///
/// Children keep their insertion order, which is also the column order of the exported
/// schema and record batch.
#[derive(Debug)]
pub struct ColumnContainer {
    pool: Arc<dyn MemoryPool>,
    columns: IndexMap<String, BinaryColumn>,
}

impl ColumnContainer {
    pub fn new(pool: Arc<dyn MemoryPool>) -> Self {
        Self {
            pool,
            columns: IndexMap::new(),
        }
    }

    pub fn pool(&self) -> &Arc<dyn MemoryPool> {
        &self.pool
    }

    /// Return the child named like `field`, allocating it from `field` if it does not exist.
    ///
    /// An existing child keeps the descriptor it was created with. A child that was released
    /// is reopened empty.
    pub fn add_or_get(&mut self, field: FieldRef) -> &mut BinaryColumn {
        let pool = &self.pool;
        let column = self
            .columns
            .entry(field.name().clone())
            .or_insert_with(|| {
                tracing::debug!("Adding child column '{}' to container", field.name());
                BinaryColumn::new(field, pool)
            });
        column.reopen();
        column
    }

    pub fn column(&self, name: &str) -> Option<&BinaryColumn> {
        self.columns.get(name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut BinaryColumn> {
        self.columns.get_mut(name)
    }

    /// Detach a child, handing its ownership to the caller.
    pub fn remove(&mut self, name: &str) -> Option<BinaryColumn> {
        self.columns.shift_remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Largest value count among the children.
    pub fn row_count(&self) -> usize {
        self.columns
            .values()
            .map(|column| column.value_count())
            .max()
            .unwrap_or(0)
    }

    /// Extend or truncate every child to `count` slots.
    pub fn set_row_count(&mut self, count: usize) -> Result<()> {
        for column in self.columns.values_mut() {
            column.set_value_count(count)?;
        }
        Ok(())
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::new(Schema::new(
            self.columns
                .values()
                .map(|column| column.field().clone())
                .collect::<Vec<_>>(),
        ))
    }

    /// Snapshot all children as a `RecordBatch`.
    ///
    /// Live children must share one value count, see [`ColumnContainer::set_row_count`].
    /// Released children hold no values and are exported as all-null columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let row_count = self.row_count();
        let arrays = self
            .columns
            .values()
            .map(|column| {
                if column.is_released() {
                    return Ok(Arc::new(BinaryArray::new_null(row_count)) as ArrayRef);
                }
                column.to_array().map(|array| Arc::new(array) as ArrayRef)
            })
            .collect::<Result<Vec<_>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(row_count));
        Ok(RecordBatch::try_new_with_options(
            self.schema(),
            arrays,
            &options,
        )?)
    }

    /// Release every child.
    pub fn close(&mut self) -> Result<()> {
        for column in self.columns.values_mut() {
            column.close()?;
        }
        Ok(())
    }
}
