use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BinaryArray, BooleanBufferBuilder};
use arrow::buffer::{Buffer, NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::FieldRef;
use arrow::util::bit_chunk_iterator::UnalignedBitChunk;
use arrow::util::bit_util;
use arrow_schema::DataType;
use datafusion::execution::memory_pool::MemoryPool;

use crate::error::{GeometryVectorError, Result};
use crate::memory::ColumnReservation;

/// A variable-length, null-aware binary column that can be written slot by slot.
///
/// This is the storage contract geometry vectors are built on. Reads are bounded by
/// [`value_count`](BinaryColumnBuffer::value_count); writes through
/// [`set_bytes_safe`](BinaryColumnBuffer::set_bytes_safe) and
/// [`set_null`](BinaryColumnBuffer::set_null) grow the column as needed.
pub trait BinaryColumnBuffer {
    /// Name of the column.
    fn name(&self) -> &str;

    /// The schema descriptor the column was allocated with.
    fn field(&self) -> &FieldRef;

    /// Returns `true` when slot `index` holds no value.
    fn is_null(&self, index: usize) -> Result<bool>;

    /// Mark slot `index` as null, growing the column if needed.
    fn set_null(&mut self, index: usize) -> Result<()>;

    /// Raw bytes of slot `index`. Null slots yield an empty slice.
    fn get_bytes(&self, index: usize) -> Result<&[u8]>;

    /// Store `bytes` in slot `index` and mark it valid, growing the column if needed.
    fn set_bytes_safe(&mut self, index: usize, bytes: &[u8]) -> Result<()>;

    /// Extend (with null slots) or truncate the column to `count` slots.
    fn set_value_count(&mut self, count: usize) -> Result<()>;

    fn value_count(&self) -> usize;

    /// Number of null slots below the value count.
    ///
    /// Signed so that foreign buffers can report their raw counter; consumers clamp it.
    fn null_count(&self) -> i64;

    fn is_released(&self) -> bool;

    /// Snapshot the column as an Arrow `BinaryArray`.
    fn to_array(&self) -> Result<BinaryArray>;

    /// Free the column's buffers. Releasing an already released column is a no-op.
    fn close(&mut self) -> Result<()>;
}

impl<B: BinaryColumnBuffer + ?Sized> BinaryColumnBuffer for &mut B {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn field(&self) -> &FieldRef {
        (**self).field()
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        (**self).is_null(index)
    }

    fn set_null(&mut self, index: usize) -> Result<()> {
        (**self).set_null(index)
    }

    fn get_bytes(&self, index: usize) -> Result<&[u8]> {
        (**self).get_bytes(index)
    }

    fn set_bytes_safe(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        (**self).set_bytes_safe(index, bytes)
    }

    fn set_value_count(&mut self, count: usize) -> Result<()> {
        (**self).set_value_count(count)
    }

    fn value_count(&self) -> usize {
        (**self).value_count()
    }

    fn null_count(&self) -> i64 {
        (**self).null_count()
    }

    fn is_released(&self) -> bool {
        (**self).is_released()
    }

    fn to_array(&self) -> Result<BinaryArray> {
        (**self).to_array()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Arrow-layout buffers of a live column.
///
/// `offsets` always holds `len + 1` entries starting at zero and `validity` holds `len` bits.
#[derive(Debug)]
struct ColumnBuffers {
    offsets: Vec<i32>,
    values: Vec<u8>,
    validity: BooleanBufferBuilder,
}

impl ColumnBuffers {
    fn new() -> Self {
        Self {
            offsets: vec![0],
            values: Vec::new(),
            validity: BooleanBufferBuilder::new(0),
        }
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slot_len(&self, index: usize) -> usize {
        if index < self.len() {
            (self.offsets[index + 1] - self.offsets[index]) as usize
        } else {
            0
        }
    }

    fn slot(&self, index: usize) -> &[u8] {
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        &self.values[start..end]
    }

    fn valid_count(&self) -> usize {
        UnalignedBitChunk::new(self.validity.as_slice(), 0, self.len()).count_ones()
    }

    /// Append null slots until the column holds `len` slots.
    fn extend_to(&mut self, len: usize) {
        let current = self.len();
        if len <= current {
            return;
        }
        let last = self.offsets[current];
        self.offsets.resize(len + 1, last);
        self.validity.append_n(len - current, false);
    }

    fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        self.values.truncate(self.offsets[len] as usize);
        self.offsets.truncate(len + 1);
        self.validity.truncate(len);
    }

    /// Replace the bytes of an existing slot, shifting the offsets of every later slot.
    fn replace(&mut self, index: usize, bytes: &[u8]) {
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        let delta = bytes.len() as i64 - (end - start) as i64;

        self.values.splice(start..end, bytes.iter().copied());
        if delta != 0 {
            for offset in &mut self.offsets[index + 1..] {
                *offset = (*offset as i64 + delta) as i32;
            }
        }
    }
}

/// Logical footprint of `slots` slots holding `bytes` value bytes.
fn footprint(slots: usize, bytes: usize) -> usize {
    bytes + (slots + 1) * std::mem::size_of::<i32>() + bit_util::ceil(slots, 8)
}

/// A mutable Arrow `Binary` column with accounting against a DataFusion memory pool.
///
/// Slots may be written in any order. Overwriting a slot splices its bytes in place, so
/// sequential appends are cheap while random rewrites cost a shift of the later bytes.
#[derive(Debug)]
pub struct BinaryColumn {
    field: FieldRef,
    buffers: Option<ColumnBuffers>,
    reservation: ColumnReservation,
}

impl BinaryColumn {
    /// Allocate an empty column for `field` under `pool`.
    pub fn new(field: FieldRef, pool: &Arc<dyn MemoryPool>) -> Self {
        tracing::debug!("Allocating binary column '{}'", field.name());
        Self {
            reservation: ColumnReservation::register(field.name(), pool),
            buffers: Some(ColumnBuffers::new()),
            field,
        }
    }

    /// Copy an existing Arrow `BinaryArray` (possibly sliced) into a new mutable column.
    pub fn try_from_array(
        field: FieldRef,
        array: &ArrayRef,
        pool: &Arc<dyn MemoryPool>,
    ) -> Result<Self> {
        if field.data_type() != &DataType::Binary {
            return Err(GeometryVectorError::InvalidColumn(format!(
                "field '{}' must be Binary, got {:?}",
                field.name(),
                field.data_type()
            )));
        }
        let binary = array
            .as_any()
            .downcast_ref::<BinaryArray>()
            .ok_or_else(|| {
                GeometryVectorError::InvalidColumn(format!(
                    "expected BinaryArray for column '{}', got {:?}",
                    field.name(),
                    array.data_type()
                ))
            })?;

        let len = binary.len();
        let offsets = binary.value_offsets();
        let base = offsets[0];
        let values = binary.value_data()[base as usize..offsets[len] as usize].to_vec();

        let mut validity = BooleanBufferBuilder::new(len);
        for index in 0..len {
            validity.append(binary.is_valid(index));
        }

        let buffers = ColumnBuffers {
            offsets: offsets.iter().map(|offset| offset - base).collect(),
            values,
            validity,
        };

        let mut reservation = ColumnReservation::register(field.name(), pool);
        reservation.ensure(field.name(), footprint(len, buffers.values.len()))?;

        tracing::debug!(
            "Adopted {} slots into binary column '{}'",
            len,
            field.name()
        );

        Ok(Self {
            field,
            buffers: Some(buffers),
            reservation,
        })
    }

    /// Give a released column fresh, empty buffers. A live column is left as it is.
    ///
    /// The reservation stays registered with the pool, so the reopened column is accounted
    /// like a newly allocated one.
    pub fn reopen(&mut self) {
        if self.buffers.is_none() {
            tracing::debug!("Reopening released binary column '{}'", self.field.name());
            self.buffers = Some(ColumnBuffers::new());
        }
    }

    /// Bytes currently reserved from the memory pool.
    pub fn reserved_bytes(&self) -> usize {
        self.reservation.size()
    }

    fn buffers(&self) -> Result<&ColumnBuffers> {
        self.buffers
            .as_ref()
            .ok_or_else(|| GeometryVectorError::Released(self.field.name().clone()))
    }

    fn checked_slot(&self, index: usize) -> Result<&ColumnBuffers> {
        let buffers = self.buffers()?;
        if index >= buffers.len() {
            return Err(GeometryVectorError::IndexOutOfRange {
                index,
                value_count: buffers.len(),
            });
        }
        Ok(buffers)
    }

    /// Reserve memory for a write of `new_len` bytes into slot `index`, then hand out the
    /// buffers grown to cover `index`. Nothing is mutated when the reservation fails.
    fn prepare_write(&mut self, index: usize, new_len: usize) -> Result<&mut ColumnBuffers> {
        let name = self.field.name();
        let buffers = self
            .buffers
            .as_mut()
            .ok_or_else(|| GeometryVectorError::Released(name.clone()))?;

        let slots = buffers.len().max(index + 1);
        let bytes = buffers.values.len() - buffers.slot_len(index) + new_len;
        if bytes > i32::MAX as usize {
            return Err(GeometryVectorError::InvalidColumn(format!(
                "column '{name}' would hold {bytes} bytes, more than i32 offsets can address"
            )));
        }
        self.reservation.ensure(name, footprint(slots, bytes))?;

        if index >= buffers.len() {
            tracing::trace!("Growing binary column '{}' to {} slots", name, slots);
            buffers.extend_to(slots);
        }
        Ok(buffers)
    }
}

impl BinaryColumnBuffer for BinaryColumn {
    fn name(&self) -> &str {
        self.field.name()
    }

    fn field(&self) -> &FieldRef {
        &self.field
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        let buffers = self.checked_slot(index)?;
        Ok(!buffers.validity.get_bit(index))
    }

    fn set_null(&mut self, index: usize) -> Result<()> {
        let buffers = self.prepare_write(index, 0)?;
        buffers.replace(index, &[]);
        buffers.validity.set_bit(index, false);
        Ok(())
    }

    fn get_bytes(&self, index: usize) -> Result<&[u8]> {
        let buffers = self.checked_slot(index)?;
        Ok(buffers.slot(index))
    }

    fn set_bytes_safe(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        let buffers = self.prepare_write(index, bytes.len())?;
        buffers.replace(index, bytes);
        buffers.validity.set_bit(index, true);
        Ok(())
    }

    fn set_value_count(&mut self, count: usize) -> Result<()> {
        let name = self.field.name();
        let buffers = self
            .buffers
            .as_mut()
            .ok_or_else(|| GeometryVectorError::Released(name.clone()))?;

        if count > buffers.len() {
            self.reservation
                .ensure(name, footprint(count, buffers.values.len()))?;
            buffers.extend_to(count);
        } else {
            buffers.truncate(count);
        }
        Ok(())
    }

    fn value_count(&self) -> usize {
        self.buffers.as_ref().map(ColumnBuffers::len).unwrap_or(0)
    }

    fn null_count(&self) -> i64 {
        match &self.buffers {
            Some(buffers) => (buffers.len() - buffers.valid_count()) as i64,
            None => 0,
        }
    }

    fn is_released(&self) -> bool {
        self.buffers.is_none()
    }

    fn to_array(&self) -> Result<BinaryArray> {
        let buffers = self.buffers()?;
        let offsets = OffsetBuffer::new(ScalarBuffer::from(buffers.offsets.clone()));
        let values = Buffer::from_vec(buffers.values.clone());
        let nulls = NullBuffer::new(buffers.validity.finish_cloned());
        Ok(BinaryArray::try_new(offsets, values, Some(nulls))?)
    }

    fn close(&mut self) -> Result<()> {
        match self.buffers.take() {
            Some(_) => {
                let freed = self.reservation.free();
                tracing::debug!(
                    "Released binary column '{}' ({} bytes)",
                    self.field.name(),
                    freed
                );
            }
            None => {
                tracing::debug!("Binary column '{}' already released", self.field.name());
            }
        }
        Ok(())
    }
}
