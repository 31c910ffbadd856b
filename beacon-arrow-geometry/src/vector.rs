use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryArray};
use arrow::datatypes::FieldRef;
use datafusion::execution::memory_pool::MemoryPool;
use once_cell::sync::OnceCell;

use crate::codec::{GeometryDecoder, GeometryEncoder, WkbReader, WkbWriter};
use crate::column::{BinaryColumn, BinaryColumnBuffer};
use crate::container::ColumnContainer;
use crate::error::{GeometryVectorError, Result};
use crate::field::geometry_field_ref;
use crate::Geometry;

/// Typed access to a column of geometries.
///
/// Instances are not internally synchronized; concurrent mutation of one vector needs external
/// locking.
pub trait GeometryVector {
    /// Store `geometry` at `index`, or mark the slot null when `geometry` is `None`.
    ///
    /// Writing past the value count grows the vector. A failed write leaves it unchanged.
    fn set(&mut self, index: usize, geometry: Option<&Geometry>) -> Result<()>;

    /// Read the geometry at `index`. Null slots yield `None` without touching the codec.
    fn get(&self, index: usize) -> Result<Option<Geometry>>;

    fn set_value_count(&mut self, count: usize) -> Result<()>;

    fn value_count(&self) -> usize;

    /// Number of null slots, never negative.
    fn null_count(&self) -> usize;

    fn is_flip_axis_order(&self) -> bool;

    fn set_flip_axis_order(&mut self, flip: bool);

    /// Release the backing column. Repeated calls are no-ops.
    fn close(&mut self) -> Result<()>;

    /// Copy the value (or absence) at `from_index` into `target` at `to_index`.
    fn transfer<T>(&self, from_index: usize, to_index: usize, target: &mut T) -> Result<()>
    where
        Self: Sized,
        T: GeometryVector + ?Sized,
    {
        let geometry = self.get(from_index)?;
        target.set(to_index, geometry.as_ref())
    }

    /// [`transfer`](GeometryVector::transfer) with this vector as its own target.
    fn transfer_within(&mut self, from_index: usize, to_index: usize) -> Result<()> {
        let geometry = self.get(from_index)?;
        self.set(to_index, geometry.as_ref())
    }
}

/// Geometries stored as WKB in a nullable Arrow `Binary` column.
///
/// The column is either allocated by the vector ([`allocate`](WkbGeometryVector::allocate)),
/// borrowed from a [`ColumnContainer`] ([`from_container`](WkbGeometryVector::from_container))
/// or adopted ([`from_column`](WkbGeometryVector::from_column)). In every case `close` releases
/// the column, so closing a vector built on a container child empties that child too.
///
/// The encoder and decoder are created on first use and shared by all later calls. Neither
/// holds axis order state; the current [`flip_axis_order`](GeometryVector::is_flip_axis_order)
/// flag is handed to them on every call.
///
/// ```
/// use std::sync::Arc;
/// use datafusion::execution::memory_pool::{MemoryPool, UnboundedMemoryPool};
/// use geo::point;
/// use beacon_arrow_geometry::{Geometry, GeometryVector, WkbGeometryVector};
///
/// let pool: Arc<dyn MemoryPool> = Arc::new(UnboundedMemoryPool::default());
/// let mut vector = WkbGeometryVector::allocate("geom", &pool, None);
///
/// let p = Geometry::Point(point!(x: 1.0, y: 2.0));
/// vector.set(0, Some(&p))?;
/// vector.set(1, None)?;
///
/// assert_eq!(vector.get(0)?, Some(p));
/// assert_eq!(vector.get(1)?, None);
/// assert_eq!(vector.null_count(), 1);
/// # Ok::<(), beacon_arrow_geometry::error::GeometryVectorError>(())
/// ```
#[derive(Debug)]
pub struct WkbGeometryVector<B = BinaryColumn, E = WkbWriter, D = WkbReader> {
    column: B,
    flip_axis_order: bool,
    encoder: OnceCell<E>,
    decoder: OnceCell<D>,
}

impl<B: BinaryColumnBuffer, E, D> WkbGeometryVector<B, E, D> {
    /// Adopt `column`. The vector takes over closing it.
    pub fn from_column(column: B) -> Self {
        tracing::debug!("Creating geometry vector over column '{}'", column.name());
        Self {
            column,
            flip_axis_order: beacon_config::CONFIG.geometry_flip_axis_order,
            encoder: OnceCell::new(),
            decoder: OnceCell::new(),
        }
    }

    /// Adopt `column` with an explicit codec instead of lazily created defaults.
    pub fn with_codec(column: B, encoder: E, decoder: D) -> Self {
        Self {
            encoder: OnceCell::with_value(encoder),
            decoder: OnceCell::with_value(decoder),
            ..Self::from_column(column)
        }
    }

    pub fn name(&self) -> &str {
        self.column.name()
    }

    pub fn field(&self) -> &FieldRef {
        self.column.field()
    }

    pub fn column(&self) -> &B {
        &self.column
    }

    pub fn column_mut(&mut self) -> &mut B {
        &mut self.column
    }

    pub fn into_column(self) -> B {
        self.column
    }

    /// Snapshot the stored WKB as an Arrow `BinaryArray`.
    pub fn to_array(&self) -> Result<BinaryArray> {
        self.column.to_array()
    }
}

impl<B, E, D> WkbGeometryVector<B, E, D>
where
    B: BinaryColumnBuffer,
    E: GeometryEncoder + Default,
    D: GeometryDecoder + Default,
{
    fn encoder(&self) -> &E {
        self.encoder.get_or_init(E::default)
    }

    fn decoder(&self) -> &D {
        self.decoder.get_or_init(D::default)
    }

    /// Iterate over every slot below the value count.
    pub fn iter(&self) -> impl Iterator<Item = Result<Option<Geometry>>> + '_ {
        (0..self.value_count()).map(move |index| self.get(index))
    }
}

impl WkbGeometryVector {
    /// Allocate a new column named `name` under `pool`.
    pub fn allocate(
        name: impl Into<String>,
        pool: &Arc<dyn MemoryPool>,
        metadata: Option<HashMap<String, String>>,
    ) -> Self {
        Self::from_column(BinaryColumn::new(geometry_field_ref(name, metadata), pool))
    }

    /// Allocate a vector and fill it with `geometries`, `None` entries becoming null slots.
    pub fn from_geometries<I>(
        name: impl Into<String>,
        pool: &Arc<dyn MemoryPool>,
        metadata: Option<HashMap<String, String>>,
        geometries: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Option<Geometry>>,
    {
        let mut vector = Self::allocate(name, pool, metadata);
        for (index, geometry) in geometries.into_iter().enumerate() {
            vector.set(index, geometry.as_ref())?;
        }
        Ok(vector)
    }

    /// Copy an Arrow `BinaryArray` of WKB values into a new vector.
    pub fn try_from_array(
        field: FieldRef,
        array: &ArrayRef,
        pool: &Arc<dyn MemoryPool>,
    ) -> Result<Self> {
        Ok(Self::from_column(BinaryColumn::try_from_array(
            field, array, pool,
        )?))
    }
}

impl<'a> WkbGeometryVector<&'a mut BinaryColumn> {
    /// Use the child `name` of `container`, creating it if it does not exist yet.
    pub fn from_container(
        name: impl Into<String>,
        container: &'a mut ColumnContainer,
        metadata: Option<HashMap<String, String>>,
    ) -> Self {
        Self::from_column(container.add_or_get(geometry_field_ref(name, metadata)))
    }
}

impl<B, E, D> GeometryVector for WkbGeometryVector<B, E, D>
where
    B: BinaryColumnBuffer,
    E: GeometryEncoder + Default,
    D: GeometryDecoder + Default,
{
    fn set(&mut self, index: usize, geometry: Option<&Geometry>) -> Result<()> {
        match geometry {
            None => self.column.set_null(index),
            Some(geometry) => {
                let bytes = self.encoder().encode(geometry, self.flip_axis_order)?;
                tracing::trace!(
                    "Writing {} WKB bytes to '{}'[{}]",
                    bytes.len(),
                    self.column.name(),
                    index
                );
                self.column.set_bytes_safe(index, &bytes)
            }
        }
    }

    fn get(&self, index: usize) -> Result<Option<Geometry>> {
        if self.column.is_null(index)? {
            return Ok(None);
        }
        let bytes = self.column.get_bytes(index)?;
        self.decoder()
            .decode(bytes, self.flip_axis_order)
            .map(Some)
            .map_err(|source| GeometryVectorError::Decode { index, source })
    }

    fn set_value_count(&mut self, count: usize) -> Result<()> {
        self.column.set_value_count(count)
    }

    fn value_count(&self) -> usize {
        self.column.value_count()
    }

    fn null_count(&self) -> usize {
        self.column.null_count().max(0) as usize
    }

    fn is_flip_axis_order(&self) -> bool {
        self.flip_axis_order
    }

    fn set_flip_axis_order(&mut self, flip: bool) {
        self.flip_axis_order = flip;
    }

    fn close(&mut self) -> Result<()> {
        self.column.close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use datafusion::execution::memory_pool::{GreedyMemoryPool, UnboundedMemoryPool};
    use geo::{line_string, point};

    use super::*;
    use crate::error::{DecodeError, EncodeError};

    static ENCODE_CALLS: AtomicUsize = AtomicUsize::new(0);
    static DECODE_CALLS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct CountingWriter(WkbWriter);

    impl GeometryEncoder for CountingWriter {
        fn encode(&self, geometry: &Geometry, flip: bool) -> Result<Vec<u8>, EncodeError> {
            ENCODE_CALLS.fetch_add(1, Ordering::SeqCst);
            self.0.encode(geometry, flip)
        }
    }

    #[derive(Default)]
    struct CountingReader(WkbReader);

    impl GeometryDecoder for CountingReader {
        fn decode(&self, bytes: &[u8], flip: bool) -> Result<Geometry, DecodeError> {
            DECODE_CALLS.fetch_add(1, Ordering::SeqCst);
            self.0.decode(bytes, flip)
        }
    }

    /// Encoder that refuses everything, for checking that failed writes leave no trace.
    #[derive(Default)]
    struct RefusingWriter;

    impl GeometryEncoder for RefusingWriter {
        fn encode(&self, _geometry: &Geometry, _flip: bool) -> Result<Vec<u8>, EncodeError> {
            Err(EncodeError::Writer("refused".to_string()))
        }
    }

    fn pool() -> Arc<dyn MemoryPool> {
        Arc::new(UnboundedMemoryPool::default())
    }

    #[test]
    fn null_slots_never_reach_the_codec() {
        let pool = pool();
        let mut vector: WkbGeometryVector<BinaryColumn, CountingWriter, CountingReader> =
            WkbGeometryVector::from_column(BinaryColumn::new(
                geometry_field_ref("geom", None),
                &pool,
            ));

        vector.set(0, None).unwrap();
        assert_eq!(vector.get(0).unwrap(), None);
        assert_eq!(ENCODE_CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(DECODE_CALLS.load(Ordering::SeqCst), 0);
        assert!(vector.column().is_null(0).unwrap());
    }

    #[test]
    fn failed_encode_leaves_slot_untouched() {
        let pool = pool();
        let mut column = BinaryColumn::new(geometry_field_ref("geom", None), &pool);
        column.set_bytes_safe(0, b"keep").unwrap();

        let mut vector: WkbGeometryVector<BinaryColumn, RefusingWriter, WkbReader> =
            WkbGeometryVector::from_column(column);
        let err = vector
            .set(0, Some(&Geometry::Point(point!(x: 1.0, y: 1.0))))
            .unwrap_err();
        assert!(matches!(err, GeometryVectorError::Encode(_)));

        let err = vector
            .set(3, Some(&Geometry::Point(point!(x: 1.0, y: 1.0))))
            .unwrap_err();
        assert!(matches!(err, GeometryVectorError::Encode(_)));

        assert_eq!(vector.value_count(), 1);
        assert_eq!(vector.column().get_bytes(0).unwrap(), b"keep");
    }

    #[test]
    fn corrupt_bytes_surface_as_decode_errors() {
        let pool = pool();
        let mut vector = WkbGeometryVector::allocate("geom", &pool, None);
        vector.column_mut().set_bytes_safe(0, &[1, 1, 0]).unwrap();

        let err = vector.get(0).unwrap_err();
        assert!(matches!(
            err,
            GeometryVectorError::Decode {
                index: 0,
                source: DecodeError::UnexpectedEof { .. }
            }
        ));
    }

    #[test]
    fn reads_past_value_count_are_out_of_range() {
        let pool = pool();
        let mut vector = WkbGeometryVector::allocate("geom", &pool, None);
        vector.set(0, None).unwrap();

        assert!(matches!(
            vector.get(1),
            Err(GeometryVectorError::IndexOutOfRange {
                index: 1,
                value_count: 1
            })
        ));
    }

    #[test]
    fn flag_change_applies_to_the_next_call() {
        let pool = pool();
        let mut vector = WkbGeometryVector::allocate("geom", &pool, None);
        let p = Geometry::Point(point!(x: 1.0, y: 2.0));

        vector.set_flip_axis_order(true);
        vector.set(0, Some(&p)).unwrap();
        assert!(vector.is_flip_axis_order());
        assert_eq!(vector.get(0).unwrap(), Some(p));

        vector.set_flip_axis_order(false);
        assert_eq!(
            vector.get(0).unwrap(),
            Some(Geometry::Point(point!(x: 2.0, y: 1.0)))
        );
    }

    #[test]
    fn self_transfer_copies_within_the_vector() {
        let pool = pool();
        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        let mut vector = WkbGeometryVector::from_geometries(
            "geom",
            &pool,
            None,
            vec![Some(line.clone()), None],
        )
        .unwrap();

        vector.transfer_within(0, 2).unwrap();
        vector.transfer_within(1, 0).unwrap();

        assert_eq!(vector.get(0).unwrap(), None);
        assert_eq!(vector.get(2).unwrap(), Some(line));
        assert_eq!(vector.null_count(), 2);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let pool: Arc<dyn MemoryPool> = Arc::new(GreedyMemoryPool::new(16));
        let mut vector = WkbGeometryVector::allocate("geom", &pool, None);

        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        assert!(matches!(
            vector.set(0, Some(&line)),
            Err(GeometryVectorError::Allocation { .. })
        ));
        assert_eq!(vector.value_count(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let pool = pool();
        let mut vector = WkbGeometryVector::allocate("geom", &pool, None);
        vector
            .set(0, Some(&Geometry::Point(point!(x: 1.0, y: 2.0))))
            .unwrap();

        vector.close().unwrap();
        vector.close().unwrap();

        assert_eq!(pool.reserved(), 0);
        assert_eq!(vector.value_count(), 0);
        assert_eq!(vector.null_count(), 0);
        assert!(matches!(
            vector.get(0),
            Err(GeometryVectorError::Released(_))
        ));
    }

    /// Buffer that reports a negative raw null count, as some upstream buffers can.
    struct NegativeNullCount {
        field: FieldRef,
    }

    impl BinaryColumnBuffer for NegativeNullCount {
        fn name(&self) -> &str {
            self.field.name()
        }

        fn field(&self) -> &FieldRef {
            &self.field
        }

        fn is_null(&self, _index: usize) -> Result<bool> {
            Ok(true)
        }

        fn set_null(&mut self, _index: usize) -> Result<()> {
            Ok(())
        }

        fn get_bytes(&self, _index: usize) -> Result<&[u8]> {
            Ok(&[])
        }

        fn set_bytes_safe(&mut self, _index: usize, _bytes: &[u8]) -> Result<()> {
            Ok(())
        }

        fn set_value_count(&mut self, _count: usize) -> Result<()> {
            Ok(())
        }

        fn value_count(&self) -> usize {
            0
        }

        fn null_count(&self) -> i64 {
            -1
        }

        fn is_released(&self) -> bool {
            false
        }

        fn to_array(&self) -> Result<BinaryArray> {
            Ok(BinaryArray::from(Vec::<Option<&[u8]>>::new()))
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn negative_raw_null_count_is_reported_as_zero() {
        let vector: WkbGeometryVector<NegativeNullCount> =
            WkbGeometryVector::from_column(NegativeNullCount {
                field: geometry_field_ref("geom", None),
            });

        assert_eq!(vector.column().null_count(), -1);
        assert_eq!(vector.null_count(), 0);
    }
}
