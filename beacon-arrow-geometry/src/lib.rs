//! Geometry columns for Beacon, stored as WKB in nullable Arrow `Binary` arrays.
//!
//! The crate is layered:
//! - [`column::BinaryColumn`]: a mutable Arrow binary column (offsets, validity, bytes) whose
//!   footprint is accounted against a DataFusion [`MemoryPool`](datafusion::execution::memory_pool::MemoryPool).
//! - [`codec`]: the WKB encoder/decoder pair.
//! - [`vector::WkbGeometryVector`]: typed `get`/`set`/`transfer` of [`Geometry`] values on top
//!   of a column.
//! - [`container::ColumnContainer`]: named child columns exported together as a `RecordBatch`.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use datafusion::execution::memory_pool::{MemoryPool, UnboundedMemoryPool};
//! use geo::{line_string, point};
//! use beacon_arrow_geometry::{Geometry, GeometryVector, WkbGeometryVector};
//!
//! let pool: Arc<dyn MemoryPool> = Arc::new(UnboundedMemoryPool::default());
//! let mut source = WkbGeometryVector::allocate("geom", &pool, None);
//! let mut target = WkbGeometryVector::allocate("geom", &pool, None);
//!
//! let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
//! source.set(0, Some(&Geometry::Point(point!(x: 1.0, y: 2.0))))?;
//! source.set(1, None)?;
//! source.set(2, Some(&line))?;
//! source.set_value_count(3)?;
//!
//! source.transfer(2, 0, &mut target)?;
//! assert_eq!(target.get(0)?, Some(line));
//! # Ok::<(), beacon_arrow_geometry::error::GeometryVectorError>(())
//! ```

pub mod codec;
pub mod column;
pub mod container;
pub mod error;
pub mod field;
pub mod memory;
pub mod vector;

pub use codec::{ByteOrder, GeometryDecoder, GeometryEncoder, WkbReader, WkbWriter};
pub use column::{BinaryColumn, BinaryColumnBuffer};
pub use container::ColumnContainer;
pub use memory::default_memory_pool;
pub use vector::{GeometryVector, WkbGeometryVector};

/// The in-memory geometry model stored by this crate.
pub type Geometry = geo::Geometry<f64>;
