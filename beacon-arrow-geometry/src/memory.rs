use std::sync::Arc;

use datafusion::execution::memory_pool::{
    GreedyMemoryPool, MemoryConsumer, MemoryPool, MemoryReservation, UnboundedMemoryPool,
};

use crate::error::{GeometryVectorError, Result};

/// Build a memory pool sized from `BEACON_GEOMETRY_MEMORY_LIMIT`.
pub fn default_memory_pool() -> Arc<dyn MemoryPool> {
    match beacon_config::CONFIG.geometry_memory_limit_bytes() {
        Some(limit) => {
            tracing::debug!("Using greedy geometry memory pool of {} bytes", limit);
            Arc::new(GreedyMemoryPool::new(limit))
        }
        None => Arc::new(UnboundedMemoryPool::default()),
    }
}

/// Tracks the logical footprint of a single column against a pool.
///
/// The reservation only ever grows while the column is live. It is returned to the pool when
/// the column is released or dropped.
#[derive(Debug)]
pub(crate) struct ColumnReservation {
    reservation: MemoryReservation,
}

impl ColumnReservation {
    pub(crate) fn register(name: &str, pool: &Arc<dyn MemoryPool>) -> Self {
        Self {
            reservation: MemoryConsumer::new(format!("geometry column '{name}'")).register(pool),
        }
    }

    /// Make sure at least `size` bytes are reserved.
    pub(crate) fn ensure(&mut self, name: &str, size: usize) -> Result<()> {
        let reserved = self.reservation.size();
        if size <= reserved {
            return Ok(());
        }
        self.reservation
            .try_grow(size - reserved)
            .map_err(|source| GeometryVectorError::Allocation {
                column: name.to_string(),
                source,
            })
    }

    pub(crate) fn size(&self) -> usize {
        self.reservation.size()
    }

    pub(crate) fn free(&mut self) -> usize {
        self.reservation.free()
    }
}
