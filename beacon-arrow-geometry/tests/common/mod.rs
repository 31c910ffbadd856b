use std::sync::Arc;

use beacon_arrow_geometry::Geometry;
use datafusion::execution::memory_pool::{MemoryPool, UnboundedMemoryPool};
use wkt::TryFromWkt;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            &beacon_config::CONFIG.log_level,
        ))
        .with_test_writer()
        .try_init();
}

pub fn pool() -> Arc<dyn MemoryPool> {
    Arc::new(UnboundedMemoryPool::default())
}

pub fn wkt(text: &str) -> Geometry {
    Geometry::try_from_wkt_str(text).expect("valid WKT literal")
}
