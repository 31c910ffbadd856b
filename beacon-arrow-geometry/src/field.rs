use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{Field, FieldRef};
use arrow_schema::DataType;

/// Name of the catch-all WKB geometry field.
pub const WKB_FIELD_NAME: &str = "wkb";

/// Build the descriptor of a geometry column: a nullable `Binary` field.
///
/// `metadata` is attached verbatim. It is never inspected by this crate, so callers can use it
/// to carry CRS or encoding hints through Arrow IPC.
///
/// ```
/// use std::collections::HashMap;
/// use arrow_schema::DataType;
/// use beacon_arrow_geometry::field;
///
/// let mut metadata = HashMap::new();
/// metadata.insert("crs".to_string(), "EPSG:4326".to_string());
///
/// let f = field::geometry_field("geom", Some(metadata));
/// assert!(f.is_nullable());
/// assert_eq!(f.data_type(), &DataType::Binary);
/// assert_eq!(f.metadata().get("crs").map(String::as_str), Some("EPSG:4326"));
/// ```
pub fn geometry_field(name: impl Into<String>, metadata: Option<HashMap<String, String>>) -> Field {
    Field::new(name.into(), DataType::Binary, true).with_metadata(metadata.unwrap_or_default())
}

/// Same as [`geometry_field`], wrapped for sharing between a schema and a column buffer.
pub fn geometry_field_ref(
    name: impl Into<String>,
    metadata: Option<HashMap<String, String>>,
) -> FieldRef {
    Arc::new(geometry_field(name, metadata))
}

/// The default `wkb` field without metadata.
pub fn wkb_field() -> Field {
    geometry_field(WKB_FIELD_NAME, None)
}

/// Returns `true` when `field` has the physical layout of a geometry column.
pub fn is_geometry_field(field: &Field) -> bool {
    field.is_nullable() && field.data_type() == &DataType::Binary
}
