//! Well-known binary (WKB) encoding of `geo` geometries, backed by the `wkb` crate.
//!
//! The codec is split into an encoder and a decoder so a vector can create each lazily and so
//! either side can be replaced. Both are stateless: the axis order flag is passed on every call.

use std::str::FromStr;

use geo::{Coord, MapCoordsInPlace};

use crate::error::{DecodeError, EncodeError};
use crate::Geometry;

pub mod wkb_reader;
pub mod wkb_writer;

pub use wkb_reader::WkbReader;
pub use wkb_writer::WkbWriter;

/// Serializes geometries into bytes.
pub trait GeometryEncoder: Send + Sync {
    /// Encode `geometry`, swapping x and y of every coordinate when `flip_axis_order` is set.
    fn encode(&self, geometry: &Geometry, flip_axis_order: bool) -> Result<Vec<u8>, EncodeError>;
}

/// Parses geometries from bytes written by the matching [`GeometryEncoder`].
pub trait GeometryDecoder: Send + Sync {
    /// Decode `bytes`, swapping x and y of every coordinate when `flip_axis_order` is set.
    fn decode(&self, bytes: &[u8], flip_axis_order: bool) -> Result<Geometry, DecodeError>;
}

/// WKB byte order marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// XDR, marker `0`.
    BigEndian,
    /// NDR, marker `1`.
    #[default]
    LittleEndian,
}

impl ByteOrder {
    pub fn marker(&self) -> u8 {
        match self {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        }
    }

    pub fn from_marker(marker: u8) -> Result<Self, DecodeError> {
        match marker {
            0 => Ok(ByteOrder::BigEndian),
            1 => Ok(ByteOrder::LittleEndian),
            other => Err(DecodeError::InvalidByteOrder(other)),
        }
    }

    /// Byte order configured through `BEACON_WKB_BYTE_ORDER`.
    pub fn from_config() -> Self {
        let configured = &beacon_config::CONFIG.wkb_byte_order;
        configured.parse().unwrap_or_else(|err| {
            tracing::warn!("{}, falling back to little endian", err);
            ByteOrder::LittleEndian
        })
    }
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "little" | "ndr" | "le" => Ok(ByteOrder::LittleEndian),
            "big" | "xdr" | "be" => Ok(ByteOrder::BigEndian),
            other => Err(format!("Unknown WKB byte order '{other}'")),
        }
    }
}

impl From<ByteOrder> for wkb::Endianness {
    fn from(order: ByteOrder) -> Self {
        match order {
            ByteOrder::BigEndian => wkb::Endianness::BigEndian,
            ByteOrder::LittleEndian => wkb::Endianness::LittleEndian,
        }
    }
}

/// Swap x and y of every coordinate of `geometry` in place.
pub(crate) fn swap_axes(geometry: &mut Geometry) {
    geometry.map_coords_in_place(|Coord { x, y }| Coord { x: y, y: x });
}
