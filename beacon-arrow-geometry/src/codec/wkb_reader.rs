use geo::{GeometryCollection, MultiPoint, Point};
use geo_traits::to_geo::{
    ToGeoLine, ToGeoLineString, ToGeoMultiLineString, ToGeoMultiPolygon, ToGeoPoint,
    ToGeoPolygon, ToGeoRect, ToGeoTriangle,
};
use geo_traits::{
    Dimensions, GeometryCollectionTrait, GeometryTrait, GeometryType, MultiPointTrait, PointTrait,
};

use super::{swap_axes, ByteOrder, GeometryDecoder};
use crate::error::DecodeError;
use crate::Geometry;

/// Byte order marker plus the u32 type code.
const HEADER_SIZE: usize = 5;

/// Reads 2D OGC WKB, in either byte order.
///
/// Geometries with Z or M ordinates are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WkbReader;

impl WkbReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, bytes: &[u8], flip_axis_order: bool) -> Result<Geometry, DecodeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DecodeError::UnexpectedEof {
                needed: HEADER_SIZE,
                remaining: bytes.len(),
            });
        }
        ByteOrder::from_marker(bytes[0])?;

        let wkb = wkb::reader::read_wkb(bytes)
            .map_err(|err| DecodeError::Malformed(err.to_string()))?;
        match GeometryTrait::dim(&wkb) {
            Dimensions::Xy => {}
            other => return Err(DecodeError::UnsupportedDimension(format!("{other:?}"))),
        }

        let mut geometry = to_geometry(&wkb);
        if flip_axis_order {
            swap_axes(&mut geometry);
        }
        Ok(geometry)
    }
}

impl GeometryDecoder for WkbReader {
    fn decode(&self, bytes: &[u8], flip_axis_order: bool) -> Result<Geometry, DecodeError> {
        self.read(bytes, flip_axis_order)
    }
}

fn to_geometry<G: GeometryTrait<T = f64>>(geometry: &G) -> Geometry {
    match geometry.as_type() {
        GeometryType::Point(point) => Geometry::Point(to_point(point)),
        GeometryType::LineString(line) => Geometry::LineString(line.to_line_string()),
        GeometryType::Polygon(polygon) => Geometry::Polygon(polygon.to_polygon()),
        GeometryType::MultiPoint(multi) => Geometry::MultiPoint(MultiPoint::new(
            multi.points().map(|point| to_point(&point)).collect(),
        )),
        GeometryType::MultiLineString(multi) => {
            Geometry::MultiLineString(multi.to_multi_line_string())
        }
        GeometryType::MultiPolygon(multi) => Geometry::MultiPolygon(multi.to_multi_polygon()),
        GeometryType::GeometryCollection(collection) => {
            Geometry::GeometryCollection(GeometryCollection::new_from(
                collection
                    .geometries()
                    .map(|member| to_geometry(&member))
                    .collect(),
            ))
        }
        GeometryType::Rect(rect) => Geometry::Rect(rect.to_rect()),
        GeometryType::Line(line) => Geometry::Line(line.to_line()),
        GeometryType::Triangle(triangle) => Geometry::Triangle(triangle.to_triangle()),
    }
}

// WKB writes an empty point as POINT(NaN NaN); `geo` has no empty point.
fn to_point<P: PointTrait<T = f64>>(point: &P) -> Point<f64> {
    point
        .try_to_point()
        .unwrap_or_else(|| Point::new(f64::NAN, f64::NAN))
}
