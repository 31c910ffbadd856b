use geo::{GeometryCollection, LineString, Polygon};

use super::{swap_axes, ByteOrder, GeometryEncoder};
use crate::error::EncodeError;
use crate::Geometry;

/// Writes 2D geometries as OGC WKB.
///
/// `Line`, `Rect` and `Triangle` have no WKB type of their own and are written as a
/// LineString and Polygons respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WkbWriter {
    byte_order: ByteOrder,
}

impl WkbWriter {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn write(&self, geometry: &Geometry, flip_axis_order: bool) -> Result<Vec<u8>, EncodeError> {
        let mut geometry = canonical(geometry)?;
        if flip_axis_order {
            swap_axes(&mut geometry);
        }

        let mut out = Vec::new();
        wkb::writer::write_geometry(&mut out, &geometry, self.byte_order.into())
            .map_err(|err| EncodeError::Writer(err.to_string()))?;
        Ok(out)
    }
}

impl Default for WkbWriter {
    fn default() -> Self {
        Self::new(ByteOrder::from_config())
    }
}

impl GeometryEncoder for WkbWriter {
    fn encode(&self, geometry: &Geometry, flip_axis_order: bool) -> Result<Vec<u8>, EncodeError> {
        self.write(geometry, flip_axis_order)
    }
}

/// Rewrite shapes without a WKB type into their WKB equivalent.
fn canonical(geometry: &Geometry) -> Result<Geometry, EncodeError> {
    let geometry = match geometry {
        Geometry::Line(line) => Geometry::LineString(LineString::new(vec![line.start, line.end])),
        Geometry::Rect(rect) => Geometry::Polygon(rect.to_polygon()),
        Geometry::Triangle(triangle) => Geometry::Polygon(triangle.to_polygon()),
        Geometry::Polygon(polygon) => {
            check_rings(polygon)?;
            geometry.clone()
        }
        Geometry::MultiPolygon(multi) => {
            multi.0.iter().try_for_each(check_rings)?;
            geometry.clone()
        }
        Geometry::GeometryCollection(collection) => {
            Geometry::GeometryCollection(GeometryCollection::new_from(
                collection
                    .0
                    .iter()
                    .map(canonical)
                    .collect::<Result<Vec<_>, _>>()?,
            ))
        }
        other => other.clone(),
    };
    Ok(geometry)
}

// An empty polygon is written with zero rings, which leaves no room for holes.
fn check_rings(polygon: &Polygon<f64>) -> Result<(), EncodeError> {
    if polygon.exterior().0.is_empty() && !polygon.interiors().is_empty() {
        return Err(EncodeError::HolesWithoutExterior(polygon.interiors().len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::{line_string, point, polygon, Line, MultiPolygon, Rect};

    use super::*;

    #[test]
    fn point_little_endian_layout() {
        let bytes = WkbWriter::new(ByteOrder::LittleEndian)
            .write(&Geometry::Point(point!(x: 1.0, y: 2.0)), false)
            .unwrap();

        let mut expected = vec![1u8, 1, 0, 0, 0];
        expected.extend_from_slice(&1.0f64.to_le_bytes());
        expected.extend_from_slice(&2.0f64.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn point_big_endian_layout() {
        let bytes = WkbWriter::new(ByteOrder::BigEndian)
            .write(&Geometry::Point(point!(x: 1.0, y: 2.0)), false)
            .unwrap();

        let mut expected = vec![0u8, 0, 0, 0, 1];
        expected.extend_from_slice(&1.0f64.to_be_bytes());
        expected.extend_from_slice(&2.0f64.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn flip_swaps_ordinates() {
        let writer = WkbWriter::new(ByteOrder::LittleEndian);
        let flipped = writer
            .write(&Geometry::Point(point!(x: 1.0, y: 2.0)), true)
            .unwrap();
        let swapped = writer
            .write(&Geometry::Point(point!(x: 2.0, y: 1.0)), false)
            .unwrap();
        assert_eq!(flipped, swapped);
    }

    #[test]
    fn line_is_written_as_line_string() {
        let writer = WkbWriter::new(ByteOrder::LittleEndian);
        let line = Geometry::Line(Line::new((0.0, 0.0), (1.0, 1.0)));
        let ls = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        assert_eq!(
            writer.write(&line, false).unwrap(),
            writer.write(&ls, false).unwrap()
        );
    }

    #[test]
    fn rect_is_written_as_polygon() {
        let writer = WkbWriter::new(ByteOrder::LittleEndian);
        let rect = Rect::new((0.0, 0.0), (1.0, 1.0));
        assert_eq!(
            writer.write(&Geometry::Rect(rect), false).unwrap(),
            writer.write(&Geometry::Polygon(rect.to_polygon()), false).unwrap()
        );
    }

    #[test]
    fn polygon_ring_count_includes_holes() {
        let poly = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 1.0)]],
        );
        let bytes = WkbWriter::new(ByteOrder::LittleEndian)
            .write(&Geometry::Polygon(poly), false)
            .unwrap();
        assert_eq!(&bytes[5..9], &2u32.to_le_bytes());
    }

    #[test]
    fn holes_without_exterior_are_refused() {
        let hole = line_string![(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 1.0)];
        let polygon = Polygon::new(LineString::new(vec![]), vec![hole]);
        let writer = WkbWriter::new(ByteOrder::LittleEndian);

        assert_eq!(
            writer.write(&Geometry::Polygon(polygon.clone()), false),
            Err(EncodeError::HolesWithoutExterior(1))
        );
        assert_eq!(
            writer.write(
                &Geometry::GeometryCollection(GeometryCollection::new_from(vec![
                    Geometry::MultiPolygon(MultiPolygon::new(vec![polygon])),
                ])),
                false
            ),
            Err(EncodeError::HolesWithoutExterior(1))
        );
    }
}
