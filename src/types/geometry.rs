//! Path geometry
//!
//! OSRM returns GeoJSON coordinates in `[longitude, latitude]` order. A path is
//! an ordered line of those points tagged with the coordinate reference system
//! they are expressed in.

use geo_types::{Coord, LineString};

use crate::defaults::EPSG_4326;

/// An ordered line of `[lon, lat]` points with its CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct PathGeometry {
    line: LineString<f64>,
    crs: &'static str,
}

impl PathGeometry {
    /// Line through `points` in the given order (EPSG:4326)
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self {
            line: LineString::from(points),
            crs: EPSG_4326,
        }
    }

    /// Concatenate segments into one line.
    ///
    /// Points keep their order within a segment and segments keep their order
    /// in the line. Shared endpoints between segments are not deduplicated.
    pub fn from_segments<'a, I>(segments: I) -> Self
    where
        I: IntoIterator<Item = &'a [[f64; 2]]>,
    {
        let points: Vec<[f64; 2]> = segments
            .into_iter()
            .flat_map(|segment| segment.iter().copied())
            .collect();
        Self::new(points)
    }

    pub fn crs(&self) -> &'static str {
        self.crs
    }

    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.line.coords().map(|c: &Coord<f64>| [c.x, c.y]).collect()
    }

    pub fn len(&self) -> usize {
        self.line.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.0.is_empty()
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.line))
    }
}
