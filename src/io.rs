//! Reading stop tables and writing result tables

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection};
use serde::Serialize;
use serde_json::{json, Value};

use crate::defaults::{
    ACTIVITY_TYPE_COLUMN, DEFAULT_DEPOT_ID_COLUMN, DEFAULT_LATITUDE_COLUMN, DEFAULT_LONGITUDE_COLUMN,
    DEFAULT_ROUTE_ID_COLUMN, DEFAULT_VEHICLE_TYPE_COLUMN, EPSG_4326,
};
use crate::types::{ActivityType, GeometryRow, PathGeometry, Stop};

/// Names of the input columns the services interpret
#[derive(Debug, Clone, PartialEq)]
pub struct StopColumns {
    pub longitude: String,
    pub latitude: String,
    pub route_id: String,
    pub vehicle_type: String,
    pub depot_id: String,
}

impl Default for StopColumns {
    fn default() -> Self {
        Self {
            longitude: DEFAULT_LONGITUDE_COLUMN.to_string(),
            latitude: DEFAULT_LATITUDE_COLUMN.to_string(),
            route_id: DEFAULT_ROUTE_ID_COLUMN.to_string(),
            vehicle_type: DEFAULT_VEHICLE_TYPE_COLUMN.to_string(),
            depot_id: DEFAULT_DEPOT_ID_COLUMN.to_string(),
        }
    }
}

pub fn read_stops_file(path: &Path, columns: &StopColumns) -> Result<Vec<Stop>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_stops(BufReader::new(file), columns).with_context(|| format!("Failed to read stops from {}", path.display()))
}

/// Read a stops CSV.
///
/// Longitude and latitude columns must exist; empty or `NaN` cells are
/// missing values. Columns not named in `columns` are kept as attributes.
pub fn read_stops<R: Read>(reader: R, columns: &StopColumns) -> Result<Vec<Stop>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers().context("Failed to read CSV header")?.clone();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let longitude_at = position(&columns.longitude)
        .with_context(|| format!("Missing longitude column `{}`", columns.longitude))?;
    let latitude_at = position(&columns.latitude)
        .with_context(|| format!("Missing latitude column `{}`", columns.latitude))?;
    let route_id_at = position(&columns.route_id);
    let vehicle_type_at = position(&columns.vehicle_type);
    let depot_id_at = position(&columns.depot_id);
    let activity_at = position(ACTIVITY_TYPE_COLUMN);

    let known: Vec<usize> = [Some(longitude_at), Some(latitude_at), route_id_at, vehicle_type_at, depot_id_at, activity_at]
        .into_iter()
        .flatten()
        .collect();

    let mut stops = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {}", row))?;
        let cell = |at: Option<usize>| at.and_then(|i| record.get(i)).filter(|v| !v.is_empty());

        let activity_type = cell(activity_at)
            .map(|raw| raw.parse::<ActivityType>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("row {}: {}", row, e))?;

        let attributes: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| !known.contains(i))
            .map(|(_, (header, value))| (header.to_string(), value.to_string()))
            .collect();

        stops.push(Stop {
            longitude: parse_coordinate(cell(Some(longitude_at)), row, &columns.longitude)?,
            latitude: parse_coordinate(cell(Some(latitude_at)), row, &columns.latitude)?,
            route_id: cell(route_id_at).map(str::to_string),
            vehicle_type: cell(vehicle_type_at).map(str::to_string),
            depot_id: cell(depot_id_at).map(str::to_string),
            activity_type,
            attributes,
        });
    }

    Ok(stops)
}

fn parse_coordinate(raw: Option<&str>, row: usize, column: &str) -> Result<Option<f64>> {
    match raw {
        None => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("nan") => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("row {}: `{}` is not a number in column `{}`", row, value, column)),
    }
}

/// Write rows as a GeoJSON feature collection tagged with their CRS
pub fn write_feature_collection<W: Write, T: GeometryRow>(writer: W, rows: &[T]) -> Result<()> {
    let features = rows
        .iter()
        .map(|row| {
            let properties = match serde_json::to_value(row)? {
                Value::Object(map) => map,
                other => anyhow::bail!("expected a table row, got {}", other),
            };
            Ok(Feature {
                bbox: None,
                geometry: row.geometry().map(PathGeometry::to_geojson),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let crs = rows
        .iter()
        .find_map(|row| row.geometry())
        .map(|geometry| geometry.crs())
        .unwrap_or(EPSG_4326);
    let mut foreign_members = serde_json::Map::new();
    foreign_members.insert("crs".to_string(), json!({"type": "name", "properties": {"name": crs}}));

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    };
    serde_json::to_writer_pretty(writer, &collection).context("Failed to write GeoJSON")?;
    Ok(())
}

pub fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).context("Failed to write CSV row")?;
    }
    csv_writer.flush().context("Failed to flush CSV")?;
    Ok(())
}

pub fn write_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(writer, value).context("Failed to write JSON")?;
    Ok(())
}

/// Create `path` and hand a buffered writer to `write`
pub fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LegInfo, StopSequenceInfo, TspStop};

    #[test]
    fn test_read_stops_maps_columns_and_keeps_attributes() {
        let csv = "\
lon,lat,vehicle,order_id,profile
-0.12,51.5,van-1,A17,car
-0.2,,van-1,A18,car
";
        let columns = StopColumns {
            longitude: "lon".to_string(),
            latitude: "lat".to_string(),
            route_id: "vehicle".to_string(),
            ..Default::default()
        };

        let stops = read_stops(csv.as_bytes(), &columns).unwrap();

        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].coordinates(), Some((-0.12, 51.5)));
        assert_eq!(stops[0].route_id.as_deref(), Some("van-1"));
        assert_eq!(stops[0].vehicle_type.as_deref(), Some("car"));
        assert_eq!(stops[0].attributes.get("order_id").map(String::as_str), Some("A17"));
        assert!(stops[0].depot_id.is_none());
        assert_eq!(stops[1].latitude, None);
    }

    #[test]
    fn test_read_stops_parses_activity_and_nan() {
        let csv = "longitude,latitude,activity_type\nNaN,1.0,PICKUP\n";
        let stops = read_stops(csv.as_bytes(), &StopColumns::default()).unwrap();
        assert_eq!(stops[0].longitude, None);
        assert_eq!(stops[0].activity_type, Some(ActivityType::Pickup));
        assert!(stops[0].attributes.is_empty());
    }

    #[test]
    fn test_read_stops_rejects_bad_coordinate_with_row() {
        let csv = "longitude,latitude\n0.0,0.0\nwest,1.0\n";
        let err = read_stops(csv.as_bytes(), &StopColumns::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("row 1"));
    }

    #[test]
    fn test_read_stops_requires_coordinate_columns() {
        let csv = "x,y\n0,0\n";
        let err = read_stops(csv.as_bytes(), &StopColumns::default()).unwrap_err();
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_feature_collection_carries_crs_and_properties() {
        let legs = vec![LegInfo {
            route_id: Some("r1".to_string()),
            travel_sequence: 0,
            duration_seconds: 60.0,
            distance_km: 1.5,
            geometry: PathGeometry::new(vec![[0.0, 0.0], [1.0, 1.0]]),
        }];
        let mut buffer = Vec::new();

        write_feature_collection(&mut buffer, &legs).unwrap();

        let value: Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["crs"]["properties"]["name"], "EPSG:4326");
        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert_eq!(feature["properties"]["route_id"], "r1");
        assert_eq!(feature["properties"]["distance_km"], 1.5);
    }

    #[test]
    fn test_depot_start_feature_has_null_geometry() {
        let rows = vec![TspStop {
            route_sequence: Some(0),
            duration_seconds: Some(0.0),
            distance_km: Some(0.0),
            ..TspStop::unsequenced(Stop::new(0.0, 0.0).with_activity(ActivityType::StartAtDepot))
        }];
        let mut buffer = Vec::new();

        write_feature_collection(&mut buffer, &rows).unwrap();

        let value: Value = serde_json::from_slice(&buffer).unwrap();
        let feature = &value["features"][0];
        assert!(feature["geometry"].is_null());
        assert_eq!(feature["properties"]["activity_type"], "START_AT_DEPOT");
        assert_eq!(feature["properties"]["route_sequence"], 0);
    }

    #[test]
    fn test_write_csv_stop_sequence() {
        let rows = vec![StopSequenceInfo {
            route_id: Some("r1".to_string()),
            original_index: 0,
            route_sequence: 0,
            road_snap_longitude: 0.5,
            road_snap_latitude: 1.5,
            road_snap_distance_m: 2.0,
            trips_index: None,
        }];
        let mut buffer = Vec::new();

        write_csv(&mut buffer, &rows).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("route_id,original_index,route_sequence,road_snap_longitude,road_snap_latitude,road_snap_distance_m,trips_index")
        );
        assert_eq!(lines.next(), Some("r1,0,0,0.5,1.5,2.0,"));
    }

    #[test]
    fn test_write_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("matrix.json");

        write_file(&path, |w| write_json(w, &vec![vec![0.0, 1.0]])).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0][1], 1.0);
    }
}
