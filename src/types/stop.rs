//! Stop types

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OsrmError, OsrmResult};

/// What a vehicle does at a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Pickup,
    StartAtDepot,
    ReturnToDepot,
}

impl ActivityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActivityType::Pickup => "PICKUP",
            ActivityType::StartAtDepot => "START_AT_DEPOT",
            ActivityType::ReturnToDepot => "RETURN_TO_DEPOT",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PICKUP" => Ok(ActivityType::Pickup),
            "START_AT_DEPOT" => Ok(ActivityType::StartAtDepot),
            "RETURN_TO_DEPOT" => Ok(ActivityType::ReturnToDepot),
            other => Err(format!("unknown activity type `{}`", other)),
        }
    }
}

/// A point visited by a route.
///
/// Coordinates are optional because input tables may have gaps; the route
/// services decide whether a missing coordinate is dropped or rejected.
/// Columns the services do not interpret travel along in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stop {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl Stop {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude: Some(longitude),
            latitude: Some(latitude),
            ..Default::default()
        }
    }

    pub fn with_route(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<String>) -> Self {
        self.vehicle_type = Some(vehicle_type.into());
        self
    }

    pub fn with_depot(mut self, depot_id: impl Into<String>) -> Self {
        self.depot_id = Some(depot_id.into());
        self
    }

    pub fn with_activity(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    /// `(longitude, latitude)` when both are known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.longitude?, self.latitude?))
    }
}

/// Join stop coordinates into the OSRM `lon,lat;lon,lat` path segment.
pub fn coordinate_list(stops: &[Stop]) -> OsrmResult<String> {
    let mut pairs = Vec::with_capacity(stops.len());
    for (index, stop) in stops.iter().enumerate() {
        let (lon, lat) = stop.coordinates().ok_or_else(|| {
            OsrmError::InvalidInput(format!("stop at row {} has no coordinates", index))
        })?;
        pairs.push(format!("{},{}", lon, lat));
    }
    Ok(pairs.join(";"))
}

/// Stops split by route id, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct StopsByRoute {
    pub routes: Vec<(String, Vec<Stop>)>,
    /// Stops without a route id
    pub unassigned: usize,
}

impl StopsByRoute {
    pub fn group(stops: &[Stop]) -> Self {
        let mut grouped = Self::default();
        let mut positions: BTreeMap<&str, usize> = BTreeMap::new();

        for stop in stops {
            let Some(route_id) = stop.route_id.as_deref() else {
                grouped.unassigned += 1;
                continue;
            };
            let position = *positions.entry(route_id).or_insert_with(|| {
                grouped.routes.push((route_id.to_string(), Vec::new()));
                grouped.routes.len() - 1
            });
            grouped.routes[position].1.push(stop.clone());
        }

        grouped
    }

    pub fn route_ids(&self) -> Vec<&str> {
        self.routes.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// Distinct values of `key` in input order (missing values count as one value).
pub fn distinct_values<F>(stops: &[Stop], key: F) -> Vec<Option<String>>
where
    F: Fn(&Stop) -> Option<&String>,
{
    let mut values: Vec<Option<String>> = Vec::new();
    for stop in stops {
        let value = key(stop).cloned();
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}
