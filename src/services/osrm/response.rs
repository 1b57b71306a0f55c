//! OSRM wire types
//!
//! OSRM HTTP API documentation:
//! https://project-osrm.org/docs/v5.24.0/api/

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{OsrmError, OsrmResult};
use super::OsrmReply;

/// Response code OSRM uses for success
pub const CODE_OK: &str = "Ok";

/// Message OSRM attaches when a request has fewer than two coordinates
pub const TOO_FEW_COORDINATES_MESSAGE: &str = "Number of coordinates needs to be at least two.";

/// Which list of alternatives to read from a route/trip response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePathType {
    Routes,
    Trips,
}

impl RoutePathType {
    /// JSON key holding the alternatives
    pub const fn key(self) -> &'static str {
        match self {
            RoutePathType::Routes => "routes",
            RoutePathType::Trips => "trips",
        }
    }
}

/// `/table` response
#[derive(Debug, Clone, Deserialize)]
pub struct TableResponse {
    pub code: Option<String>,
    pub message: Option<String>,
    /// Seconds; `null` when no route exists
    pub durations: Option<Vec<Vec<Option<f64>>>>,
    /// Meters; `null` when no route exists
    pub distances: Option<Vec<Vec<Option<f64>>>>,
}

/// `/route` and `/trip` response
#[derive(Debug, Clone, Deserialize)]
pub struct RouteServiceResponse {
    pub code: String,
    pub message: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    pub routes: Option<Vec<RoutePath>>,
    pub trips: Option<Vec<RoutePath>>,
}

impl RouteServiceResponse {
    pub fn paths(&self, path_type: RoutePathType) -> Option<&[RoutePath]> {
        match path_type {
            RoutePathType::Routes => self.routes.as_deref(),
            RoutePathType::Trips => self.trips.as_deref(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// Input coordinate snapped to the road network
#[derive(Debug, Clone, Deserialize)]
pub struct Waypoint {
    /// Snapped `[lon, lat]`
    pub location: [f64; 2],
    /// Snap distance in meters
    #[serde(default)]
    pub distance: f64,
    pub name: Option<String>,
    pub hint: Option<String>,
    /// Visit position within its trip (trip service only)
    pub waypoint_index: Option<usize>,
    /// Trip the waypoint belongs to (trip service only)
    pub trips_index: Option<usize>,
}

/// One route or trip alternative
#[derive(Debug, Clone, Deserialize)]
pub struct RoutePath {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    pub geometry: Option<LineGeometry>,
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leg {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub geometry: LineGeometry,
}

/// GeoJSON line (`geometries=geojson`)
#[derive(Debug, Clone, Deserialize)]
pub struct LineGeometry {
    pub coordinates: Vec<[f64; 2]>,
}

/// Decode a reply body.
///
/// A body that does not decode is reported as an HTTP failure when the status
/// was not successful, since the engine then usually sent an error page.
pub fn decode_reply<T: DeserializeOwned>(url: &str, reply: &OsrmReply) -> OsrmResult<T> {
    match serde_json::from_str(&reply.body) {
        Ok(value) => Ok(value),
        Err(_) if !reply.is_success() => Err(OsrmError::HttpStatus {
            url: url.to_string(),
            status: reply.status,
            body: reply.body.clone(),
        }),
        Err(source) => Err(OsrmError::Parse {
            url: url.to_string(),
            source,
        }),
    }
}
