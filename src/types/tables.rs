//! Derived tables built from OSRM responses

use serde::Serialize;

use super::{Diagnostic, PathGeometry, Stop};

/// Rows that carry a path geometry next to their plain columns.
pub trait GeometryRow: Serialize {
    fn geometry(&self) -> Option<&PathGeometry>;
}

/// Duration and distance of one leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegMetrics {
    pub duration_seconds: f64,
    pub distance_km: f64,
}

/// One row per consecutive stop pair of a route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegInfo {
    pub route_id: Option<String>,
    /// 0-based leg position
    pub travel_sequence: usize,
    pub duration_seconds: f64,
    pub distance_km: f64,
    #[serde(skip)]
    pub geometry: PathGeometry,
}

impl GeometryRow for LegInfo {
    fn geometry(&self) -> Option<&PathGeometry> {
        Some(&self.geometry)
    }
}

/// Where OSRM snapped a stop to the road network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopSequenceInfo {
    pub route_id: Option<String>,
    /// Position of the stop in the request
    pub original_index: usize,
    /// Visit order reported by the engine, or `original_index` when absent
    pub route_sequence: usize,
    pub road_snap_longitude: f64,
    pub road_snap_latitude: f64,
    pub road_snap_distance_m: f64,
    pub trips_index: Option<usize>,
}

/// Whole-route totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub route_id: Option<String>,
    pub total_distance_km: f64,
    pub total_travel_duration_hours: f64,
    #[serde(skip)]
    pub geometry: PathGeometry,
}

impl GeometryRow for RouteSummary {
    fn geometry(&self) -> Option<&PathGeometry> {
        Some(&self.geometry)
    }
}

/// A stop of a sequenced (or unsequenced) TSP route.
///
/// The depot-start row has no preceding leg: its duration and distance are
/// zero and its geometry is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TspStop {
    #[serde(flatten)]
    pub stop: Stop,
    pub route_sequence: Option<usize>,
    pub duration_seconds: Option<f64>,
    pub distance_km: Option<f64>,
    #[serde(skip)]
    pub geometry: Option<PathGeometry>,
}

impl TspStop {
    pub fn unsequenced(stop: Stop) -> Self {
        Self {
            stop,
            route_sequence: None,
            duration_seconds: None,
            distance_km: None,
            geometry: None,
        }
    }
}

impl GeometryRow for TspStop {
    fn geometry(&self) -> Option<&PathGeometry> {
        self.geometry.as_ref()
    }
}

/// Travel time (seconds) and distance (meters) between all stop pairs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeDistanceMatrices {
    pub time_matrix: Vec<Vec<f64>>,
    pub distance_matrix: Vec<Vec<f64>>,
}

/// Output of the route generator, concatenated across routes
#[derive(Debug, Clone, Default)]
pub struct RouteOsrmInfo {
    pub travel_leg_info: Vec<LegInfo>,
    pub stop_sequence_info: Vec<StopSequenceInfo>,
    pub route_summary: Vec<RouteSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Output of the TSP sequencer, concatenated across routes
#[derive(Debug, Clone, Default)]
pub struct TspRoutes {
    pub stops: Vec<TspStop>,
    pub diagnostics: Vec<Diagnostic>,
}
