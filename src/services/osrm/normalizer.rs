//! Convert OSRM route and trip results into tables

use crate::error::{OsrmError, OsrmResult};
use crate::types::{
    Diagnostic, Diagnostics, LegInfo, LegMetrics, PathGeometry, RouteSummary, StopSequenceInfo,
};
use super::response::{RoutePath, RouteServiceResponse, RoutePathType};

/// Splits one OSRM result into per-stop, per-leg and whole-route views.
///
/// Only the first route/trip alternative is read; extra alternatives are
/// reported as a diagnostic.
pub struct RoutePathNormalizer<'a> {
    response: &'a RouteServiceResponse,
    path: &'a RoutePath,
    order_sequence: bool,
    diagnostics: Diagnostics,
}

impl<'a> RoutePathNormalizer<'a> {
    /// Fails with `OsrmError::Configuration` when `path_type` is not in the response.
    pub fn new(
        response: &'a RouteServiceResponse,
        path_type: RoutePathType,
        order_sequence: bool,
    ) -> OsrmResult<Self> {
        let paths = response.paths(path_type).ok_or_else(|| {
            OsrmError::Configuration(format!(
                "Route path type `{}` not in supplied OSRM results.",
                path_type.key()
            ))
        })?;

        let mut diagnostics = Diagnostics::new();
        if paths.len() > 1 {
            diagnostics.push(Diagnostic::MultiplePathAlternatives {
                path_type: path_type.key().to_string(),
                count: paths.len(),
            });
        }

        let path = paths.first().ok_or_else(|| {
            OsrmError::InvalidResponse(format!("`{}` holds no alternatives", path_type.key()))
        })?;

        Ok(Self {
            response,
            path,
            order_sequence,
            diagnostics,
        })
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Where each stop was snapped to the road, one row per waypoint.
    ///
    /// Rows are in input order unless `order_sequence` is set, in which case
    /// they are sorted by visit order.
    pub fn extract_road_snap_info(&self) -> Vec<StopSequenceInfo> {
        let mut rows: Vec<StopSequenceInfo> = self
            .response
            .waypoints
            .iter()
            .enumerate()
            .map(|(index, waypoint)| StopSequenceInfo {
                route_id: None,
                original_index: index,
                route_sequence: waypoint.waypoint_index.unwrap_or(index),
                road_snap_longitude: waypoint.location[0],
                road_snap_latitude: waypoint.location[1],
                road_snap_distance_m: waypoint.distance,
                trips_index: waypoint.trips_index,
            })
            .collect();

        if self.order_sequence {
            rows.sort_by_key(|row| row.route_sequence);
        }
        rows
    }

    /// Path of each leg: its step coordinates concatenated in step order
    pub fn extract_travel_leg_geometry(&self) -> Vec<PathGeometry> {
        self.path
            .legs
            .iter()
            .map(|leg| {
                PathGeometry::from_segments(
                    leg.steps.iter().map(|step| step.geometry.coordinates.as_slice()),
                )
            })
            .collect()
    }

    /// Duration (seconds) and distance (km) of each leg
    pub fn extract_travel_leg_duration_distance(&self) -> Vec<LegMetrics> {
        self.path
            .legs
            .iter()
            .map(|leg| LegMetrics {
                duration_seconds: leg.duration,
                distance_km: leg.distance / 1000.0,
            })
            .collect()
    }

    pub fn extract_travel_leg_info(&self) -> Vec<LegInfo> {
        self.extract_travel_leg_duration_distance()
            .into_iter()
            .zip(self.extract_travel_leg_geometry())
            .enumerate()
            .map(|(travel_sequence, (metrics, geometry))| LegInfo {
                route_id: None,
                travel_sequence,
                duration_seconds: metrics.duration_seconds,
                distance_km: metrics.distance_km,
                geometry,
            })
            .collect()
    }

    /// Total distance (km), duration (hours) and overview path.
    ///
    /// The path is empty when the request disabled the overview.
    pub fn extract_travel_summary_info(&self) -> RouteSummary {
        let geometry = self
            .path
            .geometry
            .as_ref()
            .map(|line| PathGeometry::new(line.coordinates.clone()))
            .unwrap_or_else(|| PathGeometry::new(Vec::new()));

        RouteSummary {
            route_id: None,
            total_distance_km: self.path.distance / 1000.0,
            total_travel_duration_hours: self.path.duration / 3600.0,
            geometry,
        }
    }
}
