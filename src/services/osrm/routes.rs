//! Get and normalize OSRM route info, one request per vehicle route
//!
//! See https://project-osrm.org/docs/v5.24.0/api/#route-service

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use crate::defaults::{default_request_timeout, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_OSRM_URL};
use crate::error::{OsrmError, OsrmResult};
use crate::types::{
    coordinate_list, distinct_values, Diagnostic, Diagnostics, LegInfo, RouteOsrmInfo,
    RouteSummary, Stop, StopSequenceInfo, StopsByRoute,
};
use super::normalizer::RoutePathNormalizer;
use super::response::{RouteServiceResponse, RoutePathType};
use super::{ensure_ok, fetch_route_service, service_url, OsrmTransport};

/// OSRM base URLs, optionally one per vehicle type
#[derive(Debug, Clone, PartialEq)]
pub struct PortMapping {
    pub default: String,
    pub by_vehicle_type: BTreeMap<String, String>,
}

impl Default for PortMapping {
    fn default() -> Self {
        Self::new(DEFAULT_OSRM_URL)
    }
}

impl PortMapping {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            by_vehicle_type: BTreeMap::new(),
        }
    }

    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<String>, url: impl Into<String>) -> Self {
        self.by_vehicle_type.insert(vehicle_type.into(), url.into());
        self
    }

    /// Base URL for a vehicle type, falling back to the default
    pub fn resolve(&self, vehicle_type: Option<&str>) -> &str {
        vehicle_type
            .and_then(|vt| self.by_vehicle_type.get(vt))
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

/// Ordered query parameters of a route request
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequestOptions {
    params: Vec<(String, String)>,
}

impl Default for RouteRequestOptions {
    fn default() -> Self {
        let params = [
            ("steps", "true"),
            ("annotations", "true"),
            ("overview", "full"),
            ("geometries", "geojson"),
            ("continue_straight", "false"),
        ];
        Self {
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl RouteRequestOptions {
    /// Replace a parameter in place, or append it
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(param) => param.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    pub fn query(&self) -> String {
        super::query_string(&self.params)
    }
}

/// Validated request for one route
#[derive(Debug, Clone)]
struct RoutePlan {
    route_id: String,
    stop_count: usize,
    url: String,
}

/// Tables of a single route
#[derive(Debug, Clone)]
pub struct RouteTables {
    pub travel_leg_info: Vec<LegInfo>,
    pub stop_sequence_info: Vec<StopSequenceInfo>,
    pub route_summary: RouteSummary,
    pub diagnostics: Diagnostics,
}

/// Requests OSRM routes for every vehicle route of a stops table
pub struct RouteGenerator {
    transport: Arc<dyn OsrmTransport>,
    ports: PortMapping,
    options: RouteRequestOptions,
    timeout: Duration,
    max_concurrent_requests: usize,
}

impl RouteGenerator {
    pub fn new(transport: Arc<dyn OsrmTransport>, ports: PortMapping) -> Self {
        Self {
            transport,
            ports,
            options: RouteRequestOptions::default(),
            timeout: default_request_timeout(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_options(mut self, options: RouteRequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Routes in flight at once; results keep route order regardless
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    /// Leg, stop-sequence and summary tables for every route in `stops`.
    ///
    /// Stops missing a coordinate or a route id are dropped. Every route is
    /// checked for a single vehicle type before the first request goes out,
    /// and one failed request fails the whole call.
    pub async fn return_route_osrm_info(&self, stops: &[Stop]) -> OsrmResult<RouteOsrmInfo> {
        let mut diagnostics = Diagnostics::new();
        let stops = drop_missing_coordinates(stops, &mut diagnostics);

        let grouped = StopsByRoute::group(&stops);
        if grouped.unassigned > 0 {
            diagnostics.push(Diagnostic::MissingRouteId {
                dropped: grouped.unassigned,
            });
        }

        let plans = grouped
            .routes
            .into_iter()
            .map(|(route_id, route_stops)| self.plan_route(route_id, &route_stops))
            .collect::<OsrmResult<Vec<_>>>()?;

        let results: Vec<RouteTables> = stream::iter(plans.iter())
            .map(|plan| self.fetch_route(plan))
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let mut info = RouteOsrmInfo::default();
        for tables in results {
            info.travel_leg_info.extend(tables.travel_leg_info);
            info.stop_sequence_info.extend(tables.stop_sequence_info);
            info.route_summary.push(tables.route_summary);
            diagnostics.absorb(tables.diagnostics);
        }
        info.diagnostics = diagnostics.into_vec();

        Ok(info)
    }

    fn plan_route(&self, route_id: String, stops: &[Stop]) -> OsrmResult<RoutePlan> {
        let vehicle_types = distinct_values(stops, |s| s.vehicle_type.as_ref());
        if vehicle_types.len() != 1 {
            return Err(OsrmError::VehicleTypeConflict {
                route_id,
                values: vehicle_types,
            });
        }

        let base_url = self.ports.resolve(vehicle_types[0].as_deref());
        let url = service_url(base_url, "route", &coordinate_list(stops)?, &self.options.query());

        Ok(RoutePlan {
            route_id,
            stop_count: stops.len(),
            url,
        })
    }

    async fn fetch_route(&self, plan: &RoutePlan) -> OsrmResult<RouteTables> {
        info!("Processing route {} ({} stops)", plan.route_id, plan.stop_count);

        let response = fetch_route_service(self.transport.as_ref(), &plan.url, self.timeout).await?;
        ensure_ok(&plan.url, &response)?;

        if response.waypoints.len() != plan.stop_count {
            return Err(OsrmError::InvalidResponse(format!(
                "route {} sent {} stops but got {} waypoints",
                plan.route_id,
                plan.stop_count,
                response.waypoints.len()
            )));
        }

        generate_trip_info(&response, &plan.route_id)
    }
}

/// Normalize a route response and tag every row with `route_id`
pub fn generate_trip_info(response: &RouteServiceResponse, route_id: &str) -> OsrmResult<RouteTables> {
    let normalizer = RoutePathNormalizer::new(response, RoutePathType::Routes, false)?;

    let tag = || Some(route_id.to_string());
    let travel_leg_info = normalizer
        .extract_travel_leg_info()
        .into_iter()
        .map(|leg| LegInfo { route_id: tag(), ..leg })
        .collect();
    let stop_sequence_info = normalizer
        .extract_road_snap_info()
        .into_iter()
        .map(|row| StopSequenceInfo { route_id: tag(), ..row })
        .collect();
    let route_summary = RouteSummary {
        route_id: tag(),
        ..normalizer.extract_travel_summary_info()
    };

    Ok(RouteTables {
        travel_leg_info,
        stop_sequence_info,
        route_summary,
        diagnostics: normalizer.into_diagnostics(),
    })
}

/// Keep stops with both coordinates, reporting how many lacked each axis
fn drop_missing_coordinates(stops: &[Stop], diagnostics: &mut Diagnostics) -> Vec<Stop> {
    let longitude = stops.iter().filter(|s| s.longitude.is_none()).count();
    let latitude = stops.iter().filter(|s| s.latitude.is_none()).count();

    let kept: Vec<Stop> = stops
        .iter()
        .filter(|s| s.coordinates().is_some())
        .cloned()
        .collect();

    if longitude > 0 || latitude > 0 {
        diagnostics.push(Diagnostic::MissingCoordinates {
            longitude,
            latitude,
            dropped: stops.len() - kept.len(),
        });
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::osrm::fixtures::{leg_distance, route_response};
    use crate::services::osrm::{MockTransport, OsrmReply};
    use serde_json::json;

    const QUERY: &str = "steps=true&annotations=true&overview=full&geometries=geojson&continue_straight=false";

    fn stop(lon: f64, lat: f64, route: &str) -> Stop {
        Stop::new(lon, lat).with_route(route).with_vehicle_type("car")
    }

    fn generator(transport: Arc<MockTransport>) -> RouteGenerator {
        RouteGenerator::new(transport, PortMapping::new("http://osrm:5000"))
    }

    fn two_route_transport() -> Arc<MockTransport> {
        Arc::new(
            MockTransport::new()
                .with_json("/route/v1/driving/0,0;1,1;2,0?", &route_response(&[[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]))
                .with_json("/route/v1/driving/5,5;6,6?", &route_response(&[[5.0, 5.0], [6.0, 6.0]])),
        )
    }

    #[test]
    fn test_default_query_parameters() {
        assert_eq!(RouteRequestOptions::default().query(), QUERY);
    }

    #[test]
    fn test_options_set_replaces_in_place() {
        let query = RouteRequestOptions::default()
            .set("overview", "simplified")
            .set("alternatives", "false")
            .query();
        assert_eq!(
            query,
            "steps=true&annotations=true&overview=simplified&geometries=geojson&continue_straight=false&alternatives=false"
        );
    }

    #[test]
    fn test_port_mapping_falls_back_to_default() {
        let ports = PortMapping::new("http://car:5000").with_vehicle_type("bike", "http://bike:5001");
        assert_eq!(ports.resolve(Some("bike")), "http://bike:5001");
        assert_eq!(ports.resolve(Some("truck")), "http://car:5000");
        assert_eq!(ports.resolve(None), "http://car:5000");
    }

    #[tokio::test]
    async fn test_tables_are_tagged_and_concatenated_in_route_order() {
        let transport = two_route_transport();
        let stops = vec![
            stop(0.0, 0.0, "r1"),
            stop(5.0, 5.0, "r2"),
            stop(1.0, 1.0, "r1"),
            stop(6.0, 6.0, "r2"),
            stop(2.0, 0.0, "r1"),
        ];

        let info = generator(transport.clone()).return_route_osrm_info(&stops).await.unwrap();

        assert_eq!(
            transport.requests(),
            vec![
                format!("http://osrm:5000/route/v1/driving/0,0;1,1;2,0?{}", QUERY),
                format!("http://osrm:5000/route/v1/driving/5,5;6,6?{}", QUERY),
            ]
        );

        let leg_routes: Vec<_> = info.travel_leg_info.iter().map(|l| l.route_id.as_deref()).collect();
        assert_eq!(leg_routes, vec![Some("r1"), Some("r1"), Some("r2")]);
        let leg_sequences: Vec<_> = info.travel_leg_info.iter().map(|l| l.travel_sequence).collect();
        assert_eq!(leg_sequences, vec![0, 1, 0]);

        assert_eq!(info.stop_sequence_info.len(), 5);
        assert_eq!(info.stop_sequence_info[3].route_id.as_deref(), Some("r2"));
        assert_eq!(info.stop_sequence_info[3].original_index, 0);

        assert_eq!(info.route_summary.len(), 2);
        assert_eq!(info.route_summary[1].route_id.as_deref(), Some("r2"));
        assert!((info.route_summary[1].total_distance_km * 1000.0 - leg_distance(0)).abs() < 1e-6);

        assert!(info.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_vehicle_types_fail_before_any_request() {
        let transport = two_route_transport();
        let stops = vec![
            stop(5.0, 5.0, "r2"),
            stop(6.0, 6.0, "r2"),
            stop(0.0, 0.0, "r1"),
            Stop::new(1.0, 1.0).with_route("r1").with_vehicle_type("bike"),
        ];

        let err = generator(transport.clone()).return_route_osrm_info(&stops).await.unwrap_err();

        match &err {
            OsrmError::VehicleTypeConflict { route_id, values } => {
                assert_eq!(route_id, "r1");
                assert_eq!(values.len(), 2);
            }
            other => panic!("expected vehicle type conflict, got {:?}", other),
        }
        assert!(err.to_string().contains("r1"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_coordinates_are_dropped_and_reported() {
        let transport = two_route_transport();
        let mut no_lat = stop(9.0, 9.0, "r2");
        no_lat.latitude = None;
        let mut no_lon = stop(9.0, 9.0, "r2");
        no_lon.longitude = None;
        let stops = vec![stop(5.0, 5.0, "r2"), no_lat, stop(6.0, 6.0, "r2"), no_lon];

        let info = generator(transport.clone()).return_route_osrm_info(&stops).await.unwrap();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(info.stop_sequence_info.len(), 2);
        assert_eq!(
            info.diagnostics,
            vec![Diagnostic::MissingCoordinates {
                longitude: 1,
                latitude: 1,
                dropped: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_engine_error_fails_whole_batch() {
        let transport = Arc::new(
            MockTransport::new()
                .with_json("/route/v1/driving/0,0;1,1?", &route_response(&[[0.0, 0.0], [1.0, 1.0]]))
                .with_reply(
                    "/route/v1/driving/5,5;6,6?",
                    OsrmReply::new(400, json!({"code": "NoSegment", "message": "Could not find a matching segment for coordinate 0"}).to_string()),
                ),
        );
        let stops = vec![
            stop(0.0, 0.0, "r1"),
            stop(1.0, 1.0, "r1"),
            stop(5.0, 5.0, "r2"),
            stop(6.0, 6.0, "r2"),
        ];

        let err = generator(transport).return_route_osrm_info(&stops).await.unwrap_err();

        match err {
            OsrmError::Engine { url, code, message } => {
                assert!(url.contains("5,5;6,6"));
                assert_eq!(code, "NoSegment");
                assert!(message.contains("matching segment"));
            }
            other => panic!("expected engine error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_waypoint_count_mismatch_is_rejected() {
        let transport = Arc::new(
            MockTransport::new().with_json("/route/", &route_response(&[[0.0, 0.0], [1.0, 1.0]])),
        );
        let stops = vec![stop(0.0, 0.0, "r1"), stop(1.0, 1.0, "r1"), stop(2.0, 2.0, "r1")];

        let err = generator(transport).return_route_osrm_info(&stops).await.unwrap_err();
        assert!(matches!(err, OsrmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_vehicle_type_selects_port() {
        let transport = Arc::new(
            MockTransport::new().with_json("http://bike:5001/route/", &route_response(&[[0.0, 0.0], [1.0, 1.0]])),
        );
        let ports = PortMapping::new("http://car:5000").with_vehicle_type("bike", "http://bike:5001");
        let stops = vec![
            Stop::new(0.0, 0.0).with_route("r1").with_vehicle_type("bike"),
            Stop::new(1.0, 1.0).with_route("r1").with_vehicle_type("bike"),
        ];

        RouteGenerator::new(transport.clone(), ports)
            .return_route_osrm_info(&stops)
            .await
            .unwrap();

        assert!(transport.requests()[0].starts_with("http://bike:5001/route/v1/driving/"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_keep_route_order() {
        let transport = two_route_transport();
        let stops = vec![
            stop(5.0, 5.0, "r2"),
            stop(6.0, 6.0, "r2"),
            stop(0.0, 0.0, "r1"),
            stop(1.0, 1.0, "r1"),
            stop(2.0, 0.0, "r1"),
        ];

        let info = generator(transport)
            .with_max_concurrent_requests(4)
            .return_route_osrm_info(&stops)
            .await
            .unwrap();

        let routes: Vec<_> = info.route_summary.iter().map(|s| s.route_id.clone().unwrap()).collect();
        assert_eq!(routes, vec!["r2", "r1"]);
    }

    #[tokio::test]
    async fn test_stops_without_route_are_reported() {
        let transport = two_route_transport();
        let stops = vec![stop(5.0, 5.0, "r2"), stop(6.0, 6.0, "r2"), Stop::new(3.0, 3.0).with_vehicle_type("car")];

        let info = generator(transport).return_route_osrm_info(&stops).await.unwrap();

        assert_eq!(info.diagnostics, vec![Diagnostic::MissingRouteId { dropped: 1 }]);
    }

    #[tokio::test]
    async fn test_no_stops_gives_empty_tables() {
        let transport = Arc::new(MockTransport::new());
        let info = generator(transport.clone()).return_route_osrm_info(&[]).await.unwrap();
        assert!(info.travel_leg_info.is_empty());
        assert!(info.route_summary.is_empty());
        assert_eq!(transport.request_count(), 0);
    }
}
