//! TSP sequencing of routes with the OSRM trip service
//!
//! Each route is framed by its depot (start and return), sent to
//! `/trip` with a fixed first and last stop, and reassembled in the visit
//! order the engine chose together with per-leg duration, distance and path.
//!
//! See https://project-osrm.org/docs/v5.24.0/api/#trip-service

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use crate::defaults::{default_request_timeout, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_OSRM_URL, DEFAULT_TSP_STOP_LIMIT};
use crate::error::{OsrmError, OsrmResult};
use crate::types::{
    coordinate_list, distinct_values, ActivityType, Diagnostic, Diagnostics, Stop, StopsByRoute,
    TspRoutes, TspStop,
};
use super::normalizer::RoutePathNormalizer;
use super::response::{RouteServiceResponse, RoutePathType, TOO_FEW_COORDINATES_MESSAGE};
use super::{ensure_ok, fetch_route_service, service_url, OsrmTransport};

const TRIP_QUERY: &str =
    "roundtrip=false&source=first&destination=last&steps=true&annotations=true&overview=full&geometries=geojson";

/// How sequencing of a route ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TspState {
    /// Stops carry a visit order and leg metrics
    Sequenced,
    /// Too few stops to sequence; returned as assembled
    Degenerate,
}

/// One route after sequencing
#[derive(Debug, Clone)]
pub struct TspRoute {
    pub route_id: String,
    pub state: TspState,
    pub stops: Vec<TspStop>,
    pub diagnostics: Diagnostics,
}

/// Calculate TSP routes for assigned stops.
///
/// Every route starts and ends at its depot. Depots are matched on
/// `depot_id`; when none matches, the first depot row is used.
pub struct TspSequencer {
    assigned_stops: Vec<Stop>,
    depots: Vec<Stop>,
    stops_limit: usize,
    base_url: String,
    transport: Arc<dyn OsrmTransport>,
    timeout: Duration,
    max_concurrent_requests: usize,
}

impl TspSequencer {
    pub fn new(transport: Arc<dyn OsrmTransport>, assigned_stops: Vec<Stop>, depots: Vec<Stop>) -> Self {
        Self {
            assigned_stops,
            depots,
            stops_limit: DEFAULT_TSP_STOP_LIMIT,
            base_url: DEFAULT_OSRM_URL.to_string(),
            transport,
            timeout: default_request_timeout(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    /// Routes longer than this are still requested, with a warning
    pub fn with_stops_limit(mut self, stops_limit: usize) -> Self {
        self.stops_limit = stops_limit;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    /// Sequence every route independently and concatenate in route order
    pub async fn generate_all_tsp_routes(&self) -> OsrmResult<TspRoutes> {
        let mut diagnostics = Diagnostics::new();
        let grouped = StopsByRoute::group(&self.assigned_stops);
        if grouped.unassigned > 0 {
            diagnostics.push(Diagnostic::MissingRouteId {
                dropped: grouped.unassigned,
            });
        }

        let routes: Vec<TspRoute> = stream::iter(grouped.routes.iter())
            .map(|(route_id, stops)| self.generate_tsp_route(stops, Some(route_id.as_str())))
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let mut all = TspRoutes::default();
        for route in routes {
            all.stops.extend(route.stops);
            diagnostics.absorb(route.diagnostics);
        }
        all.diagnostics = diagnostics.into_vec();
        Ok(all)
    }

    /// Calculate the TSP sequence of a single route.
    ///
    /// With `route_id`, only stops of that route are used; otherwise all of
    /// `route` is treated as one route named after its first route id.
    pub async fn generate_tsp_route(&self, route: &[Stop], route_id: Option<&str>) -> OsrmResult<TspRoute> {
        let mut diagnostics = Diagnostics::new();

        let (route_id, route_stops) = match route_id {
            Some(id) => (
                id.to_string(),
                route
                    .iter()
                    .filter(|s| s.route_id.as_deref() == Some(id))
                    .cloned()
                    .collect::<Vec<_>>(),
            ),
            None => {
                let ids: Vec<String> = distinct_values(route, |s| s.route_id.as_ref())
                    .into_iter()
                    .flatten()
                    .collect();
                if ids.len() > 1 {
                    diagnostics.push(Diagnostic::MultipleRouteIds {
                        route_ids: ids.clone(),
                    });
                }
                let id = ids
                    .into_iter()
                    .next()
                    .ok_or_else(|| OsrmError::InvalidInput("route has no route id".to_string()))?;
                (id, route.to_vec())
            }
        };

        let full_route = self.assemble_route(&route_id, route_stops, &mut diagnostics)?;
        let n_stops = full_route.len();

        if n_stops <= 1 {
            diagnostics.push(Diagnostic::DegenerateRoute {
                route_id: route_id.clone(),
                stops: n_stops,
            });
            return Ok(unsequenced(route_id, full_route, diagnostics));
        }

        info!("Generating route sequence for route_id {} with {} stops", route_id, n_stops);

        if n_stops > self.stops_limit {
            diagnostics.push(Diagnostic::StopLimitExceeded {
                route_id: route_id.clone(),
                stops: n_stops,
                limit: self.stops_limit,
            });
        }

        let url = service_url(&self.base_url, "trip", &coordinate_list(&full_route)?, TRIP_QUERY);
        let response = fetch_route_service(self.transport.as_ref(), &url, self.timeout).await?;

        if response.message.as_deref() == Some(TOO_FEW_COORDINATES_MESSAGE) {
            diagnostics.push(Diagnostic::TooFewCoordinates {
                route_id: route_id.clone(),
            });
            return Ok(unsequenced(route_id, full_route, diagnostics));
        }
        ensure_ok(&url, &response)?;

        let visit_keys = visit_order(&route_id, &response, n_stops, &mut diagnostics)?;
        let normalizer = RoutePathNormalizer::new(&response, RoutePathType::Trips, true)?;
        let metrics = normalizer.extract_travel_leg_duration_distance();
        let geometries = normalizer.extract_travel_leg_geometry();
        diagnostics.absorb(normalizer.into_diagnostics());

        let mut ordered: Vec<((usize, usize), Stop)> = visit_keys.into_iter().zip(full_route).collect();
        ordered.sort_by_key(|(key, _)| *key);

        // The depot start has no preceding leg
        let stops = ordered
            .into_iter()
            .enumerate()
            .map(|(position, (_, stop))| {
                let (duration_seconds, distance_km, geometry) = match position.checked_sub(1) {
                    None => (Some(0.0), Some(0.0), None),
                    Some(leg) => match metrics.get(leg) {
                        Some(m) => (Some(m.duration_seconds), Some(m.distance_km), geometries.get(leg).cloned()),
                        None => (None, None, None),
                    },
                };
                TspStop {
                    stop,
                    route_sequence: Some(position),
                    duration_seconds,
                    distance_km,
                    geometry,
                }
            })
            .collect();

        Ok(TspRoute {
            route_id,
            state: TspState::Sequenced,
            stops,
            diagnostics,
        })
    }

    /// Depot start, the route's pickups, depot return
    fn assemble_route(&self, route_id: &str, stops: Vec<Stop>, diagnostics: &mut Diagnostics) -> OsrmResult<Vec<Stop>> {
        let first_depot = self
            .depots
            .first()
            .ok_or_else(|| OsrmError::InvalidInput("no depots supplied".to_string()))?;

        let depot_ids = distinct_values(&stops, |s| s.depot_id.as_ref());
        if depot_ids.len() > 1 {
            diagnostics.push(Diagnostic::MultipleDepotIds {
                route_id: route_id.to_string(),
                depot_ids: depot_ids.clone(),
            });
        }
        let depot_id = depot_ids.into_iter().next().flatten();

        let matching: Vec<&Stop> = match &depot_id {
            Some(id) => self
                .depots
                .iter()
                .filter(|d| d.depot_id.as_ref() == Some(id))
                .collect(),
            None => Vec::new(),
        };
        let depot = match matching.as_slice() {
            [] => {
                diagnostics.push(Diagnostic::DepotNotFound {
                    route_id: route_id.to_string(),
                    depot_id,
                });
                first_depot
            }
            [only] => *only,
            [first, ..] => {
                diagnostics.push(Diagnostic::MultipleDepots {
                    route_id: route_id.to_string(),
                    depot_id,
                    count: matching.len(),
                });
                *first
            }
        };

        let at_depot = |activity: ActivityType| Stop {
            route_id: Some(route_id.to_string()),
            activity_type: Some(activity),
            ..depot.clone()
        };

        let mut full_route = Vec::with_capacity(stops.len() + 2);
        full_route.push(at_depot(ActivityType::StartAtDepot));
        full_route.extend(stops.into_iter().map(|s| s.with_activity(ActivityType::Pickup)));
        full_route.push(at_depot(ActivityType::ReturnToDepot));
        Ok(full_route)
    }
}

fn unsequenced(route_id: String, stops: Vec<Stop>, diagnostics: Diagnostics) -> TspRoute {
    TspRoute {
        route_id,
        state: TspState::Degenerate,
        stops: stops.into_iter().map(TspStop::unsequenced).collect(),
        diagnostics,
    }
}

/// `(trips_index, waypoint_index)` of every input stop, in input order
fn visit_order(
    route_id: &str,
    response: &RouteServiceResponse,
    n_stops: usize,
    diagnostics: &mut Diagnostics,
) -> OsrmResult<Vec<(usize, usize)>> {
    if response.waypoints.len() != n_stops {
        return Err(OsrmError::InvalidResponse(format!(
            "route {} sent {} stops but got {} waypoints",
            route_id,
            n_stops,
            response.waypoints.len()
        )));
    }

    let keys = response
        .waypoints
        .iter()
        .enumerate()
        .map(|(i, waypoint)| {
            let index = waypoint.waypoint_index.ok_or_else(|| {
                OsrmError::InvalidResponse(format!("waypoint {} of route {} has no `waypoint_index`", i, route_id))
            })?;
            Ok((waypoint.trips_index.unwrap_or(0), index))
        })
        .collect::<OsrmResult<Vec<_>>>()?;

    let mut trips: Vec<usize> = keys.iter().map(|(trip, _)| *trip).collect();
    trips.sort_unstable();
    trips.dedup();
    if trips.len() > 1 {
        diagnostics.push(Diagnostic::DisconnectedTrips {
            route_id: route_id.to_string(),
            trips: trips.len(),
        });
    }

    Ok(keys)
}
