//! Non-fatal conditions met while building route tables
//!
//! Each diagnostic is logged at `warn` level when recorded and kept so that
//! callers can inspect what was dropped or worked around.

use std::fmt;

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// More than one route/trip alternative; only the first is used
    MultiplePathAlternatives { path_type: String, count: usize },
    /// Stops dropped because a coordinate is missing
    MissingCoordinates {
        longitude: usize,
        latitude: usize,
        dropped: usize,
    },
    /// Stops dropped because they belong to no route
    MissingRouteId { dropped: usize },
    /// Several route ids passed to a single-route call; the first is used
    MultipleRouteIds { route_ids: Vec<String> },
    /// Stops of one route reference several depots; the first is used
    MultipleDepotIds {
        route_id: String,
        depot_ids: Vec<Option<String>>,
    },
    /// No depot row matches; the first depot row is used
    DepotNotFound {
        route_id: String,
        depot_id: Option<String>,
    },
    /// Several depot rows match; the first is used
    MultipleDepots {
        route_id: String,
        depot_id: Option<String>,
        count: usize,
    },
    StopLimitExceeded {
        route_id: String,
        stops: usize,
        limit: usize,
    },
    /// The trip service could not link all stops into one trip
    DisconnectedTrips { route_id: String, trips: usize },
    TooFewCoordinates { route_id: String },
    /// Route too short to sequence; returned as assembled
    DegenerateRoute { route_id: String, stops: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MultiplePathAlternatives { path_type, count } => write!(
                f,
                "`{}` has {} alternatives, only the first one will be processed",
                path_type, count
            ),
            Diagnostic::MissingCoordinates {
                longitude,
                latitude,
                dropped,
            } => write!(
                f,
                "missing coordinates ({} longitude, {} latitude), dropped {} stops",
                longitude, latitude, dropped
            ),
            Diagnostic::MissingRouteId { dropped } => {
                write!(f, "dropped {} stops without a route id", dropped)
            }
            Diagnostic::MultipleRouteIds { route_ids } => write!(
                f,
                "multiple routes specified ({:?}), using the first",
                route_ids
            ),
            Diagnostic::MultipleDepotIds {
                route_id,
                depot_ids,
            } => write!(
                f,
                "route {} references depots {:?}, using the first",
                route_id, depot_ids
            ),
            Diagnostic::DepotNotFound { route_id, depot_id } => write!(
                f,
                "no depot found for depot_id {:?} on route {}, using the first depot",
                depot_id, route_id
            ),
            Diagnostic::MultipleDepots {
                route_id,
                depot_id,
                count,
            } => write!(
                f,
                "{} depots match depot_id {:?} on route {}, using the first",
                count, depot_id, route_id
            ),
            Diagnostic::StopLimitExceeded {
                route_id,
                stops,
                limit,
            } => write!(
                f,
                "route {} has {} > {} stops which may result in OSRM errors",
                route_id, stops, limit
            ),
            Diagnostic::DisconnectedTrips { route_id, trips } => write!(
                f,
                "route {} has {} trips, some route segments could not be linked",
                route_id, trips
            ),
            Diagnostic::TooFewCoordinates { route_id } => write!(
                f,
                "route {} has fewer than two usable coordinates",
                route_id
            ),
            Diagnostic::DegenerateRoute { route_id, stops } => write!(
                f,
                "route {} has {} <= 1 stops, skipping sequence generation",
                route_id, stops
            ),
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.0.push(diagnostic);
    }

    /// Append already-logged diagnostics
    pub fn absorb(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}
