//! OSRM table service: time and distance matrices between all stops
//!
//! See https://project-osrm.org/docs/v5.24.0/api/#table-service

use std::time::Duration;

use tracing::{debug, warn};

use crate::defaults::{default_table_timeout, DEFAULT_OSRM_URL, DEFAULT_PUBLIC_STOP_LIMIT, DEFAULT_SLOW_DOWN};
use crate::error::{OsrmError, OsrmResult};
use crate::types::{coordinate_list, Stop, TimeDistanceMatrices};
use super::response::{decode_reply, TableResponse, CODE_OK};
use super::{service_url, OsrmTransport};

const TABLE_QUERY: &str = "annotations=distance,duration";

/// Options for a table request
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// OSRM base URL; the public server is used when `None`
    pub endpoint: Option<String>,
    pub timeout: Duration,
    /// Multiplies every duration (2.0 simulates travelling at half speed)
    pub slow_down: f64,
    /// Most stops allowed against the public server
    pub public_stop_limit: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: default_table_timeout(),
            slow_down: DEFAULT_SLOW_DOWN,
            public_stop_limit: DEFAULT_PUBLIC_STOP_LIMIT,
        }
    }
}

impl TableOptions {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }
}

/// Get travel time (seconds) and distance (meters) of the fastest path between all stops.
///
/// Unreachable pairs come back as `f64::INFINITY`.
pub async fn get_time_dist_matrix(
    transport: &dyn OsrmTransport,
    stops: &[Stop],
    options: &TableOptions,
) -> OsrmResult<TimeDistanceMatrices> {
    let endpoint = match &options.endpoint {
        Some(endpoint) => endpoint.as_str(),
        None => {
            if stops.len() > options.public_stop_limit {
                return Err(OsrmError::StopLimitExceeded {
                    limit: options.public_stop_limit,
                    count: stops.len(),
                });
            }
            DEFAULT_OSRM_URL
        }
    };

    let coordinates = coordinate_list(stops)?;
    let url = service_url(endpoint, "table", &coordinates, TABLE_QUERY);

    debug!("Requesting table from {} for {} stops", transport.name(), stops.len());

    let reply = transport.get(&url, options.timeout).await?;
    if !reply.is_success() {
        return Err(OsrmError::HttpStatus {
            url,
            status: reply.status,
            body: reply.body,
        });
    }

    let response: TableResponse = decode_reply(&url, &reply)?;
    if let Some(code) = response.code.as_deref() {
        if code != CODE_OK {
            return Err(OsrmError::Engine {
                url,
                code: code.to_string(),
                message: response.message.unwrap_or_default(),
            });
        }
    }

    let durations = response
        .durations
        .ok_or_else(|| OsrmError::InvalidResponse("table response has no `durations`".to_string()))?;
    let distances = response
        .distances
        .ok_or_else(|| OsrmError::InvalidResponse("table response has no `distances`".to_string()))?;

    check_square("durations", &durations, stops.len())?;
    check_square("distances", &distances, stops.len())?;

    let mut unreachable = 0;
    let time_matrix = to_matrix(durations, options.slow_down, &mut unreachable);
    let distance_matrix = to_matrix(distances, 1.0, &mut unreachable);

    if unreachable > 0 {
        warn!("{} table cells have no route, set to infinity", unreachable);
    }

    debug!("Received {}x{} table", stops.len(), stops.len());

    Ok(TimeDistanceMatrices {
        time_matrix,
        distance_matrix,
    })
}

fn check_square(name: &str, matrix: &[Vec<Option<f64>>], size: usize) -> OsrmResult<()> {
    if matrix.len() != size || matrix.iter().any(|row| row.len() != size) {
        return Err(OsrmError::InvalidResponse(format!(
            "`{}` is not a {}x{} matrix",
            name, size, size
        )));
    }
    Ok(())
}

fn to_matrix(cells: Vec<Vec<Option<f64>>>, factor: f64, unreachable: &mut usize) -> Vec<Vec<f64>> {
    cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Some(value) => value * factor,
                    None => {
                        *unreachable += 1;
                        f64::INFINITY
                    }
                })
                .collect()
        })
        .collect()
}

/// Measure from each stop's predecessor: `[0, m[0][1], m[1][2], ...]`
pub fn stepwise_measures(matrix: &[Vec<f64>]) -> Vec<f64> {
    if matrix.is_empty() {
        return Vec::new();
    }
    std::iter::once(0.0)
        .chain((1..matrix.len()).map(|i| matrix[i - 1][i]))
        .collect()
}

/// Stepwise `(time, distance)` between consecutive stops
pub fn interstop_time_distance(matrices: &TimeDistanceMatrices) -> (Vec<f64>, Vec<f64>) {
    (
        stepwise_measures(&matrices.time_matrix),
        stepwise_measures(&matrices.distance_matrix),
    )
}
