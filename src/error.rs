//! Error types for the OSRM services

use thiserror::Error;

/// Errors raised while requesting or normalizing OSRM results.
#[derive(Debug, Error)]
pub enum OsrmError {
    /// The response lacks the requested route path type (`routes` or `trips`).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A route mixes stops of more than one vehicle type.
    #[error("route `{route_id}` has {} distinct vehicle types ({values:?}), expected exactly one", values.len())]
    VehicleTypeConflict {
        route_id: String,
        values: Vec<Option<String>>,
    },

    /// Too many stops for the public OSRM server.
    #[error("cannot request more than {limit} stops from the default OSRM service (got {count})")]
    StopLimitExceeded { limit: usize, count: usize },

    /// OSRM answered, but with a code other than `Ok`.
    #[error("OSRM request failed with code `{code}`: `{message}`\n Request: `{url}`")]
    Engine {
        url: String,
        code: String,
        message: String,
    },

    #[error("OSRM returned HTTP {status} for `{url}`: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to send OSRM request `{url}`: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to parse OSRM response from `{url}`: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response decoded but breaks an invariant (e.g. waypoint count).
    #[error("invalid OSRM response: {0}")]
    InvalidResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type OsrmResult<T> = std::result::Result<T, OsrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_type_conflict_names_route() {
        let err = OsrmError::VehicleTypeConflict {
            route_id: "van-7".to_string(),
            values: vec![Some("car".to_string()), Some("bike".to_string())],
        };
        let message = err.to_string();
        assert!(message.contains("van-7"));
        assert!(message.contains("2 distinct vehicle types"));
    }

    #[test]
    fn test_engine_error_names_request_and_message() {
        let err = OsrmError::Engine {
            url: "http://osrm/route/v1/driving/0,0".to_string(),
            code: "NoRoute".to_string(),
            message: "Impossible route between points".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Impossible route between points"));
        assert!(message.contains("http://osrm/route/v1/driving/0,0"));
    }
}
