use std::time::Duration;

/// Public OSRM demo server, used when no endpoint is configured.
pub const DEFAULT_OSRM_URL: &str = "http://router.project-osrm.org";

/// Hard stop limit for table requests against the public server.
pub const DEFAULT_PUBLIC_STOP_LIMIT: usize = 100;

/// Soft stop limit for trip (TSP) requests.
pub const DEFAULT_TSP_STOP_LIMIT: usize = 100;

pub const DEFAULT_TABLE_TIMEOUT_SECONDS: u64 = 120;

pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 300;

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1;

pub const DEFAULT_SLOW_DOWN: f64 = 1.0;

/// Coordinate reference system of every geometry OSRM returns with `geometries=geojson`.
pub const EPSG_4326: &str = "EPSG:4326";

pub const DEFAULT_LONGITUDE_COLUMN: &str = "longitude";
pub const DEFAULT_LATITUDE_COLUMN: &str = "latitude";
pub const DEFAULT_ROUTE_ID_COLUMN: &str = "route_id";
pub const DEFAULT_VEHICLE_TYPE_COLUMN: &str = "profile";
pub const DEFAULT_DEPOT_ID_COLUMN: &str = "depot_id";
pub const ACTIVITY_TYPE_COLUMN: &str = "activity_type";

pub const DEFAULT_LOGS_DIR: &str = "./logs";

pub fn default_table_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TABLE_TIMEOUT_SECONDS)
}

pub fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)
}
