//! OSRM routing services
//!
//! Table matrices, per-route path normalization and TSP sequencing on top of
//! the OSRM HTTP API. Uses `HttpTransport` in production, `MockTransport` for
//! tests.

#[cfg(test)]
pub(crate) mod fixtures;
mod http;
pub mod normalizer;
pub mod response;
pub mod routes;
pub mod table;
pub mod tsp;

pub use http::HttpTransport;
pub use normalizer::RoutePathNormalizer;
pub use response::RoutePathType;
pub use routes::{PortMapping, RouteGenerator, RouteRequestOptions};
pub use table::{get_time_dist_matrix, interstop_time_distance, stepwise_measures, TableOptions};
pub use tsp::{TspRoute, TspSequencer, TspState};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{OsrmError, OsrmResult};
use response::{decode_reply, RouteServiceResponse};

/// Raw HTTP reply from an OSRM server
#[derive(Debug, Clone, PartialEq)]
pub struct OsrmReply {
    pub status: u16,
    pub body: String,
}

impl OsrmReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP seam for all OSRM calls
#[async_trait]
pub trait OsrmTransport: Send + Sync {
    /// Issue a GET request and return the reply whatever its status
    async fn get(&self, url: &str, timeout: Duration) -> OsrmResult<OsrmReply>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// Canned-reply transport for tests.
///
/// A request is answered by the first reply whose URL fragment it contains;
/// anything else gets a 404. Every requested URL is recorded.
#[derive(Default)]
pub struct MockTransport {
    replies: Vec<(String, OsrmReply)>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, url_fragment: impl Into<String>, reply: OsrmReply) -> Self {
        self.replies.push((url_fragment.into(), reply));
        self
    }

    /// Answer with HTTP 200 and `body` serialized as JSON
    pub fn with_json(self, url_fragment: impl Into<String>, body: &serde_json::Value) -> Self {
        self.with_reply(url_fragment, OsrmReply::new(200, body.to_string()))
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl OsrmTransport for MockTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> OsrmResult<OsrmReply> {
        self.requests.lock().push(url.to_string());
        let reply = self
            .replies
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| OsrmReply::new(404, format!("no canned reply for {}", url)));
        Ok(reply)
    }

    fn name(&self) -> &str {
        "MockOsrm"
    }
}

/// Create the production transport
pub fn create_transport(config: &Config) -> OsrmResult<Arc<dyn OsrmTransport>> {
    Ok(Arc::new(HttpTransport::new(config.request_timeout())?))
}

/// Build `{base}/{service}/v1/driving/{coordinates}?{query}`.
pub fn service_url(base_url: &str, service: &str, coordinates: &str, query: &str) -> String {
    format!(
        "{}/{}/v1/driving/{}?{}",
        base_url.trim_end_matches('/'),
        service,
        coordinates,
        query
    )
}

/// Join `key=value` pairs with `&`, keeping their order
pub fn query_string<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), value.as_ref()))
        .collect::<Vec<_>>()
        .join("&")
}

/// Send a route/trip request and decode the reply
pub(crate) async fn fetch_route_service(
    transport: &dyn OsrmTransport,
    url: &str,
    timeout: Duration,
) -> OsrmResult<RouteServiceResponse> {
    debug!("OSRM request via {}: `{}`", transport.name(), url);
    let reply = transport.get(url, timeout).await?;
    decode_reply(url, &reply)
}

/// Fail unless the engine reported `Ok`
pub(crate) fn ensure_ok(url: &str, response: &RouteServiceResponse) -> OsrmResult<()> {
    if response.is_ok() {
        return Ok(());
    }
    let message = response.message.clone().unwrap_or_default();
    error!("OSRM request failed with code {}: {}", response.code, message);
    Err(OsrmError::Engine {
        url: url.to_string(),
        code: response.code.clone(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url_strips_trailing_slash() {
        let url = service_url("http://localhost:5000/", "trip", "0,0;1,1", "roundtrip=false");
        assert_eq!(url, "http://localhost:5000/trip/v1/driving/0,0;1,1?roundtrip=false");
    }

    #[test]
    fn test_query_string_keeps_order() {
        let query = query_string(&[("steps", "true"), ("overview", "full")]);
        assert_eq!(query, "steps=true&overview=full");
    }

    #[tokio::test]
    async fn test_mock_transport_matches_fragment_and_records() {
        let transport = MockTransport::new()
            .with_json("/route/v1/driving/0,0", &serde_json::json!({"code": "Ok"}));

        let hit = transport
            .get("http://osrm/route/v1/driving/0,0;1,1?steps=true", Duration::from_secs(1))
            .await
            .unwrap();
        let miss = transport
            .get("http://osrm/trip/v1/driving/0,0", Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(hit.status, 200);
        assert_eq!(miss.status, 404);
        assert_eq!(transport.request_count(), 2);
        assert!(transport.requests()[1].contains("/trip/"));
    }

    #[test]
    fn test_mock_transport_name() {
        assert_eq!(MockTransport::new().name(), "MockOsrm");
    }

    #[tokio::test]
    async fn test_ensure_ok_reports_engine_message() {
        let transport = MockTransport::new().with_reply(
            "/route/",
            OsrmReply::new(400, r#"{"code":"NoRoute","message":"Impossible route between points"}"#),
        );
        let url = "http://osrm/route/v1/driving/0,0;9,9?steps=true";
        let response = fetch_route_service(&transport, url, Duration::from_secs(1))
            .await
            .unwrap();

        let err = ensure_ok(url, &response).unwrap_err();
        match err {
            OsrmError::Engine { code, message, url: request } => {
                assert_eq!(code, "NoRoute");
                assert_eq!(message, "Impossible route between points");
                assert_eq!(request, url);
            }
            other => panic!("expected engine error, got {:?}", other),
        }
    }
}
