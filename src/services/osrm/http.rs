//! OSRM HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONNECTION, HeaderValue};
use reqwest::Client;
use tracing::debug;

use crate::error::{OsrmError, OsrmResult};
use super::{OsrmReply, OsrmTransport};

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `default_timeout` applies when a call does not set its own
    pub fn new(default_timeout: Duration) -> OsrmResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("osrm-pipeline/", env!("CARGO_PKG_VERSION")))
            .timeout(default_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl OsrmTransport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> OsrmResult<OsrmReply> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            // Each call opens and closes its own connection
            .header(CONNECTION, HeaderValue::from_static("close"))
            .send()
            .await
            .map_err(|source| OsrmError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|source| OsrmError::Transport {
            url: url.to_string(),
            source,
        })?;

        debug!("OSRM replied {} with {} bytes", status, body.len());

        Ok(OsrmReply { status, body })
    }

    fn name(&self) -> &str {
        "OSRM"
    }
}
