//! Configuration management

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{self, Context, Result};

use crate::defaults::{
    DEFAULT_LOGS_DIR, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_OSRM_URL, DEFAULT_PUBLIC_STOP_LIMIT,
    DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_TABLE_TIMEOUT_SECONDS, DEFAULT_TSP_STOP_LIMIT,
};
use crate::services::osrm::PortMapping;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// OSRM base URL (public demo server when unset)
    pub osrm_url: Option<String>,

    /// Per-vehicle-type OSRM base URLs
    pub profile_urls: BTreeMap<String, String>,

    /// Timeout for route and trip requests
    pub request_timeout_seconds: u64,

    /// Timeout for table requests
    pub table_timeout_seconds: u64,

    /// Hard stop limit on the public server (table requests)
    pub public_stop_limit: usize,

    /// Soft stop limit for trip requests
    pub tsp_stop_limit: usize,

    /// Routes requested at once
    pub max_concurrent_requests: usize,

    pub logs_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            osrm_url: None,
            profile_urls: BTreeMap::new(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            table_timeout_seconds: DEFAULT_TABLE_TIMEOUT_SECONDS,
            public_stop_limit: DEFAULT_PUBLIC_STOP_LIMIT,
            tsp_stop_limit: DEFAULT_TSP_STOP_LIMIT,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            logs_dir: DEFAULT_LOGS_DIR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let osrm_url = lookup("OSRM_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| url.trim_end_matches('/').to_string());

        let profile_urls = match lookup("OSRM_PROFILE_URLS") {
            Some(raw) => parse_profile_urls(&raw).context("Invalid OSRM_PROFILE_URLS")?,
            None => BTreeMap::new(),
        };

        let max_concurrent_requests =
            parse_or("OSRM_MAX_CONCURRENT_REQUESTS", &lookup, defaults.max_concurrent_requests)?;
        if max_concurrent_requests == 0 {
            anyhow::bail!("OSRM_MAX_CONCURRENT_REQUESTS must be at least 1");
        }

        Ok(Self {
            osrm_url,
            profile_urls,
            request_timeout_seconds: parse_or("OSRM_TIMEOUT_SECONDS", &lookup, defaults.request_timeout_seconds)?,
            table_timeout_seconds: parse_or("OSRM_TABLE_TIMEOUT_SECONDS", &lookup, defaults.table_timeout_seconds)?,
            public_stop_limit: parse_or("OSRM_PUBLIC_STOP_LIMIT", &lookup, defaults.public_stop_limit)?,
            tsp_stop_limit: parse_or("OSRM_TSP_STOP_LIMIT", &lookup, defaults.tsp_stop_limit)?,
            max_concurrent_requests,
            logs_dir: lookup("LOGS_DIR").unwrap_or(defaults.logs_dir),
        })
    }

    /// Base URL for route and trip requests
    pub fn base_url(&self) -> &str {
        self.osrm_url.as_deref().unwrap_or(DEFAULT_OSRM_URL)
    }

    pub fn port_mapping(&self) -> PortMapping {
        PortMapping {
            default: self.base_url().to_string(),
            by_vehicle_type: self.profile_urls.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn table_timeout(&self) -> Duration {
        Duration::from_secs(self.table_timeout_seconds)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got `{}`", key, raw)),
        None => Ok(default),
    }
}

/// Parse `car=http://a:5000;bike=http://b:5001`
fn parse_profile_urls(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut urls = BTreeMap::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (profile, url) = entry
            .split_once('=')
            .with_context(|| format!("expected `profile=url`, got `{}`", entry))?;
        let (profile, url) = (profile.trim(), url.trim());
        if profile.is_empty() || url.is_empty() {
            anyhow::bail!("expected `profile=url`, got `{}`", entry);
        }
        urls.insert(profile.to_string(), url.trim_end_matches('/').to_string());
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.osrm_url.is_none());
        assert_eq!(config.base_url(), "http://router.project-osrm.org");
        assert_eq!(config.request_timeout_seconds, 300);
        assert_eq!(config.table_timeout_seconds, 120);
        assert_eq!(config.public_stop_limit, 100);
        assert_eq!(config.tsp_stop_limit, 100);
        assert_eq!(config.max_concurrent_requests, 1);
    }

    #[test]
    fn test_config_osrm_url_strips_trailing_slash() {
        let config = Config::from_lookup(lookup(&[("OSRM_URL", "http://localhost:5000/")])).unwrap();
        assert_eq!(config.osrm_url, Some("http://localhost:5000".to_string()));
    }

    #[test]
    fn test_config_profile_urls_build_port_mapping() {
        let config = Config::from_lookup(lookup(&[
            ("OSRM_URL", "http://car:5000"),
            ("OSRM_PROFILE_URLS", "bike=http://bike:5001; foot = http://foot:5002/"),
        ]))
        .unwrap();

        let ports = config.port_mapping();
        assert_eq!(ports.resolve(Some("bike")), "http://bike:5001");
        assert_eq!(ports.resolve(Some("foot")), "http://foot:5002");
        assert_eq!(ports.resolve(Some("car")), "http://car:5000");
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup(&[("OSRM_TSP_STOP_LIMIT", "lots")])).unwrap_err();
        assert!(err.to_string().contains("OSRM_TSP_STOP_LIMIT"));
    }

    #[test]
    fn test_config_rejects_zero_concurrency() {
        assert!(Config::from_lookup(lookup(&[("OSRM_MAX_CONCURRENT_REQUESTS", "0")])).is_err());
    }

    #[test]
    fn test_config_rejects_malformed_profile_urls() {
        assert!(Config::from_lookup(lookup(&[("OSRM_PROFILE_URLS", "bike")])).is_err());
    }
}
