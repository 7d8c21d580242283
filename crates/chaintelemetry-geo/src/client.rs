//! ipinfo.io-backed location provider.

use async_trait::async_trait;
use serde::Deserialize;

use chaintelemetry_core::{Location, LocationProvider, LookupError};

use crate::cache::TtlCache;
use crate::config::IpInfoConfig;

/// Fields of an ipinfo.io response that map onto [`Location`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpInfoResponse {
    /// `"latitude,longitude"`
    pub loc: Option<String>,
    pub city: Option<String>,
    /// Network operator, e.g. `"AS3215 Orange S.A."`
    pub org: Option<String>,
}

/// Convert a response into a [`Location`]. Unparseable or empty fields
/// are left unset.
pub fn parse_ipinfo(response: IpInfoResponse) -> Location {
    let coords = response.loc.as_deref().and_then(|loc| {
        let (lat, lon) = loc.split_once(',')?;
        Some((lat.trim().parse::<f64>().ok()?, lon.trim().parse::<f64>().ok()?))
    });
    Location {
        latitude: coords.map(|(lat, _)| lat),
        longitude: coords.map(|(_, lon)| lon),
        city: response.city.filter(|s| !s.is_empty()),
        provider: response.org.filter(|s| !s.is_empty()),
    }
}

/// Looks up IP locations via `GET {base_url}/{ip}`.
pub struct IpInfoClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
    cache: TtlCache<Location>,
}

impl IpInfoClient {
    pub fn new(config: IpInfoConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: TtlCache::new(config.cache_ttl()),
            token: config.token,
            http,
        })
    }

    /// Number of cached lookups, expired ones included until next access.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    async fn fetch(&self, ip: &str) -> Result<Location, LookupError> {
        let resp = self
            .http
            .get(format!("{}/{ip}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| LookupError::new(ip, e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LookupError::new(ip, format!("HTTP {status}: {body}")));
        }

        let body = resp
            .json::<IpInfoResponse>()
            .await
            .map_err(|e| LookupError::new(ip, e.to_string()))?;
        Ok(parse_ipinfo(body))
    }
}

impl std::fmt::Debug for IpInfoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpInfoClient")
            .field("base_url", &self.base_url)
            .field("cached", &self.cached())
            .finish()
    }
}

#[async_trait]
impl LocationProvider for IpInfoClient {
    async fn lookup(&self, ip: &str) -> Result<Location, LookupError> {
        if let Some(location) = self.cache.get(ip) {
            tracing::debug!(ip, "location cache hit");
            return Ok(location);
        }
        match self.fetch(ip).await {
            Ok(location) => {
                self.cache.insert(ip, location.clone());
                Ok(location)
            }
            Err(e) => {
                tracing::warn!(ip, error = %e, "location lookup failed");
                Err(e)
            }
        }
    }
}
