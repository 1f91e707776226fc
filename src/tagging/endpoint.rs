//! Endpoint resolution
//!
//! Picks the global Resource Manager host or a location-prefixed regional one
//! (`https://us-central1-cloudresourcemanager.googleapis.com/v3`).

use crate::error::{Result, TagError};
use url::Url;

pub const DEFAULT_API_ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com/v3";

/// Base URL an operation is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    pub base_url: String,
    pub is_regional: bool,
}

#[derive(Debug, Clone)]
pub struct EndpointResolver {
    scheme: String,
    host: String,
    path: String,
    derive_region_from_zone: bool,
}

impl EndpointResolver {
    /// `api_endpoint` is the global base URL, e.g. [`DEFAULT_API_ENDPOINT`]
    pub fn new(api_endpoint: &str, derive_region_from_zone: bool) -> Result<Self> {
        let url = Url::parse(api_endpoint)
            .map_err(|e| TagError::Config(format!("invalid API endpoint '{}': {}", api_endpoint, e)))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(TagError::Config(format!(
                "API endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }

        let Some(host) = url.host_str() else {
            return Err(TagError::Config(format!(
                "API endpoint '{}' has no host",
                api_endpoint
            )));
        };

        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            path: url.path().trim_end_matches('/').to_string(),
            derive_region_from_zone,
        })
    }

    pub fn derives_region_from_zone(&self) -> bool {
        self.derive_region_from_zone
    }

    /// `http` or `https`
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn global_base_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }

    /// Substring that identifies a regional host, e.g. `-cloudresourcemanager.googleapis.com`
    pub fn regional_marker(&self) -> String {
        format!("-{}", self.host)
    }

    /// Host prefix used for `location`
    pub fn region_for<'a>(&self, location: &'a str) -> &'a str {
        if self.derive_region_from_zone {
            region_from_zone(location).unwrap_or(location)
        } else {
            location
        }
    }

    pub fn resolve(&self, location: Option<&str>) -> ResourceLocation {
        let location = location.map(str::trim).filter(|l| !l.is_empty());

        match location {
            None => ResourceLocation {
                base_url: self.global_base_url(),
                is_regional: false,
            },
            Some(location) => {
                let region = self.region_for(location);
                tracing::debug!("Location {} resolved to region {}", location, region);
                ResourceLocation {
                    base_url: format!("{}://{}-{}{}", self.scheme, region, self.host, self.path),
                    is_regional: true,
                }
            }
        }
    }
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "cloudresourcemanager.googleapis.com".to_string(),
            path: "/v3".to_string(),
            derive_region_from_zone: true,
        }
    }
}

/// Region of a zone-shaped location (`us-central1-a` -> `us-central1`).
/// `None` when the location does not end in `-<single lowercase letter>`.
pub fn region_from_zone(location: &str) -> Option<&str> {
    let (region, suffix) = location.rsplit_once('-')?;
    let mut chars = suffix.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() && !region.is_empty() => Some(region),
        _ => None,
    }
}
