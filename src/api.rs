use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{Attribution, ImageDescriptor, SelectionCriteria};

/// Errors from the collaborator HTTP surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout, or body decode failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The collaborator answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(StatusCode),

    /// A descriptor or configuration URL could not be resolved.
    #[error("bad url {url}: {reason}")]
    Url { url: String, reason: String },
}

/// Startup parameters served by the collaborator at `/api/config`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    pub provider: Option<String>,
    pub image_interval: Option<u64>,
    pub image_query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    images: Vec<ImageDto>,
}

/// Wire shape of one descriptor; provider-dependent fields are nullable.
#[derive(Debug, Deserialize)]
struct ImageDto {
    id: String,
    url: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    user: Option<UserDto>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    location: Option<LocationDto>,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationDto {
    #[serde(default)]
    name: Option<String>,
}

impl ImageDto {
    fn into_descriptor(self) -> ImageDescriptor {
        let attribution = self.user.and_then(|user| {
            user.name.map(|photographer_name| Attribution {
                photographer_name,
                photographer_url: user.href.unwrap_or_default(),
            })
        });
        ImageDescriptor {
            id: self.id,
            url: self.url,
            color: self.color,
            attribution,
            captured_at: self.created_at,
            location_name: self.location.and_then(|location| location.name),
        }
    }
}

/// Thin client for the collaborator endpoints. Cloneable; every method is a
/// single cancel-safe request.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
    probe_timeout: Duration,
}

impl Client {
    pub fn new(
        server_url: &str,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(server_url).map_err(|err| ApiError::Url {
            url: server_url.to_string(),
            reason: err.to_string(),
        })?;
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base,
            probe_timeout,
        })
    }

    /// Resolve a path or absolute URL against the collaborator base.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|err| ApiError::Url {
            url: path.to_string(),
            reason: err.to_string(),
        })
    }

    /// `GET /api/config`; consumed once at startup.
    pub async fn remote_config(&self) -> Result<RemoteConfig, ApiError> {
        let url = self.endpoint("/api/config")?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(response.json().await?)
    }

    /// `GET /api/images/metadata`: one page under the given criteria.
    pub async fn metadata(
        &self,
        criteria: &SelectionCriteria,
        start: usize,
        count: usize,
    ) -> Result<Vec<ImageDescriptor>, ApiError> {
        let mut url = self.endpoint("/api/images/metadata")?;
        url.query_pairs_mut()
            .append_pair("count", &count.to_string())
            .append_pair("start", &start.to_string())
            .append_pair("orientation", criteria.orientation.as_str())
            .append_pair("query", &criteria.query);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        let body: MetadataResponse = response.json().await?;
        debug!(count = body.images.len(), start, "metadata page received");
        Ok(body
            .images
            .into_iter()
            .map(ImageDto::into_descriptor)
            .collect())
    }

    /// Fetch image bytes so the collaborator's cache headers can take
    /// effect. Returns the byte count; the engine only needs confirmation
    /// that the image is retrievable.
    pub async fn image(&self, url: &str) -> Result<usize, ApiError> {
        let target = self.endpoint(url)?;
        let response = self.http.get(target).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(response.bytes().await?.len())
    }

    /// `GET /api/ping` liveness probe with its own tight timeout.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.endpoint("/api/ping")?;
        let response = self
            .http
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_provider_descriptor_with_null_fields() {
        let raw = r##"{
            "images": [
                {
                    "id": "0",
                    "url": "/api/images/alps.jpg",
                    "color": "#000",
                    "user": null,
                    "created_at": null,
                    "location": { "name": null }
                }
            ]
        }"##;
        let parsed: MetadataResponse = serde_json::from_str(raw).unwrap();
        let descriptor = parsed.images.into_iter().next().unwrap().into_descriptor();
        assert_eq!(descriptor.id, "0");
        assert_eq!(descriptor.url, "/api/images/alps.jpg");
        assert_eq!(descriptor.color.as_deref(), Some("#000"));
        assert!(descriptor.attribution.is_none());
        assert!(descriptor.captured_at.is_none());
        assert!(descriptor.location_name.is_none());
    }

    #[test]
    fn remote_provider_descriptor_with_attribution() {
        let raw = r##"{
            "id": "abc123",
            "url": "https://images.example.com/raw/abc123",
            "color": "#60544D",
            "user": { "name": "Jane Doe", "href": "https://example.com/@jane" },
            "created_at": "2021-03-14T09:26:53Z",
            "location": { "name": "Lofoten, Norway" }
        }"##;
        let dto: ImageDto = serde_json::from_str(raw).unwrap();
        let descriptor = dto.into_descriptor();
        let attribution = descriptor.attribution.unwrap();
        assert_eq!(attribution.photographer_name, "Jane Doe");
        assert_eq!(attribution.photographer_url, "https://example.com/@jane");
        assert_eq!(descriptor.location_name.as_deref(), Some("Lofoten, Norway"));
        assert!(descriptor.captured_at.is_some());
    }

    #[test]
    fn user_without_name_yields_no_attribution() {
        let raw = r#"{ "id": "1", "url": "/a.jpg", "user": { "href": "https://x" } }"#;
        let dto: ImageDto = serde_json::from_str(raw).unwrap();
        assert!(dto.into_descriptor().attribution.is_none());
    }

    #[test]
    fn remote_config_uses_camel_case_keys() {
        let raw = r#"{ "provider": "unsplash", "imageInterval": 45, "imageQuery": "mountains" }"#;
        let config: RemoteConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.provider.as_deref(), Some("unsplash"));
        assert_eq!(config.image_interval, Some(45));
        assert_eq!(config.image_query.as_deref(), Some("mountains"));
    }

    #[test]
    fn endpoint_resolves_relative_and_absolute_urls() {
        let client = Client::new(
            "http://127.0.0.1:3000",
            Duration::from_secs(10),
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("/api/images/alps.jpg").unwrap().as_str(),
            "http://127.0.0.1:3000/api/images/alps.jpg"
        );
        assert_eq!(
            client
                .endpoint("https://images.example.com/raw/abc")
                .unwrap()
                .as_str(),
            "https://images.example.com/raw/abc"
        );
    }
}
