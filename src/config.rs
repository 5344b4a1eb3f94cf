use std::path::Path;
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::api::RemoteConfig;
use crate::catalog::Orientation;

/// Runtime configuration, loadable from YAML. Every field has a default so
/// a missing file degrades to a usable kiosk pointed at localhost.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Base URL of the metadata/image collaborator.
    pub server_url: String,
    /// Time an image stays up before the show advances.
    #[serde(with = "humantime_serde")]
    pub image_interval: Duration,
    /// Default search terms sent to remote providers.
    pub image_query: String,
    /// Mount orientation forwarded as a selection constraint.
    pub orientation: Orientation,
    /// How many upcoming positions the prefetch cache keeps warm.
    pub lookahead_count: usize,
    /// Metadata page size requested from the collaborator.
    pub page_size: usize,
    /// Provider-imposed ceiling on the catalog; no pages are requested
    /// past it.
    pub catalog_cap: usize,
    /// Maximum number of concurrent requests in the fetcher.
    pub fetch_max_concurrent: usize,
    /// Delay before the attribution line appears after a display load.
    #[serde(with = "humantime_serde")]
    pub attribution_delay: Duration,
    /// How long the attribution line stays up.
    #[serde(with = "humantime_serde")]
    pub attribution_dwell: Duration,
    /// Per-request timeout for metadata and image fetches.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Timeout for the liveness probe; slower than this counts as
    /// unreachable.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            image_interval: Duration::from_secs(30),
            image_query: "nature".to_string(),
            orientation: Orientation::Landscape,
            lookahead_count: 3,
            page_size: 30,
            catalog_cap: 47,
            fetch_max_concurrent: 4,
            attribution_delay: Duration::from_secs(5),
            attribution_dwell: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde
    /// defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.server_url.is_empty(), "server-url must not be empty");
        ensure!(
            self.image_interval > Duration::ZERO,
            "image-interval must be positive"
        );
        ensure!(
            self.lookahead_count > 0,
            "lookahead-count must be greater than zero"
        );
        ensure!(self.page_size > 0, "page-size must be greater than zero");
        ensure!(
            self.catalog_cap > 0,
            "catalog-cap must be greater than zero"
        );
        ensure!(
            self.fetch_max_concurrent > 0,
            "fetch-max-concurrent must be greater than zero"
        );
        ensure!(
            self.request_timeout > Duration::ZERO,
            "request-timeout must be positive"
        );
        ensure!(
            self.probe_timeout > Duration::ZERO,
            "probe-timeout must be positive"
        );
        Ok(self)
    }

    /// Fold the collaborator's startup config over the local values. Absent
    /// or degenerate remote fields leave the local values standing.
    pub fn merge_remote(&mut self, remote: &RemoteConfig) {
        if let Some(seconds) = remote.image_interval {
            if seconds > 0 {
                self.image_interval = Duration::from_secs(seconds);
            }
        }
        if let Some(query) = &remote.image_query {
            if !query.is_empty() {
                self.image_query = query.clone();
            }
        }
    }
}
