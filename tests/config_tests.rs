use std::io::Write;
use std::time::Duration;

use photowall::api::RemoteConfig;
use photowall::catalog::Orientation;
use photowall::config::Configuration;
use tempfile::NamedTempFile;

fn config_from(yaml: &str) -> anyhow::Result<Configuration> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{yaml}").unwrap();
    Configuration::from_yaml_file(file.path())
}

#[test]
fn parses_a_full_config() {
    let cfg = config_from(concat!(
        "server-url: http://frame.local:8080\n",
        "image-interval: 45s\n",
        "image-query: mountains\n",
        "orientation: portrait\n",
        "lookahead-count: 5\n",
        "page-size: 20\n",
        "catalog-cap: 60\n",
        "fetch-max-concurrent: 2\n",
        "attribution-delay: 3s\n",
        "attribution-dwell: 7s\n",
        "request-timeout: 15s\n",
        "probe-timeout: 1s\n",
    ))
    .unwrap()
    .validated()
    .unwrap();

    assert_eq!(cfg.server_url, "http://frame.local:8080");
    assert_eq!(cfg.image_interval, Duration::from_secs(45));
    assert_eq!(cfg.image_query, "mountains");
    assert_eq!(cfg.orientation, Orientation::Portrait);
    assert_eq!(cfg.lookahead_count, 5);
    assert_eq!(cfg.page_size, 20);
    assert_eq!(cfg.catalog_cap, 60);
    assert_eq!(cfg.fetch_max_concurrent, 2);
    assert_eq!(cfg.attribution_delay, Duration::from_secs(3));
    assert_eq!(cfg.attribution_dwell, Duration::from_secs(7));
    assert_eq!(cfg.request_timeout, Duration::from_secs(15));
    assert_eq!(cfg.probe_timeout, Duration::from_secs(1));
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let cfg = config_from("image-query: lakes\n").unwrap();
    assert_eq!(cfg.image_query, "lakes");
    assert_eq!(cfg.server_url, "http://127.0.0.1:3000");
    assert_eq!(cfg.image_interval, Duration::from_secs(30));
    assert_eq!(cfg.orientation, Orientation::Landscape);
    assert_eq!(cfg.lookahead_count, 3);
    assert_eq!(cfg.page_size, 30);
    assert_eq!(cfg.catalog_cap, 47);
}

#[test]
fn zero_lookahead_is_rejected() {
    let err = config_from("lookahead-count: 0\n")
        .unwrap()
        .validated()
        .unwrap_err();
    assert!(err.to_string().contains("lookahead-count"));
}

#[test]
fn zero_interval_is_rejected() {
    let err = config_from("image-interval: 0s\n")
        .unwrap()
        .validated()
        .unwrap_err();
    assert!(err.to_string().contains("image-interval"));
}

#[test]
fn unknown_orientation_fails_to_parse() {
    assert!(config_from("orientation: diagonal\n").is_err());
}

#[test]
fn remote_values_override_local_ones() {
    let mut cfg = Configuration::default();
    cfg.merge_remote(&RemoteConfig {
        provider: Some("pexels".to_string()),
        image_interval: Some(60),
        image_query: Some("sea".to_string()),
    });
    assert_eq!(cfg.image_interval, Duration::from_secs(60));
    assert_eq!(cfg.image_query, "sea");
}

#[test]
fn degenerate_remote_values_are_ignored() {
    let mut cfg = Configuration::default();
    cfg.merge_remote(&RemoteConfig {
        provider: None,
        image_interval: Some(0),
        image_query: Some(String::new()),
    });
    assert_eq!(cfg.image_interval, Duration::from_secs(30));
    assert_eq!(cfg.image_query, "nature");
}
