use std::time::Duration;

use assert_matches::assert_matches;

use emissions_explorer::config::{Config, ConfigLoader};
use emissions_explorer::domain::DatasetSource;
use emissions_explorer::error::ExplorerError;

#[test]
fn overrides_are_applied() {
    let config: Config = serde_json::from_str(
        r#"{
            "cache_dir": "/var/cache/emx",
            "timeout_secs": 5,
            "owid_url": "https://mirror.example.org/owid.csv",
            "pm25_per_page": 500
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve_config(config);

    assert_eq!(resolved.cache_dir.as_str(), "/var/cache/emx");
    assert_eq!(resolved.timeout, Duration::from_secs(5));
    assert_eq!(
        resolved.source(DatasetSource::Owid).url,
        "https://mirror.example.org/owid.csv"
    );
    assert!(resolved.pm25.url.ends_with("&per_page=500"));
    assert_eq!(resolved.pm25.cache_file, "worldbank_pm25_cache.json");
}

#[test]
fn explicit_config_path_must_exist() {
    let err = ConfigLoader::resolve(Some("/definitely/not/here.json")).unwrap_err();
    assert_matches!(err, ExplorerError::ConfigRead(_));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("emissions-explorer.json");
    std::fs::write(&path, "{ cache_dir: nope }").unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();

    assert_matches!(err, ExplorerError::ConfigParse(_));
}
