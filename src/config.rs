use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{DEFAULT_PM25_PER_PAGE, DatasetSource, OWID_URL, PM25_URL, SourceSpec};
use crate::error::ExplorerError;

pub const DEFAULT_CONFIG_FILE: &str = "emissions-explorer.json";
pub const DEFAULT_CACHE_DIR: &str = "data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub owid_url: Option<String>,
    #[serde(default)]
    pub pm25_url: Option<String>,
    #[serde(default)]
    pub pm25_per_page: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub cache_dir: Utf8PathBuf,
    pub timeout: Duration,
    pub owid: SourceSpec,
    pub pm25: SourceSpec,
}

impl ResolvedConfig {
    pub fn source(&self, source: DatasetSource) -> &SourceSpec {
        match source {
            DatasetSource::Owid => &self.owid,
            DatasetSource::Pm25 => &self.pm25,
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ExplorerError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ExplorerError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ExplorerError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let per_page = config.pm25_per_page.unwrap_or(DEFAULT_PM25_PER_PAGE).max(1);
        let pm25_base = config.pm25_url.unwrap_or_else(|| PM25_URL.to_string());

        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            cache_dir: Utf8PathBuf::from(
                config
                    .cache_dir
                    .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string()),
            ),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            owid: SourceSpec::new(
                DatasetSource::Owid,
                config.owid_url.unwrap_or_else(|| OWID_URL.to_string()),
            ),
            pm25: SourceSpec::new(DatasetSource::Pm25, with_page_size(&pm25_base, per_page)),
        }
    }
}

pub fn with_page_size(url: &str, per_page: u32) -> String {
    if url.contains("per_page=") {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}per_page={per_page}")
}
