use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

pub const OWID_URL: &str = "https://raw.githubusercontent.com/owid/co2-data/master/owid-co2-data.csv";
pub const PM25_URL: &str =
    "https://api.worldbank.org/v2/country/all/indicator/EN.ATM.PM25.MC.M3?format=json";
pub const DEFAULT_PM25_PER_PAGE: u32 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSource {
    Owid,
    Pm25,
}

impl DatasetSource {
    pub fn all() -> [DatasetSource; 2] {
        [DatasetSource::Owid, DatasetSource::Pm25]
    }

    pub fn cache_file(self) -> &'static str {
        match self {
            DatasetSource::Owid => "owid_co2_cache.csv",
            DatasetSource::Pm25 => "worldbank_pm25_cache.json",
        }
    }

    pub fn meta_file(self) -> &'static str {
        match self {
            DatasetSource::Owid => "owid_meta.json",
            DatasetSource::Pm25 => "worldbank_pm25_meta.json",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DatasetSource::Owid => "OWID",
            DatasetSource::Pm25 => "World Bank PM2.5",
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Owid => write!(f, "owid"),
            DatasetSource::Pm25 => write!(f, "pm25"),
        }
    }
}

impl FromStr for DatasetSource {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "owid" | "co2" => Ok(DatasetSource::Owid),
            "pm25" | "pm2.5" | "worldbank" => Ok(DatasetSource::Pm25),
            _ => Err(ExplorerError::InvalidSource(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub source: DatasetSource,
    pub url: String,
    pub cache_file: String,
    pub meta_file: String,
}

impl SourceSpec {
    pub fn new(source: DatasetSource, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
            cache_file: source.cache_file().to_string(),
            meta_file: source.meta_file().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    #[value(name = "total")]
    TotalCo2,
    #[value(name = "per-capita")]
    Co2PerCapita,
    Pm25,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalCo2 => "Total CO₂ (Mt)",
            Metric::Co2PerCapita => "CO₂ per capita (t)",
            Metric::Pm25 => "PM2.5 exposure (µg/m³)",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::TotalCo2 => "Mt",
            Metric::Co2PerCapita => "t per person",
            Metric::Pm25 => "µg/m³",
        }
    }

    pub fn next(self) -> Metric {
        match self {
            Metric::TotalCo2 => Metric::Co2PerCapita,
            Metric::Co2PerCapita => Metric::Pm25,
            Metric::Pm25 => Metric::TotalCo2,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub iso_code: String,
    pub country: String,
    pub year: i32,
    pub co2: Option<f64>,
    pub population: Option<f64>,
    pub co2_per_capita: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutionRecord {
    pub iso_code: String,
    pub year: i32,
    pub pm25: f64,
}

pub fn is_country_code(code: &str) -> bool {
    code.chars().count() == 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_aliases_parse() {
        assert_eq!("OWID".parse::<DatasetSource>().unwrap(), DatasetSource::Owid);
        assert_eq!("pm2.5".parse::<DatasetSource>().unwrap(), DatasetSource::Pm25);
        assert!("nasa".parse::<DatasetSource>().is_err());
    }

    #[test]
    fn country_codes_are_three_chars() {
        assert!(is_country_code("USA"));
        assert!(!is_country_code(""));
        assert!(!is_country_code("OWID_WRL"));
    }
}
