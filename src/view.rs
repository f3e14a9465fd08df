use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{EntityRecord, Metric, PollutionRecord};
use crate::error::ExplorerError;

pub const MIN_DANGER_PERCENTILE: u8 = 50;
pub const MAX_DANGER_PERCENTILE: u8 = 99;
pub const NO_DATA_COLOR: Rgb = Rgb(100, 100, 100);

const US_STATE_EMISSIONS: [(&str, f64); 7] = [
    ("Texas", 690.0),
    ("California", 320.0),
    ("Florida", 230.0),
    ("New York", 150.0),
    ("Pennsylvania", 220.0),
    ("Illinois", 190.0),
    ("Ohio", 250.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRow {
    pub iso_code: String,
    pub country: String,
    pub year: i32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected(CountryRow),
    NoMatches,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateBar {
    pub state: String,
    pub value: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub metric: Metric,
    pub iso_code: String,
    pub country: String,
    pub year: i32,
    pub value: Option<f64>,
    pub unit: &'static str,
    pub color: Rgb,
    pub danger_threshold: Option<f64>,
    pub dangerous: bool,
    pub states: Vec<StateBar>,
}

pub fn validate_percentile(percentile: u8) -> Result<u8, ExplorerError> {
    if (MIN_DANGER_PERCENTILE..=MAX_DANGER_PERCENTILE).contains(&percentile) {
        Ok(percentile)
    } else {
        Err(ExplorerError::InvalidPercentile(percentile.to_string()))
    }
}

pub fn metric_rows(
    metric: Metric,
    emissions: &[EntityRecord],
    pollution: &[PollutionRecord],
) -> Vec<CountryRow> {
    match metric {
        Metric::TotalCo2 | Metric::Co2PerCapita => emissions
            .iter()
            .map(|record| CountryRow {
                iso_code: record.iso_code.clone(),
                country: record.country.clone(),
                year: record.year,
                value: if metric == Metric::TotalCo2 {
                    record.co2
                } else {
                    record.co2_per_capita
                },
            })
            .collect(),
        Metric::Pm25 => {
            let names: HashMap<&str, &str> = emissions
                .iter()
                .map(|record| (record.iso_code.as_str(), record.country.as_str()))
                .collect();
            pollution
                .iter()
                .map(|record| CountryRow {
                    iso_code: record.iso_code.clone(),
                    country: names
                        .get(record.iso_code.as_str())
                        .map(|name| name.to_string())
                        .unwrap_or_else(|| record.iso_code.clone()),
                    year: record.year,
                    value: Some(record.pm25),
                })
                .collect()
        }
    }
}

pub fn value_range(rows: &[CountryRow]) -> (f64, f64) {
    let mut values = rows.iter().filter_map(|row| row.value);
    let Some(first) = values.next() else {
        return (0.0, 1.0);
    };
    values.fold((first, first), |(min, max), value| {
        (min.min(value), max.max(value))
    })
}

pub fn sort_rows(rows: &mut [CountryRow]) {
    rows.sort_by(|a, b| match (a.value, b.value) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

pub fn filter_rows(rows: &[CountryRow], query: &str) -> Vec<CountryRow> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| row.country.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn select(rows: &[CountryRow], country: Option<&str>) -> Selection {
    let chosen = country
        .and_then(|name| rows.iter().find(|row| row.country == name))
        .or_else(|| rows.first());
    match chosen {
        Some(row) => Selection::Selected(row.clone()),
        None => Selection::NoMatches,
    }
}

pub fn color_from_value(value: Option<f64>, min: f64, max: f64) -> Rgb {
    let Some(value) = value else {
        return NO_DATA_COLOR;
    };
    if max <= min || value.is_nan() {
        return NO_DATA_COLOR;
    }
    let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
    Rgb((70.0 + 185.0 * t) as u8, 40, 40)
}

pub fn danger_threshold(rows: &[CountryRow], percentile: u8) -> Option<f64> {
    let mut values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.value)
        .filter(|value| !value.is_nan())
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let percentile = percentile.clamp(MIN_DANGER_PERCENTILE, MAX_DANGER_PERCENTILE) as usize;
    let rank = (percentile * values.len()).div_ceil(100).max(1);
    values.get(rank - 1).copied()
}

pub fn us_state_emissions() -> Vec<(String, f64)> {
    US_STATE_EMISSIONS
        .iter()
        .map(|(state, value)| (state.to_string(), *value))
        .collect()
}

pub fn is_united_states(country: &str) -> bool {
    matches!(
        country.to_lowercase().as_str(),
        "united states" | "united states of america" | "usa"
    )
}

fn state_bars() -> Vec<StateBar> {
    let mut states = us_state_emissions();
    states.sort_by(|a, b| b.1.total_cmp(&a.1));
    let max = states.first().map(|(_, value)| *value).unwrap_or(1.0);
    states
        .into_iter()
        .map(|(state, value)| StateBar {
            color: color_from_value(Some(value), 0.0, max),
            state,
            value,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub metric: Metric,
    pub rows: Vec<CountryRow>,
    pub range: (f64, f64),
    pub threshold: Option<f64>,
}

impl Dashboard {
    pub fn build(
        metric: Metric,
        emissions: &[EntityRecord],
        pollution: &[PollutionRecord],
        percentile: u8,
    ) -> Self {
        let mut rows = metric_rows(metric, emissions, pollution);
        let range = value_range(&rows);
        let threshold = danger_threshold(&rows, percentile);
        sort_rows(&mut rows);
        Self {
            metric,
            rows,
            range,
            threshold,
        }
    }

    pub fn filtered(&self, query: &str) -> Vec<CountryRow> {
        filter_rows(&self.rows, query)
    }

    pub fn panel(&self, row: &CountryRow) -> Panel {
        let (min, max) = self.range;
        Panel {
            metric: self.metric,
            iso_code: row.iso_code.clone(),
            country: row.country.clone(),
            year: row.year,
            value: row.value,
            unit: self.metric.unit(),
            color: color_from_value(row.value, min, max),
            danger_threshold: self.threshold,
            dangerous: matches!(
                (row.value, self.threshold),
                (Some(value), Some(threshold)) if value >= threshold
            ),
            states: if is_united_states(&row.country) {
                state_bars()
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str, value: Option<f64>) -> CountryRow {
        CountryRow {
            iso_code: country[..3].to_uppercase(),
            country: country.to_string(),
            year: 2022,
            value,
        }
    }

    #[test]
    fn nulls_sort_last() {
        let mut rows = vec![
            row("Chad", None),
            row("Brazil", Some(2.0)),
            row("Austria", Some(7.0)),
        ];
        sort_rows(&mut rows);
        let order: Vec<_> = rows.iter().map(|row| row.country.as_str()).collect();
        assert_eq!(order, ["Austria", "Brazil", "Chad"]);
    }

    #[test]
    fn empty_range_defaults_to_unit() {
        assert_eq!(value_range(&[row("Chad", None)]), (0.0, 1.0));
    }
}
